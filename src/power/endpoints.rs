/// NASA POWER API endpoints
pub const POWER_API: &str = "https://power.larc.nasa.gov";

// Temporal
pub const DAILY_POINT: &str = "/api/temporal/daily/point";

/// Renewable-energy user community (units: °C, mm/day, m/s)
pub const COMMUNITY_RE: &str = "RE";

/// Date format used in query strings and response keys
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Sentinel POWER writes for missing days when the header omits one
pub const DEFAULT_FILL_VALUE: f64 = -999.0;

// Daily parameters
pub const T2M: &str = "T2M";
pub const T2M_MAX: &str = "T2M_MAX";
pub const T2M_MIN: &str = "T2M_MIN";
pub const PRECTOTCORR: &str = "PRECTOTCORR";
pub const WS10M: &str = "WS10M";
pub const WS10M_MAX: &str = "WS10M_MAX";
pub const RH2M: &str = "RH2M";
