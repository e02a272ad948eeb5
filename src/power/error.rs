use thiserror::Error;

/// Failures talking to the daily-series provider
#[derive(Debug, Error)]
pub enum PowerError {
    #[error("Network request failed for {url}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("NASA POWER returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to decode NASA POWER response")]
    Decode(#[source] reqwest::Error),

    #[error("Variable {0} not available in POWER response")]
    MissingVariable(String),
}
