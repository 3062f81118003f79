use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaladinError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to connect to {kind} data source at {location}: {reason}")]
    Connection {
        kind: &'static str,
        location: String,
        reason: String,
    },
}

impl PaladinError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

// Absorbed at the data-source boundary; never aborts a run.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("sql error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("mysql error: {0}")]
    MySql(#[from] mysql::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned status {0}: {1}")]
    Status(u16, String),

    #[error("malformed result: {0}")]
    MalformedResult(String),

    #[error("query returned no columns")]
    NoColumns,

    #[error("data source is closed")]
    Closed,
}
