use thiserror::Error;

/// Terminal failure of a paginated collection run.
///
/// No variant carries partial data: a failed run drops everything it had
/// accumulated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollectError {
    #[error("Unexpected response structure on page {page}: {detail}")]
    Structural { page: u32, detail: String },

    #[error("GraphQL error on page {page}: {}", .messages.join("; "))]
    Graphql { page: u32, messages: Vec<String> },

    #[error("Network retries exhausted on page {page} after {rounds} rounds")]
    NetworkExhausted { page: u32, rounds: u32 },

    #[error("Collection cancelled before page {page}")]
    Cancelled { page: u32 },
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
