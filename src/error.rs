use thiserror::Error;

/// Rejected user input. Nothing is written when one of these is returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("crop must not be empty")]
    EmptyCrop,

    #[error("area_hectares is not a number: '{0}'")]
    AreaNotNumeric(String),

    #[error("area_hectares must be greater than zero (got {0})")]
    AreaNotPositive(f64),

    #[error("unknown field '{0}'")]
    UnknownField(String),
}

/// One stored row that failed the load-time schema check.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("row {index}: field '{field}' {reason}")]
pub struct RowError {
    pub index: usize,
    pub field: &'static str,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store document is malformed: {0}")]
    Malformed(String),

    #[error("store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum NatureError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("refusing to rewrite a store with {0} unreadable row(s)")]
    CorruptStore(usize),

    #[error("no record id left after {0}")]
    IdSpaceExhausted(u64),
}

/// Failure seen by a console backend.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Local(#[from] NatureError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}
