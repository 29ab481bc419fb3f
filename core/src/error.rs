use crate::DocId;

/// Errors raised while building or querying the indices.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid configuration; raised before any build work starts.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A build or query step ran before the state it depends on existed.
    #[error("ordering error: {0}")]
    Ordering(&'static str),
    #[error("term not found: {0}")]
    TermNotFound(String),
    #[error("document not found: {0}")]
    DocumentNotFound(DocId),
    /// Rejected caller input, e.g. a zero result count.
    #[error("invalid input: {0}")]
    Input(String),
    /// Malformed collection or embedding file.
    #[error("parse error in {path}: {message}")]
    Parse { path: String, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }
}
