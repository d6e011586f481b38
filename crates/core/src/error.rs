use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("embedding request failed: {0}")]
    Embedding(String),
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat request failed: {0}")]
    Request(String),

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] IndexError),
}

/// Session failures, one variant per pipeline stage so callers can tell
/// a staging failure from an index-build failure from a chat failure.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Please upload PDF files to proceed.")]
    NoUploads,

    #[error("staging failed: {0}")]
    Staging(#[from] IngestError),

    #[error("index build failed: {0}")]
    IndexBuild(#[from] IndexError),

    #[error("chat failed: {0}")]
    Chat(#[from] ChatError),

    #[error("session not ready: {0}")]
    NotReady(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
