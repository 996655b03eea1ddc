use thiserror::Error;

/// Top-level error type for the chatscan service.
///
/// Subsystem crates define their own error types where they need richer
/// detail (e.g. `ChatError`) and convert into `ChatscanError` at the crate
/// boundary so `?` works across crates.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChatscanError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Detection error: {0}")]
    Detection(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ChatscanError {
    fn from(err: toml::de::Error) -> Self {
        ChatscanError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ChatscanError {
    fn from(err: toml::ser::Error) -> Self {
        ChatscanError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ChatscanError {
    fn from(err: serde_json::Error) -> Self {
        ChatscanError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for chatscan operations.
pub type Result<T> = std::result::Result<T, ChatscanError>;
