use thiserror::Error;

/// Errors that can occur while talking to the bot's external collaborators
#[derive(Error, Debug)]
pub enum BotError {
    /// An outbound HTTP request failed before yielding a response
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Filesystem error (store file, downloaded media)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A payload could not be serialized or deserialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The ingredient extraction call failed or returned an unusable payload
    #[error("Ingredient extraction failed: {0}")]
    Extraction(String),

    /// Messaging transport failure (conversation setup, send, media fetch)
    #[error("Transport error: {0}")]
    Transport(String),

    /// A required credential or setting is absent
    #[error("Missing configuration: {0}")]
    MissingConfig(String),
}
