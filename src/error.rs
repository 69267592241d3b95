/// Error types for the i18n-keyless library
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum I18nError {
    /// Invalid or incomplete configuration, surfaced at init
    ConfigError(String),
    /// Network failure or non-success response from the translation API
    NetworkError(String),
    /// Storage adapter failure or corrupt persisted data
    StorageError(String),
    /// Language code outside the supported set
    UnsupportedLanguage(String),
}

impl std::fmt::Display for I18nError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            I18nError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            I18nError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            I18nError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            I18nError::UnsupportedLanguage(msg) => write!(f, "Unsupported language: {}", msg),
        }
    }
}

impl std::error::Error for I18nError {}

impl From<reqwest::Error> for I18nError {
    fn from(err: reqwest::Error) -> Self {
        I18nError::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for I18nError {
    fn from(err: serde_json::Error) -> Self {
        I18nError::StorageError(err.to_string())
    }
}

/// Result type for i18n-keyless operations
pub type I18nResult<T> = Result<T, I18nError>;
