use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;
pub type ConfigError = Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Cache backend error: {0}")]
    CacheBackend(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid: {0}")]
    Invalid(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl Error {
    pub fn is_temporary(&self) -> bool {
        matches!(
            self,
            Error::HttpError(_) | Error::Timeout(_) | Error::Io(_) | Error::CacheBackend(_)
        )
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidUrl(_) | Error::Config(_) | Error::Invalid(_)
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Repository(_) => "REPOSITORY",
            Error::CacheBackend(_) => "CACHE_BACKEND",
            Error::Notification(_) => "NOTIFICATION",
            Error::Settings(_) => "SETTINGS",
            Error::HttpError(_) => "HTTP_ERROR",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::Timeout(_) => "TIMEOUT",
            Error::Io(_) => "IO_ERROR",
            Error::Serialization(_) => "SERIALIZATION",
            Error::Config(_) => "CONFIG",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Invalid(_) => "INVALID",
        }
    }

    /// HTTP status the feed endpoint answers with when this error ends a request.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            _ => 500,
        }
    }
}
