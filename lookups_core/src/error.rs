// src/error.rs

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("Upstream returned status {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    #[error("Unexpected response body from {url}: {reason}")]
    UnexpectedBody { url: String, reason: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl ConnectorError {
    pub fn code_str(&self) -> &'static str {
        match self {
            ConnectorError::InvalidInput(_) => "invalid_input",
            ConnectorError::InvalidUrl(_) => "invalid_input",
            ConnectorError::Config(_) => "invalid_config",
            ConnectorError::Timeout(_) => "timeout",
            ConnectorError::HttpRequest(e) if e.is_timeout() => "timeout",
            ConnectorError::HttpRequest(_) => "upstream_error",
            ConnectorError::UpstreamStatus { .. } => "upstream_error",
            ConnectorError::UnexpectedBody { .. } => "parse_error",
            ConnectorError::SerdeJson(_) => "parse_error",
            _ => "internal_error",
        }
    }
}

impl From<toml::de::Error> for ConnectorError {
    fn from(err: toml::de::Error) -> Self {
        ConnectorError::Config(err.to_string())
    }
}
