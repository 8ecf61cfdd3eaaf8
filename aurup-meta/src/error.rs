use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parsing failed: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("No document found for {0}")]
    NotFound(String),

    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    #[error("Malformed .dsc file: {0}")]
    Dsc(String),

    #[error("PyPI metadata error: {0}")]
    Pypi(String),

    #[error("Unsupported checksum algorithm: {0}")]
    UnsupportedChecksum(String),
}

impl Error {
    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        Error::SchemaViolation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
