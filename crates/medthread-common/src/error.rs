use thiserror::Error;

#[derive(Debug, Error)]
pub enum MedthreadError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("Upstream returned HTTP {status} from {service}")]
    Upstream { service: &'static str, status: u16 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network capabilities capped: {0}")]
    Security(String),
}
