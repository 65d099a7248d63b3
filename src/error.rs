use thiserror::Error;

/// Attribute value decoding failures in the DynamoDB JSON wire format.
#[derive(Error, Debug)]
pub enum WireError {
    #[error("attribute value must be an object with exactly one type key: {0}")]
    Shape(String),

    #[error("unsupported attribute type: {0}")]
    UnknownType(String),

    #[error("attribute type {0} expects {1}")]
    Payload(String, &'static str),

    #[error("invalid base64 in binary attribute: {0}")]
    Base64(String),
}

/// Failures handling a proxy request before it reaches the data client.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("request body is not a valid proxy request: {0}")]
    Body(#[from] serde_json::Error),

    #[error("payload does not match {operation}: {source}")]
    Payload {
        operation: &'static str,
        source: serde_json::Error,
    },
}

/// Profile storage failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("stored profiles are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no configuration directory available for profile storage")]
    NoConfigDir,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
