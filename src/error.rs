//! Error handling

use std::fmt;

/// Errors raised while running the text to image workflow.
#[derive(Debug)]
pub enum BridgeError {
    /// The gateway could not be reached or answered with a non-success status
    Gateway(String),
    /// The gateway answered but did not hand back a usable prompt record
    GatewayProcessing(String),
    /// The enhanced prompt was empty or could not be fetched
    PromptRetrieval(String),
    /// An image backend failed to produce an image
    Generation(String),
    /// Writing the image (or creating its directory) failed
    Filesystem(String),
    /// Invalid endpoint or client settings
    Config(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gateway(msg) => write!(f, "Gateway request failed: {msg}"),
            Self::GatewayProcessing(msg) => write!(f, "Gateway processing failed: {msg}"),
            Self::PromptRetrieval(msg) => write!(f, "Could not retrieve enhanced prompt: {msg}"),
            Self::Generation(msg) => write!(f, "{msg}"),
            Self::Filesystem(msg) => write!(f, "Filesystem error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for BridgeError {}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Filesystem(err.to_string())
    }
}

impl From<url::ParseError> for BridgeError {
    fn from(err: url::ParseError) -> Self {
        BridgeError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        BridgeError::Generation(err.to_string())
    }
}

impl From<base64::DecodeError> for BridgeError {
    fn from(err: base64::DecodeError) -> Self {
        BridgeError::Generation(format!("Failed to base64-decode image: {err}"))
    }
}

impl From<image::ImageError> for BridgeError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(err) => BridgeError::Filesystem(err.to_string()),
            other => BridgeError::Generation(format!("Failed to decode image: {other}")),
        }
    }
}
