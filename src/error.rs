//! Error types for the X-Air remote

use std::time::Duration;
use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum XairError {
    #[error("No mixer answered the discovery broadcast within {0:?}")]
    DiscoveryTimeout(Duration),

    #[error("Malformed reply to {address}: {reason}")]
    MalformedReply { address: String, reason: String },

    #[error("Mixer at {0} did not answer the info query, check the ip address")]
    ValidationFailed(String),

    #[error("OSC error: {0}")]
    Osc(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Control surface error: {0}")]
    Surface(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rosc::OscError> for XairError {
    fn from(err: rosc::OscError) -> Self {
        XairError::Osc(format!("{:?}", err))
    }
}

pub type Result<T> = std::result::Result<T, XairError>;
