//! Error types for the lanwatch-monitor crate.

use thiserror::Error;

use crate::platform::PlatformError;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Discovery failed: {0}")]
    DiscoveryFailed(#[source] PlatformError),

    #[error("Discovery cycle aborted before completion")]
    CycleAborted,

    #[error("{0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
