//! Error types for discovery and monitoring

use std::fmt;
use std::net::Ipv4Addr;

/// Result type alias for engine operations
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors that can occur while discovering or monitoring hosts
#[derive(Debug)]
pub enum MonitorError {
    /// A subnet prefix did not pass validation
    InvalidSubnet { value: String, reason: String },

    /// Invalid configuration value
    InvalidConfig(String),

    /// Local interfaces could not be listed
    InterfaceEnumeration(String),

    /// The registry could not grow to hold another host
    RegistryGrowth(String),

    /// A host was registered after discovery completed
    RegistrySealed(Ipv4Addr),

    /// I/O error
    IoError(std::io::Error),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::InvalidSubnet { value, reason } => {
                write!(
                    f,
                    "invalid subnet prefix '{}': {} (it should look like '192.168.1.')",
                    value, reason
                )
            }
            MonitorError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            MonitorError::InterfaceEnumeration(msg) => {
                write!(f, "failed to enumerate network interfaces: {}", msg)
            }
            MonitorError::RegistryGrowth(msg) => {
                write!(f, "host registry could not grow: {}", msg)
            }
            MonitorError::RegistrySealed(address) => {
                write!(f, "cannot register {} after discovery completed", address)
            }
            MonitorError::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::IoError(err)
    }
}

impl From<std::collections::TryReserveError> for MonitorError {
    fn from(err: std::collections::TryReserveError) -> Self {
        MonitorError::RegistryGrowth(err.to_string())
    }
}
