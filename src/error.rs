//! Error types for the metrics bridge.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Error type for bridge operations.
#[derive(Debug)]
pub enum BridgeError {
    /// A metric with this name is already registered in the registry.
    DuplicateMetric(String),

    /// A breaker with the same label tuple is already bound and the bridge
    /// rejects duplicates.
    DuplicateBinding {
        /// Name of the breaker.
        name: String,

        /// Group of the breaker, if it has one.
        group: Option<String>,
    },

    /// An event name that no breaker emits.
    UnknownEvent(String),

    /// The bridge configuration is not usable.
    InvalidConfig(String),

    /// Rendering the registry to text failed.
    Encoding(fmt::Error),
}

impl Display for BridgeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::DuplicateMetric(name) => {
                write!(f, "Metric {} is already registered", name)
            }
            BridgeError::DuplicateBinding { name, group } => match group {
                Some(group) => write!(f, "Breaker {} in group {} is already bound", name, group),
                None => write!(f, "Breaker {} is already bound", name),
            },
            BridgeError::UnknownEvent(event) => write!(f, "Unknown breaker event: {}", event),
            BridgeError::InvalidConfig(reason) => write!(f, "Invalid bridge configuration: {}", reason),
            BridgeError::Encoding(e) => write!(f, "Failed to encode metrics: {}", e),
        }
    }
}

impl Error for BridgeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BridgeError::Encoding(e) => Some(e),
            _ => None,
        }
    }
}

impl From<fmt::Error> for BridgeError {
    fn from(e: fmt::Error) -> Self {
        BridgeError::Encoding(e)
    }
}
