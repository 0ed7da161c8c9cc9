//! Error types for layout operations.

use thiserror::Error;

use crate::signal::HandlerId;

/// Errors that can occur while building or running a layout.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// A position contained NaN or an infinite component.
    #[error("non-finite position in {context} for index {index}")]
    NonFinitePosition {
        context: &'static str,
        index: usize,
    },

    /// A position drifted further from the origin than the layout tolerates.
    #[error("position magnitude {magnitude} exceeds threshold {threshold} in {context} for index {index}")]
    PositionMagnitude {
        magnitude: f64,
        threshold: f64,
        context: &'static str,
        index: usize,
    },

    /// Direct positional access with an index past the node count.
    #[error("position index {index} out of range (node count {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Disconnecting a handler id that is not registered.
    #[error("signal handler {id:?} not connected")]
    HandlerNotConnected { id: HandlerId },

    /// Configuration values that would corrupt integration.
    #[error("invalid layout config: {0}")]
    InvalidConfig(String),

    /// Failed to parse a JSON configuration.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Failed to read a configuration file.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
