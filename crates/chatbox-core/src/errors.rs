//! Error types for ChatBox
//!
//! Transport and codec failures are recoverable by construction: the engine
//! logs them and turns them into notices. Only configuration and channel
//! errors ever reach a caller.

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Specific transport error types
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Transport is not available: {reason}")]
    Unavailable { reason: String },
    #[error("Send failed to {peer_count} peer(s): {reason}")]
    SendFailed { peer_count: usize, reason: String },
    #[error("Peer not found: {peer_id}")]
    PeerNotFound { peer_id: String },
    #[error("Connection request to {peer_id} failed: {reason}")]
    ConnectionFailed { peer_id: String, reason: String },
}

/// Reasons a wire record could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Record has {found} fields, expected 5")]
    TooFewFields { found: usize },
    #[error("Unknown message kind: {kind}")]
    UnknownKind { kind: String },
    #[error("Unknown scope: {scope}")]
    UnknownScope { scope: String },
    #[error("Payload is not valid UTF-8")]
    InvalidUtf8,
    #[error("Empty {field} field")]
    EmptyField { field: &'static str },
}

// ----------------------------------------------------------------------------
// Main Error Type
// ----------------------------------------------------------------------------

/// Core error type for ChatBox
#[derive(Debug, thiserror::Error)]
pub enum ChatboxError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("Channel error: {message}")]
    Channel { message: String },

    #[error("Capability check failed for {mode} mode")]
    CapabilityDenied { mode: crate::Mode },

    #[error("Routing engine is not running")]
    EngineStopped,
}

impl ChatboxError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
        }
    }

    /// Whether the engine can keep serving after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ChatboxError::Configuration { .. } | ChatboxError::EngineStopped
        )
    }
}

pub type ChatboxResult<T> = Result<T, ChatboxError>;
