//! Cluster and backplane error taxonomy.

use hub_codec::CodecError;
use std::time::Duration;

pub type ClusterResult<T> = Result<T, ClusterError>;

/// Failures of the shared pub/sub transport.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackplaneError {
    /// Transient outage; callers either fail fast with this or defer, but
    /// never report silent success.
    #[error("backplane unavailable: {0}")]
    Unavailable(String),

    /// The backplane (or one subscription) was shut down for good.
    #[error("backplane closed")]
    Closed,
}

impl BackplaneError {
    pub fn unavailable(detail: impl Into<String>) -> Self {
        BackplaneError::Unavailable(detail.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, BackplaneError::Unavailable(_))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClusterError {
    /// No ack arrived in time. The membership change may or may not have
    /// been applied by the owning server; callers must treat this as
    /// "unknown outcome", not "failure".
    #[error("group operation timed out after {timeout:?}; outcome unknown")]
    AckTimeout { timeout: Duration },

    #[error(transparent)]
    Backplane(#[from] BackplaneError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A backplane envelope could not be encoded or decoded.
    #[error("invalid envelope: {detail}")]
    Envelope { detail: String },

    /// Serialized message exceeds the configured size limit.
    #[error("message of {size} bytes exceeds the {limit}-byte limit")]
    MessageTooLarge { size: usize, limit: usize },

    /// Operation attempted after `dispose()`.
    #[error("lifetime manager disposed")]
    Disposed,
}

impl ClusterError {
    pub fn envelope(detail: impl Into<String>) -> Self {
        ClusterError::Envelope {
            detail: detail.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClusterError::AckTimeout { .. })
    }
}
