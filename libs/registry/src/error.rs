//! Sink error taxonomy.
//!
//! A sink failure is always scoped to one connection; broadcast fan-out
//! aggregates these without letting one recipient's failure propagate to
//! the others.

pub type SinkResult<T> = Result<T, SinkError>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SinkError {
    #[error("send failed: {detail}")]
    SendFailed { detail: String },

    /// The connection was closed or is closing; the write was not queued.
    #[error("sink closed")]
    Closed,

    /// Transport backpressure rejected the write.
    #[error("sink buffer full")]
    BufferFull,
}

impl SinkError {
    pub fn send_failed(detail: impl Into<String>) -> Self {
        SinkError::SendFailed {
            detail: detail.into(),
        }
    }

    /// Whether retrying the same write could succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SinkError::BufferFull)
    }

    /// Whether the connection itself is gone, not just this write.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, SinkError::Closed)
    }
}
