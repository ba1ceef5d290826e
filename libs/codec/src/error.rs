//! Codec error taxonomy.
//!
//! "Need more data" is not represented here: incremental parsing reports it
//! as `Ok(None)`. Every variant below is a hard failure for the record (or
//! handshake) being processed.

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CodecError {
    /// Structurally invalid record: bad JSON, missing required field,
    /// unknown message type tag, conflicting fields.
    #[error("malformed message: {detail}")]
    Malformed { detail: String },

    /// Handshake requested a protocol version the codec does not speak.
    #[error("unsupported protocol version: {version}")]
    UnsupportedVersion { version: i32 },

    /// The binder knows the target but the supplied arguments do not match
    /// its declared signature.
    #[error("argument binding failed for '{target}': {detail}")]
    Binding { target: String, detail: String },

    /// Invalid handshake record or unresolvable protocol name.
    #[error("handshake failed: {detail}")]
    Handshake { detail: String },
}

impl CodecError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        CodecError::Malformed {
            detail: detail.into(),
        }
    }

    pub fn unsupported_version(version: i32) -> Self {
        CodecError::UnsupportedVersion { version }
    }

    pub fn binding(target: impl Into<String>, detail: impl Into<String>) -> Self {
        CodecError::Binding {
            target: target.into(),
            detail: detail.into(),
        }
    }

    pub fn handshake(detail: impl Into<String>) -> Self {
        CodecError::Handshake {
            detail: detail.into(),
        }
    }

    /// Whether the read loop should close the connection on this error.
    ///
    /// Binding failures are scoped to one invocation; everything else means
    /// the byte stream itself can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CodecError::Binding { .. })
    }
}
