//! Error types for the protocol layer.
//!
//! Each hatbox crate defines its own error enum. This keeps errors specific
//! and meaningful — a `ProtocolError` always means a serialization problem,
//! never a networking or game-rule one.

/// Errors that can occur while encoding or decoding messages.
///
/// The `#[error("...")]` attributes define the human-readable message for
/// each variant — what shows up in logs and in `Failure` payloads built
/// from a decode problem.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    ///
    /// The inner `serde_json::Error` is the original error from serde_json,
    /// wrapped so callers deal with `ProtocolError` uniformly regardless of
    /// which codec produced it.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, an unknown `type` tag, missing
    /// required fields, truncated frames, or a frame that is not valid
    /// UTF-8 text.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
