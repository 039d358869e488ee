//! Unified error type for the hatbox server.

use hatbox_protocol::ProtocolError;
use hatbox_room::GameError;
use hatbox_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When embedding the server, you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum HatboxError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A game-level rejection (bad key, wrong state, not your turn).
    #[error(transparent)]
    Game(#[from] GameError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::SendFailed(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "gone",
        ));
        let hatbox_err: HatboxError = err.into();
        assert!(matches!(hatbox_err, HatboxError::Transport(_)));
        assert!(hatbox_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let bad = serde_json::from_slice::<serde_json::Value>(b"not json")
            .unwrap_err();
        let hatbox_err: HatboxError = ProtocolError::Decode(bad).into();
        assert!(matches!(hatbox_err, HatboxError::Protocol(_)));
        assert!(hatbox_err.to_string().starts_with("decode failed"));
    }

    #[test]
    fn test_from_game_error() {
        let err = GameError::NotHost;
        let hatbox_err: HatboxError = err.into();
        assert!(matches!(hatbox_err, HatboxError::Game(_)));
        assert_eq!(
            hatbox_err.to_string(),
            "only the host can start the game"
        );
    }
}
