//! Turn rotation: who speaks and who listens next.

/// Computes the next (speaker, listener) pair from the previous one.
///
/// Both indices advance by one each turn, with a tie-break whenever the
/// speaker wraps to 0 that shifts the listener off the speaker's seat.
/// The result is an irregular listener sequence, but two properties hold
/// for any `n >= 2`:
///
/// - every seat takes the speaker role exactly once per `n` turns, and
/// - `speaker == listener` never occurs.
///
/// The first pair of a game is `next_pair(n, n - 1, n - 2)`.
pub fn next_pair(n: usize, prev_speaker: usize, prev_listener: usize) -> (usize, usize) {
    let speaker = (prev_speaker + 1) % n;
    let mut listener = (prev_listener + 1) % n;
    if speaker == 0 {
        listener = (listener + 1) % n;
        if listener == speaker {
            // Only reachable when speaker == 0, so no further reduction
            // is needed to stay in range.
            listener += 1;
        }
    }
    (speaker, listener)
}

/// The opening pair for a roster of `n` players.
pub fn first_pair(n: usize) -> (usize, usize) {
    next_pair(n, n - 1, n.saturating_sub(2))
}
