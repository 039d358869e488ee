//! Explanation-phase timing for hatbox rooms.
//!
//! A turn's explanation phase is bracketed by two server-side timers:
//!
//! 1. a **reveal** timer — after a fixed lead-in the drawn word is shown to
//!    the speaker (everyone sees the countdown start at the same moment,
//!    the speaker learns the word only when it ends);
//! 2. a **forced finish** — a fallback that closes the phase if the speaker
//!    never reports a result, after the full explanation window plus some
//!    slack for the final signal to arrive.
//!
//! There is deliberately no cancellation. A timer firing carries the turn
//! number it was armed for ([`TimerFired::turn`]); the room compares it
//! against its current turn counter and drops stale firings. Whichever of
//! "speaker finished" and "timer fired" happens first advances the counter
//! and thereby retires the other.
//!
//! All instants are [`tokio::time::Instant`], so tests running under
//! `#[tokio::test(start_paused = true)]` control the clock exactly.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{trace, warn};

// ---------------------------------------------------------------------------
// Timings
// ---------------------------------------------------------------------------

/// The four intervals that shape an explanation phase.
///
/// Defaults match the party-game pacing the server shipped with: 3 s of
/// lead-in, 20 s to explain, 3 s of post-deadline slack, 2 s of network
/// grace before the forced finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnTimings {
    /// Lead-in between "both ready" and the word reveal.
    pub pre: Duration,
    /// How long the speaker gets once the word is revealed.
    pub explanation: Duration,
    /// Slack after the deadline during which a final signal still counts.
    pub post: Duration,
    /// Extra grace before the server force-finishes on its own.
    pub grace: Duration,
}

impl Default for TurnTimings {
    fn default() -> Self {
        Self {
            pre: Duration::from_secs(3),
            explanation: Duration::from_secs(20),
            post: Duration::from_secs(3),
            grace: Duration::from_secs(2),
        }
    }
}

impl TurnTimings {
    /// Shortest allowed explanation window.
    pub const MIN_EXPLANATION: Duration = Duration::from_millis(1);

    /// Fixes out-of-range values so the timings are safe to use.
    ///
    /// Called by the server builder. A zero explanation window would end
    /// every phase the instant it starts, so it is floored at
    /// [`Self::MIN_EXPLANATION`].
    pub fn validated(mut self) -> Self {
        if self.explanation < Self::MIN_EXPLANATION {
            warn!(
                explanation_ms = self.explanation.as_millis() as u64,
                "explanation window below minimum — clamping"
            );
            self.explanation = Self::MIN_EXPLANATION;
        }
        self
    }

    /// Total delay from "both ready" to the forced finish.
    pub fn force_finish_delay(&self) -> Duration {
        self.pre + self.explanation + self.post + self.grace
    }
}

// ---------------------------------------------------------------------------
// Per-phase schedule
// ---------------------------------------------------------------------------

/// The resolved deadlines of one explanation phase.
///
/// Created when both roles are ready; lives inside the room's `Explaining`
/// substate until the phase closes. The wire-visible start time is captured
/// once here so every client sees the same number regardless of when it
/// resynchronizes.
#[derive(Debug, Clone, Copy)]
pub struct ExplanationSchedule {
    start: Instant,
    deadline: Instant,
    force_finish_at: Instant,
    start_unix_ms: u64,
}

impl ExplanationSchedule {
    /// Computes the schedule for a phase beginning now.
    pub fn new(timings: &TurnTimings) -> Self {
        let now = Instant::now();
        let start = now + timings.pre;
        let start_unix_ms = (SystemTime::now() + timings.pre)
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64);
        Self {
            start,
            deadline: start + timings.explanation,
            force_finish_at: now + timings.force_finish_delay(),
            start_unix_ms,
        }
    }

    /// When the word is revealed to the speaker.
    pub fn reveal_at(&self) -> Instant {
        self.start
    }

    /// When the fallback forced finish fires.
    pub fn force_finish_at(&self) -> Instant {
        self.force_finish_at
    }

    /// Wall-clock start of the explanation, in Unix milliseconds. This is
    /// what goes on the wire.
    pub fn start_unix_ms(&self) -> u64 {
        self.start_unix_ms
    }

    /// Whether the lead-in has elapsed and the explanation is running.
    pub fn started(&self) -> bool {
        Instant::now() >= self.start
    }

    /// Whether the speaker's explanation window is over.
    pub fn past_deadline(&self) -> bool {
        Instant::now() > self.deadline
    }
}

// ---------------------------------------------------------------------------
// Timer commands
// ---------------------------------------------------------------------------

/// Which of the two armed timers fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The lead-in elapsed; reveal the drawn word to the speaker.
    RevealWord,
    /// The fallback deadline elapsed; close the phase if still open.
    ForceFinish,
}

/// A timer firing, tagged with the turn it was armed for.
///
/// Consumers must treat a `TimerFired` whose `turn` no longer matches their
/// turn counter as a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub turn: u64,
    pub event: TimerEvent,
}

/// Arms a timer: spawns a task that sleeps until `at` and then pushes
/// `command` into the given queue.
///
/// If the receiver is gone by the time the timer fires (the room ended),
/// the firing evaporates with it — that silence is intended.
pub fn arm<C>(at: Instant, tx: mpsc::Sender<C>, command: C)
where
    C: Send + 'static,
{
    tokio::spawn(async move {
        time::sleep_until(at).await;
        if tx.send(command).await.is_err() {
            trace!("timer fired after its room closed; dropped");
        }
    });
}
