use serde::Serialize;
use std::time::{Duration, Instant};

use super::result::{dominant, Detection};

/// Sentinel announced when a previously announced sign leaves the frame.
pub const NONE_SIGN: &str = "NONE";

/// Minimum spacing between two announcements.
pub const DEFAULT_THROTTLE_INTERVAL: Duration = Duration::from_secs(2);

/// A sign change worth announcing to the state store.
///
/// Serializes to the `/detected_sign` request body.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SignUpdate {
    pub sign: String,
    pub confidence: f32,
}

impl SignUpdate {
    pub fn new(sign: impl Into<String>, confidence: f32) -> Self {
        Self {
            sign: sign.into(),
            confidence,
        }
    }

    fn none() -> Self {
        Self::new(NONE_SIGN, 1.0)
    }
}

/// Announce state. `Announced` holds the last emitted label and when it was emitted.
#[derive(Clone, Debug, PartialEq)]
pub enum AnnounceState {
    Idle,
    Announced { label: String, at: Instant },
}

/// Outcome of evaluating one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    Emit(SignUpdate),
    /// Nothing to announce: the frame is empty and nothing (or NONE) is current.
    NoDetections,
    /// The candidate is already the announced sign.
    SameSign(String),
    /// A different sign arrived inside the throttle window. It is dropped, not queued.
    Throttled {
        candidate: String,
        remaining: Duration,
    },
}

impl Decision {
    pub fn into_update(self) -> Option<SignUpdate> {
        match self {
            Decision::Emit(update) => Some(update),
            _ => None,
        }
    }
}

/// Debounce + throttle gate in front of the state store.
///
/// A label is announced only when it differs from the last announced one and
/// at least `interval` has passed since that announcement. An emit commits
/// immediately; the caller's delivery outcome never rolls it back.
#[derive(Debug)]
pub struct SignDebouncer {
    interval: Duration,
    state: AnnounceState,
}

impl SignDebouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: AnnounceState::Idle,
        }
    }

    pub fn state(&self) -> &AnnounceState {
        &self.state
    }

    pub fn last_emitted(&self) -> Option<&str> {
        match &self.state {
            AnnounceState::Idle => None,
            AnnounceState::Announced { label, .. } => Some(label.as_str()),
        }
    }

    /// Evaluates one frame, returning the update to announce, if any.
    pub fn evaluate(&mut self, detections: &[Detection], now: Instant) -> Option<SignUpdate> {
        self.decide(detections, now).into_update()
    }

    /// Like [`evaluate`](Self::evaluate), but reports why a frame was not announced.
    pub fn decide(&mut self, detections: &[Detection], now: Instant) -> Decision {
        let candidate = candidate(&self.state, detections);
        let (next, decision) = transition(&self.state, candidate, now, self.interval);
        self.state = next;
        decision
    }
}

impl Default for SignDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE_INTERVAL)
    }
}

fn candidate(state: &AnnounceState, detections: &[Detection]) -> Option<SignUpdate> {
    if !detections.is_empty() {
        return dominant(detections).map(|d| SignUpdate::new(d.label.clone(), d.confidence));
    }
    match state {
        AnnounceState::Announced { label, .. } if label != NONE_SIGN => Some(SignUpdate::none()),
        _ => None,
    }
}

fn transition(
    state: &AnnounceState,
    candidate: Option<SignUpdate>,
    now: Instant,
    interval: Duration,
) -> (AnnounceState, Decision) {
    let Some(update) = candidate else {
        return (state.clone(), Decision::NoDetections);
    };
    match state {
        AnnounceState::Idle => emit(update, now),
        AnnounceState::Announced { label, .. } if *label == update.sign => {
            (state.clone(), Decision::SameSign(update.sign))
        }
        AnnounceState::Announced { at, .. } => {
            let elapsed = now.saturating_duration_since(*at);
            if elapsed >= interval {
                emit(update, now)
            } else {
                (
                    state.clone(),
                    Decision::Throttled {
                        candidate: update.sign,
                        remaining: interval - elapsed,
                    },
                )
            }
        }
    }
}

fn emit(update: SignUpdate, now: Instant) -> (AnnounceState, Decision) {
    let next = AnnounceState::Announced {
        label: update.sign.clone(),
        at: now,
    };
    (next, Decision::Emit(update))
}
