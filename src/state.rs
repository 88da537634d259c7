//! Current-sign state store.
//!
//! One store per vehicle context, shared by reference (`Arc`) between the
//! sign-update path and the action-check path. Reads and writes are atomic
//! with respect to each other; nothing orders an action check against a
//! concurrent sign update.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::RwLock;

/// Sign value before any update has been received.
pub const INITIAL_SIGN: &str = "none";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SignState {
    pub sign: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SignStateStore {
    current: RwLock<SignState>,
}

impl SignStateStore {
    pub fn new() -> Self {
        Self::with_state(SignState {
            sign: INITIAL_SIGN.to_string(),
            timestamp: Utc::now(),
        })
    }

    pub fn with_state(state: SignState) -> Self {
        Self {
            current: RwLock::new(state),
        }
    }

    /// Overwrites the current sign unconditionally.
    pub fn set(&self, sign: impl Into<String>, at: DateTime<Utc>) {
        let next = SignState {
            sign: sign.into(),
            timestamp: at,
        };
        // A poisoned lock still holds a whole record: writes replace it in one assignment.
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = next;
    }

    pub fn get(&self) -> SignState {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Default for SignStateStore {
    fn default() -> Self {
        Self::new()
    }
}
