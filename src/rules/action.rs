use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Control codes sent by the car.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CarAction {
    #[serde(rename = "FS")]
    Forward,
    #[serde(rename = "BS")]
    Backward,
    #[serde(rename = "RS")]
    Right,
    #[serde(rename = "LS")]
    Left,
    #[serde(rename = "Y")]
    Horn,
}

impl CarAction {
    pub const ALL: [CarAction; 5] = [
        CarAction::Forward,
        CarAction::Backward,
        CarAction::Right,
        CarAction::Left,
        CarAction::Horn,
    ];

    /// Wire code for this action.
    pub fn code(self) -> &'static str {
        match self {
            CarAction::Forward => "FS",
            CarAction::Backward => "BS",
            CarAction::Right => "RS",
            CarAction::Left => "LS",
            CarAction::Horn => "Y",
        }
    }
}

impl FromStr for CarAction {
    type Err = anyhow::Error;

    /// Exact, case-sensitive match on the wire code.
    fn from_str(code: &str) -> Result<Self> {
        CarAction::ALL
            .into_iter()
            .find(|action| action.code() == code)
            .ok_or_else(|| anyhow!("unknown action '{}'", code))
    }
}

impl fmt::Display for CarAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// An action received from the car.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionEvent {
    pub action: CarAction,
    pub received_at: DateTime<Utc>,
}

impl ActionEvent {
    pub fn new(action: CarAction, received_at: DateTime<Utc>) -> Self {
        Self {
            action,
            received_at,
        }
    }

    pub fn now(action: CarAction) -> Self {
        Self::new(action, Utc::now())
    }
}
