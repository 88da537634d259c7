use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::action::{ActionEvent, CarAction};
use super::table::RuleTable;
use crate::state::SignStateStore;

/// A prohibited action committed under the current sign.
///
/// Serializes to the reporting backend's JSON shape.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationRecord {
    pub timestamp: DateTime<Utc>,
    pub violation_type: String,
    pub traffic_sign: String,
    pub action_taken: CarAction,
    #[serde(rename = "carNumber")]
    pub vehicle_id: String,
}

/// Classifies car actions against the sign currently held in the store.
///
/// Every action is evaluated independently: repeating a prohibited action
/// under the same sign produces a new record each time.
pub struct RuleMatcher {
    rules: RuleTable,
    vehicle_id: String,
    store: Arc<SignStateStore>,
}

impl RuleMatcher {
    pub fn new(rules: RuleTable, vehicle_id: impl Into<String>, store: Arc<SignStateStore>) -> Self {
        Self {
            rules,
            vehicle_id: vehicle_id.into(),
            store,
        }
    }

    /// Sign the next check would be evaluated against.
    pub fn current_sign(&self) -> String {
        self.store.get().sign
    }

    pub fn check(&self, event: &ActionEvent) -> Option<ViolationRecord> {
        let sign = self.current_sign();
        self.check_against(&sign, event)
    }

    /// Same as [`check`](Self::check) with an explicit sign, for callers that
    /// already read the store.
    pub fn check_against(&self, sign: &str, event: &ActionEvent) -> Option<ViolationRecord> {
        let description = self.rules.lookup(sign, event.action)?;
        Some(ViolationRecord {
            timestamp: event.received_at,
            violation_type: description.to_string(),
            traffic_sign: sign.to_string(),
            action_taken: event.action,
            vehicle_id: self.vehicle_id.clone(),
        })
    }
}
