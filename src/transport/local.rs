use anyhow::{anyhow, Result};
use chrono::Utc;
use std::sync::{Arc, Mutex};

use super::{SignSink, ViolationReporter};
use crate::detect::SignUpdate;
use crate::rules::ViolationRecord;
use crate::state::SignStateStore;

/// Writes sign updates straight into an in-process state store.
pub struct StoreSink {
    store: Arc<SignStateStore>,
}

impl StoreSink {
    pub fn new(store: Arc<SignStateStore>) -> Self {
        Self { store }
    }
}

impl SignSink for StoreSink {
    fn name(&self) -> &'static str {
        "store"
    }

    fn deliver(&self, update: &SignUpdate) -> Result<()> {
        self.store.set(update.sign.clone(), Utc::now());
        Ok(())
    }
}

/// Keeps every delivered update in memory. Optionally fails every delivery.
#[derive(Default)]
pub struct RecordingSink {
    updates: Mutex<Vec<SignUpdate>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that records attempts but reports every delivery as failed.
    pub fn failing() -> Self {
        Self {
            updates: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn updates(&self) -> Vec<SignUpdate> {
        self.updates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SignSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn deliver(&self, update: &SignUpdate) -> Result<()> {
        self.updates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(update.clone());
        if self.fail {
            return Err(anyhow!("recording sink configured to fail"));
        }
        Ok(())
    }
}

/// Keeps every reported violation in memory.
#[derive(Default)]
pub struct RecordingReporter {
    records: Mutex<Vec<ViolationRecord>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ViolationRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ViolationReporter for RecordingReporter {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn report(&self, record: &ViolationRecord) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record.clone());
        Ok(())
    }
}
