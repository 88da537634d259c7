//! Delivery boundary between decisions and the network.
//!
//! Decision code (`SignDebouncer`, `RuleMatcher`) returns what should be sent;
//! implementations of the traits here do the sending. Delivery is
//! at-most-once: callers log a failed attempt and move on.

mod http;
mod local;

pub use http::{HttpSignSink, HttpViolationReporter};
pub use local::{RecordingReporter, RecordingSink, StoreSink};

use anyhow::Result;

use crate::detect::SignUpdate;
use crate::rules::ViolationRecord;

/// Receives announced sign changes (normally the state store's HTTP endpoint).
pub trait SignSink: Send + Sync {
    fn name(&self) -> &'static str;

    fn deliver(&self, update: &SignUpdate) -> Result<()>;
}

/// Receives violation records (normally the violation-storage backend).
pub trait ViolationReporter: Send + Sync {
    fn name(&self) -> &'static str;

    fn report(&self, record: &ViolationRecord) -> Result<()>;
}

/// Delivers one sign update, logging the outcome. Returns whether it landed.
pub fn announce(sink: &dyn SignSink, update: &SignUpdate) -> bool {
    match sink.deliver(update) {
        Ok(()) => {
            log::info!("sign '{}' delivered via {}", update.sign, sink.name());
            true
        }
        Err(e) => {
            log::warn!(
                "sign '{}' not delivered via {}: {:#}",
                update.sign,
                sink.name(),
                e
            );
            false
        }
    }
}

/// Reports one violation, logging the outcome. Failed reports are dropped.
pub fn report(reporter: &dyn ViolationReporter, record: &ViolationRecord) -> bool {
    match reporter.report(record) {
        Ok(()) => {
            log::info!(
                "violation '{}' reported via {}",
                record.violation_type,
                reporter.name()
            );
            true
        }
        Err(e) => {
            log::warn!(
                "violation '{}' dropped, report via {} failed: {:#}",
                record.violation_type,
                reporter.name(),
                e
            );
            false
        }
    }
}
