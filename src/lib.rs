//! Traffic-sign violation watcher.
//!
//! Links a real-time sign detector to a car-control backend: signs seen by
//! the detector become the vehicle's "current sign", and car actions that the
//! current sign prohibits are reported as violations.
//!
//! # Module Structure
//!
//! - `detect`: prediction frames, dominant-sign selection, announce debouncer
//! - `state`: the current-sign store shared by both paths
//! - `rules`: car actions, rule table, violation matcher
//! - `transport`: delivery of sign updates and violation reports
//! - `api`: HTTP routes of the violation server
//! - `config`: file + environment configuration

pub mod api;
pub mod config;
pub mod detect;
pub mod rules;
pub mod state;
pub mod transport;

pub use detect::{
    dominant, Decision, Detection, PredictionFrame, SignDebouncer, SignUpdate, NONE_SIGN,
};
pub use rules::{ActionEvent, CarAction, RuleMatcher, RuleTable, ViolationRecord};
pub use state::{SignState, SignStateStore, INITIAL_SIGN};
pub use transport::{SignSink, ViolationReporter};
