//! Violation rules: car actions, the sign → prohibited-action table, and the
//! matcher that classifies an action against the current sign.

mod action;
mod matcher;
mod table;

pub use action::{ActionEvent, CarAction};
pub use matcher::{RuleMatcher, ViolationRecord};
pub use table::RuleTable;
