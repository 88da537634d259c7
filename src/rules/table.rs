use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, HashMap};

use super::action::CarAction;

/// Sign name → prohibited action → violation description.
///
/// Lookups are exact string matches on the sign name. Read-only once built.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleTable {
    rules: HashMap<String, HashMap<CarAction, String>>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in table for the simulator car.
    pub fn standard() -> Self {
        Self::new()
            .with_rule("right turn prohibited", CarAction::Right, "right turn prohibited")
            .with_rule("left turn prohibited", CarAction::Left, "left turn prohibited")
            .with_rule("no entry", CarAction::Forward, "no entry")
            .with_rule("horn prohibited", CarAction::Horn, "horn prohibited")
    }

    pub fn with_rule(
        mut self,
        sign: impl Into<String>,
        action: CarAction,
        description: impl Into<String>,
    ) -> Self {
        self.insert(sign, action, description);
        self
    }

    pub fn insert(
        &mut self,
        sign: impl Into<String>,
        action: CarAction,
        description: impl Into<String>,
    ) {
        self.rules
            .entry(sign.into())
            .or_default()
            .insert(action, description.into());
    }

    /// Builds a table from configuration, where action codes are still strings.
    pub fn from_codes(raw: &BTreeMap<String, BTreeMap<String, String>>) -> Result<Self> {
        let mut table = Self::new();
        for (sign, prohibited) in raw {
            if sign.is_empty() {
                return Err(anyhow!("rule table contains an empty sign name"));
            }
            for (code, description) in prohibited {
                let action: CarAction = code
                    .parse()
                    .map_err(|e| anyhow!("rule for sign '{}': {}", sign, e))?;
                table.insert(sign.clone(), action, description.clone());
            }
        }
        Ok(table)
    }

    /// Violation description when `action` is prohibited under `sign`.
    pub fn lookup(&self, sign: &str, action: CarAction) -> Option<&str> {
        self.rules
            .get(sign)
            .and_then(|prohibited| prohibited.get(&action))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
