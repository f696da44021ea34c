use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Bounds and rule selection for exploration runs.
///
/// A `Config` is read once when a run starts and never changes during it.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// How many times a loop header is entered before its state is widened.
    pub loop_visit_limit: usize,
    /// How many instructions a run may execute before it is abandoned.
    pub max_steps: usize,
    /// Rules to run. `None` runs every registered rule.
    pub enabled_checks: Option<BTreeSet<String>>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            loop_visit_limit: 2,
            max_steps: 10_000,
            enabled_checks: None,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Config, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_check_enabled(&self, rule_id: &str) -> bool {
        match self.enabled_checks {
            Some(ref enabled_checks) => enabled_checks.contains(rule_id),
            None => true,
        }
    }
}
