//! Per-pass condition state.
//!
//! # Invariants
//! - One resolver belongs to exactly one gathering pass for one subject.
//! - A gate on a condition not recorded in this pass stays closed, including
//!   negated gates.

use crate::model::provider::Conditional;
use std::collections::HashMap;

/// Key-value store of condition results recorded during one pass.
#[derive(Debug, Default)]
pub struct ConditionResolver {
    values: HashMap<String, bool>,
}

impl ConditionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or overwrites one condition for the in-progress pass.
    pub fn record(&mut self, condition: impl Into<String>, value: bool) {
        self.values.insert(condition.into(), value);
    }

    pub fn get(&self, condition: &str) -> Option<bool> {
        self.values.get(condition).copied()
    }

    /// Whether a provider with `gate` may run now.
    pub fn is_satisfied(&self, gate: Option<&Conditional>) -> bool {
        let Some(gate) = gate else {
            return true;
        };
        match self.get(&gate.name) {
            Some(value) => value != gate.negated,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ConditionResolver;
    use crate::model::provider::Conditional;

    #[test]
    fn ungated_providers_are_always_satisfied() {
        let resolver = ConditionResolver::new();
        assert!(resolver.is_satisfied(None));
    }

    #[test]
    fn unrecorded_condition_fails_closed() {
        let resolver = ConditionResolver::new();
        assert!(!resolver.is_satisfied(Some(&Conditional::new("banned"))));
        assert!(!resolver.is_satisfied(Some(&Conditional::negated("banned"))));
    }

    #[test]
    fn recorded_values_open_matching_gates() {
        let mut resolver = ConditionResolver::new();
        resolver.record("banned", true);
        assert!(resolver.is_satisfied(Some(&Conditional::new("banned"))));
        assert!(!resolver.is_satisfied(Some(&Conditional::negated("banned"))));

        resolver.record("banned", false);
        assert!(!resolver.is_satisfied(Some(&Conditional::new("banned"))));
        assert!(resolver.is_satisfied(Some(&Conditional::negated("banned"))));
    }
}
