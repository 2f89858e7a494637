//! Predicate evaluation and match scoring
//!
//! Required conditions gate the rule, forbidden conditions veto it, optional
//! conditions scale its confidence:
//!
//! ```text
//! score = base                                        (no optional conditions)
//! score = base * (floor + (1 - floor) * matched/total)  (weighted)
//! ```

use serde_json::{Map, Value};

use triage_core::{FactValue, Facts};

use crate::rule::{Condition, Rule};

/// Share of the base confidence a rule keeps when none of its optional
/// conditions hold
pub const DEFAULT_OPTIONAL_FLOOR: f64 = 0.5;

/// A condition that held, with the fact that satisfied it
#[derive(Debug, Clone)]
pub struct ConditionHit<'r, 'f> {
    pub condition: &'r Condition,
    pub value: &'f FactValue,
}

impl ConditionHit<'_, '_> {
    /// e.g. `cpu_temp = 85 (cpu_temp > 80)`
    pub fn describe(&self) -> String {
        format!("{} = {} ({})", self.condition.key, self.value, self.condition)
    }
}

/// Outcome of a rule that fired
#[derive(Debug, Clone)]
pub struct RuleMatch<'r, 'f> {
    pub rule: &'r Rule,
    /// Final confidence, in [0, 1]
    pub score: f64,
    /// Weighted share of optional conditions that held (1.0 when there are none)
    pub match_ratio: f64,
    /// Required and optional conditions that held
    pub matched: Vec<ConditionHit<'r, 'f>>,
    /// Optional conditions that did not hold
    pub unmatched: Vec<&'r Condition>,
}

impl RuleMatch<'_, '_> {
    /// The satisfying facts as a JSON object, for template rendering
    pub fn matched_facts(&self) -> Value {
        let mut map = Map::new();
        for hit in &self.matched {
            map.insert(hit.condition.key.clone(), hit.value.to_json());
        }
        Value::Object(map)
    }

    pub fn matched_descriptions(&self) -> Vec<String> {
        self.matched.iter().map(ConditionHit::describe).collect()
    }

    pub fn unmatched_descriptions(&self) -> Vec<String> {
        self.unmatched.iter().map(|c| c.to_string()).collect()
    }
}

/// Scores rules against a fact set
#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    optional_floor: f64,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self {
            optional_floor: DEFAULT_OPTIONAL_FLOOR,
        }
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Floor is clamped into [0, 1]
    pub fn with_optional_floor(mut self, floor: f64) -> Self {
        self.optional_floor = if floor.is_nan() { DEFAULT_OPTIONAL_FLOOR } else { floor.clamp(0.0, 1.0) };
        self
    }

    pub fn optional_floor(&self) -> f64 {
        self.optional_floor
    }

    /// Evaluate one rule. `None` when it does not fire.
    pub fn evaluate<'r, 'f>(&self, rule: &'r Rule, facts: &'f Facts) -> Option<RuleMatch<'r, 'f>> {
        let mut matched = Vec::new();

        for condition in rule.required() {
            let value = facts.get(&condition.key);
            if !condition.holds(value) {
                return None;
            }
            matched.extend(value.map(|value| ConditionHit { condition, value }));
        }

        // A rule without required conditions would fire on any input
        if matched.is_empty() {
            return None;
        }

        if rule.forbidden().any(|c| c.holds(facts.get(&c.key))) {
            tracing::trace!(rule_id = rule.id, "vetoed by forbidden condition");
            return None;
        }

        let mut unmatched = Vec::new();
        let mut total = 0.0;
        let mut satisfied = 0.0;

        for condition in rule.optional() {
            total += condition.weight;
            match facts.get(&condition.key) {
                Some(value) if condition.holds(Some(value)) => {
                    satisfied += condition.weight;
                    matched.push(ConditionHit { condition, value });
                }
                _ => unmatched.push(condition),
            }
        }

        let (match_ratio, score) = if total > 0.0 {
            let ratio = satisfied / total;
            let factor = self.optional_floor + (1.0 - self.optional_floor) * ratio;
            (ratio, rule.base_confidence * factor)
        } else {
            (1.0, rule.base_confidence)
        };

        Some(RuleMatch {
            rule,
            score: score.clamp(0.0, 1.0),
            match_ratio,
            matched,
            unmatched,
        })
    }
}
