//! Ranker / Deduplicator
//!
//! Collapses candidates that name the same issue, orders the survivors by
//! confidence and cuts them down to what a caller should see.

use std::collections::HashMap;

use triage_core::{Diagnosis, DiagnosisCandidate};

use crate::config::EngineConfig;

/// Ranking settings taken from [`EngineConfig`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranker {
    pub max_results: usize,
    pub min_confidence: f64,
    pub sentinel_confidence: f64,
}

impl Default for Ranker {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl Ranker {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_results: config.max_results,
            min_confidence: config.min_confidence,
            sentinel_confidence: config.sentinel_confidence,
        }
    }

    /// Group by name, keep groups at or above the threshold, best first.
    /// Never returns an empty list.
    pub fn rank(&self, mut candidates: Vec<DiagnosisCandidate>) -> Vec<Diagnosis> {
        candidates.sort_by_key(|c| c.catalog_position);

        let mut groups: Vec<Vec<DiagnosisCandidate>> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for candidate in candidates {
            match index.get(&candidate.name) {
                Some(&i) => groups[i].push(candidate),
                None => {
                    index.insert(candidate.name.clone(), groups.len());
                    groups.push(vec![candidate]);
                }
            }
        }

        // Groups were created in catalog order, so a stable sort keeps the
        // earliest rule first among equal confidences.
        let mut ranked: Vec<Diagnosis> = groups.iter().map(|g| merge_group(g)).collect();
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        ranked.retain(|d| d.confidence >= self.min_confidence);
        ranked.truncate(self.max_results);

        if ranked.is_empty() {
            return vec![Diagnosis::insufficient_data(self.sentinel_confidence)];
        }
        ranked
    }
}

/// Merge one same-name group, given in catalog order
fn merge_group(group: &[DiagnosisCandidate]) -> Diagnosis {
    let mut strongest = &group[0];
    for candidate in &group[1..] {
        if candidate.confidence > strongest.confidence {
            strongest = candidate;
        }
    }

    let reasoning = group
        .iter()
        .map(|c| {
            let mut line = format!("{} [rule {}, {:.2}]", c.evidence, c.source_rule_id, c.confidence);
            if !c.matched_conditions.is_empty() {
                line.push_str(&format!(" matched: {}", c.matched_conditions.join(", ")));
            }
            if !c.unmatched_conditions.is_empty() {
                line.push_str(&format!("; missing: {}", c.unmatched_conditions.join(", ")));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n");

    Diagnosis {
        name: strongest.name.clone(),
        confidence: strongest.confidence.clamp(0.0, 1.0),
        evidence: strongest.evidence.clone(),
        reasoning,
        remedy: strongest.remedy.clone(),
        severity: strongest.severity,
        rule_ids: group.iter().map(|c| c.source_rule_id).collect(),
    }
}
