//! Document-level extraction results
//!
//! Bundles a document's triples with the equivalence report and run
//! statistics, plus views used by downstream fact search.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fact_core::Triple;

use crate::equivalence::{DiscoveryStats, EquivalenceReport};

/// Counters for one extraction run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub sentences_processed: usize,
    pub sentences_with_triples: usize,
    pub sentences_without_triples: usize,
    /// Triples dropped for scoring under the confidence threshold
    #[serde(default)]
    pub below_confidence: usize,
    pub discovery: DiscoveryStats,
}

/// Everything extracted from one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub document_id: Uuid,

    #[serde(default)]
    pub title: Option<String>,

    /// Triples in sentence order
    pub triples: Vec<Triple>,

    /// Equivalence state after discovery
    pub report: EquivalenceReport,

    pub stats: ExtractionStats,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DocumentAnalysis {
    /// Distinct subjects and objects, sorted
    pub fn entities(&self) -> Vec<String> {
        self.triples
            .iter()
            .flat_map(|t| [t.subject().to_string(), t.object().to_string()])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct predicates, sorted
    pub fn predicates(&self) -> Vec<String> {
        self.triples
            .iter()
            .map(|t| t.predicate().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Triples whose subject or object mentions `entity` (case-insensitive)
    pub fn triples_about(&self, entity: &str) -> Vec<&Triple> {
        let needle = entity.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.triples
            .iter()
            .filter(|t| {
                t.subject().to_lowercase().contains(&needle)
                    || t.object().to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Copy of this analysis keeping only triples scored at least `min_confidence`
    pub fn filter_by_confidence(&self, min_confidence: f32) -> DocumentAnalysis {
        DocumentAnalysis {
            triples: self
                .triples
                .iter()
                .filter(|t| t.confidence() >= min_confidence)
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    /// Share of sentences that produced at least one triple, in percent
    pub fn success_rate(&self) -> f64 {
        if self.stats.sentences_processed == 0 {
            return 0.0;
        }
        self.stats.sentences_with_triples as f64 / self.stats.sentences_processed as f64 * 100.0
    }

    /// Wall-clock duration of the run in milliseconds
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Render facts grouped by subject for an LLM prompt
    pub fn to_llm_context(&self, max_triples: Option<usize>) -> String {
        if self.triples.is_empty() {
            return "No factual relationships extracted.".to_string();
        }

        let shown = max_triples
            .unwrap_or(self.triples.len())
            .min(self.triples.len());

        let mut lines = vec![
            "DOCUMENT FACTS".to_string(),
            format!("Total facts: {}", self.triples.len()),
            format!("Entities: {}", self.entities().len()),
            format!("Relationships: {}", self.predicates().len()),
        ];
        if shown < self.triples.len() {
            lines.push(format!(
                "(Showing first {} of {} facts)",
                shown,
                self.triples.len()
            ));
        }

        // Subjects in first-seen order
        let mut groups: Vec<(&str, Vec<&Triple>)> = Vec::new();
        for triple in &self.triples[..shown] {
            match groups.iter().position(|(s, _)| *s == triple.subject()) {
                Some(i) => groups[i].1.push(triple),
                None => groups.push((triple.subject(), vec![triple])),
            }
        }

        for (subject, facts) in groups {
            lines.push(String::new());
            lines.push(format!("{subject}:"));
            for fact in facts {
                lines.push(format!("  - {} -> {}", fact.predicate(), fact.object()));
            }
        }

        lines.join("\n")
    }
}
