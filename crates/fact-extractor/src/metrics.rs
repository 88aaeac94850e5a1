//! Quality Metrics module
//!
//! Scores extracted triples against a hand-labelled gold set with
//! precision, recall and F1.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use fact_core::Triple;

// ============================================================================
// Triple Metrics
// ============================================================================

/// Metrics for triple extraction evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripleMetrics {
    /// True positives (extracted and in the gold set)
    pub true_positives: usize,
    /// False positives (extracted but not in the gold set)
    pub false_positives: usize,
    /// False negatives (missed gold triples)
    pub false_negatives: usize,
    /// Distinct triples in the gold set
    pub gold_total: usize,
    /// Distinct triples extracted
    pub predicted_total: usize,
}

impl TripleMetrics {
    /// Calculate precision (TP / (TP + FP))
    pub fn precision(&self) -> f32 {
        if self.true_positives + self.false_positives == 0 {
            0.0
        } else {
            self.true_positives as f32 / (self.true_positives + self.false_positives) as f32
        }
    }

    /// Calculate recall (TP / (TP + FN))
    pub fn recall(&self) -> f32 {
        if self.true_positives + self.false_negatives == 0 {
            0.0
        } else {
            self.true_positives as f32 / (self.true_positives + self.false_negatives) as f32
        }
    }

    /// Calculate F1 score (2 * P * R / (P + R))
    pub fn f1_score(&self) -> f32 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

// ============================================================================
// Gold Standard
// ============================================================================

/// A gold standard triple for evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GoldTriple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl GoldTriple {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    fn key(&self, case_sensitive: bool) -> (String, String, String) {
        if case_sensitive {
            (
                self.subject.clone(),
                self.predicate.clone(),
                self.object.clone(),
            )
        } else {
            (
                self.subject.to_lowercase(),
                self.predicate.to_lowercase(),
                self.object.to_lowercase(),
            )
        }
    }
}

impl From<&Triple> for GoldTriple {
    fn from(t: &Triple) -> Self {
        Self::new(t.subject(), t.predicate(), t.object())
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// Evaluator for extraction quality
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    case_sensitive: bool,
}

impl Evaluator {
    /// Create an evaluator matching case-insensitively
    pub fn new() -> Self {
        Self::default()
    }

    /// Require exact case when matching
    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    /// Evaluate extracted triples against a gold set
    pub fn evaluate_triples(&self, predicted: &[Triple], gold: &[GoldTriple]) -> TripleMetrics {
        let predicted_set: HashSet<_> = predicted
            .iter()
            .map(|t| GoldTriple::from(t).key(self.case_sensitive))
            .collect();
        let gold_set: HashSet<_> = gold.iter().map(|g| g.key(self.case_sensitive)).collect();

        let true_positives = predicted_set.intersection(&gold_set).count();

        TripleMetrics {
            true_positives,
            false_positives: predicted_set.len() - true_positives,
            false_negatives: gold_set.len() - true_positives,
            gold_total: gold_set.len(),
            predicted_total: predicted_set.len(),
        }
    }
}

// ============================================================================
// Aggregate Metrics
// ============================================================================

/// Aggregate metrics over a batch of documents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub triple_metrics: TripleMetrics,
    pub num_documents: usize,
}

impl AggregateMetrics {
    /// Add one document's metrics
    pub fn add(&mut self, metrics: &TripleMetrics) {
        self.triple_metrics.true_positives += metrics.true_positives;
        self.triple_metrics.false_positives += metrics.false_positives;
        self.triple_metrics.false_negatives += metrics.false_negatives;
        self.triple_metrics.gold_total += metrics.gold_total;
        self.triple_metrics.predicted_total += metrics.predicted_total;
        self.num_documents += 1;
    }

    /// Print a summary report
    pub fn report(&self) -> String {
        format!(
            "=== Triple Extraction Quality Report ===\n\n\
             Documents evaluated: {}\n\n\
               Precision: {:.1}%\n\
               Recall:    {:.1}%\n\
               F1 Score:  {:.1}%\n\
               Gold: {} | Predicted: {} | TP: {} | FP: {} | FN: {}\n",
            self.num_documents,
            self.triple_metrics.precision() * 100.0,
            self.triple_metrics.recall() * 100.0,
            self.triple_metrics.f1_score() * 100.0,
            self.triple_metrics.gold_total,
            self.triple_metrics.predicted_total,
            self.triple_metrics.true_positives,
            self.triple_metrics.false_positives,
            self.triple_metrics.false_negatives,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
