//! Fact Extractor - Triple extraction pipeline
//!
//! Turns dependency-parsed sentences into canonical
//! (subject, predicate, object) triples, resolving entity aliases
//! through a two-layer equivalence table.

use fact_core::{SentenceRef, SentenceSpan, Triple};

/// Trait for sentence-level triple extractors
///
/// Sentences that cannot be analyzed yield an empty vector, never an error.
pub trait TripleExtractor: Send + Sync {
    fn extract(&self, sentence: &SentenceSpan, source: SentenceRef) -> Vec<Triple>;
}

pub mod analysis;
pub mod equivalence;
pub mod labels;
pub mod metrics;
pub mod session;
pub mod triple;

pub use analysis::{DocumentAnalysis, ExtractionStats};
pub use equivalence::{DiscoveryStats, EntityEquivalenceMapper, EquivalenceReport};
pub use labels::{get_table, Language, LabelTable, Role};
pub use metrics::{Evaluator, GoldTriple, TripleMetrics};
pub use session::ExtractionSession;
pub use triple::{extract, DependencyExtractor};
