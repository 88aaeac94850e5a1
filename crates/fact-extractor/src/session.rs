//! Extraction Session
//!
//! Composition root for one document stream: owns the equivalence mapper and
//! the active label table, runs discovery to completion and then extracts
//! every sentence.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rayon::prelude::*;

use fact_core::{
    AppConfig, EntityMention, ExtractionConfig, FactError, ParsedDocument, Result, SentenceRef,
    SentenceSpan, Triple,
};

use crate::analysis::{DocumentAnalysis, ExtractionStats};
use crate::equivalence::{EntityEquivalenceMapper, EquivalenceReport};
use crate::labels::{get_table, LabelTable};
use crate::triple::DependencyExtractor;
use crate::TripleExtractor;

/// Stateful extraction pipeline for a sequence of documents
#[derive(Debug, Clone)]
pub struct ExtractionSession {
    table: LabelTable,
    mapper: EntityEquivalenceMapper,
    options: ExtractionConfig,
}

impl ExtractionSession {
    /// Build a session from configuration
    ///
    /// Fails with `UnsupportedLanguage` when no language is configured or the
    /// configured one has no label table.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let language = config
            .extraction
            .language
            .as_deref()
            .ok_or_else(|| FactError::UnsupportedLanguage("<unset>".to_string()))?;

        let table = get_table(language)?;
        let mapper = EntityEquivalenceMapper::from_config(&config.equivalence);

        tracing::info!(
            language = %table.language(),
            predefined = mapper.equivalence_report().predefined_count,
            "Extraction session ready"
        );

        Ok(Self::with_parts(table, mapper, config.extraction.clone()))
    }

    /// Build a session from already constructed parts
    pub fn with_parts(
        table: LabelTable,
        mapper: EntityEquivalenceMapper,
        options: ExtractionConfig,
    ) -> Self {
        Self {
            table,
            mapper,
            options,
        }
    }

    pub fn table(&self) -> &LabelTable {
        &self.table
    }

    pub fn mapper(&self) -> &EntityEquivalenceMapper {
        &self.mapper
    }

    /// Current equivalence state
    pub fn equivalence_report(&self) -> EquivalenceReport {
        self.mapper.equivalence_report()
    }

    /// Discover aliases, then extract triples from every sentence
    pub fn run(&mut self, document: &ParsedDocument) -> DocumentAnalysis {
        let started_at = Utc::now();

        if self.options.reset_dynamic_per_document {
            self.mapper.clear_dynamic();
        }

        // Discovery phase: exclusive access to the mapper
        let mentions = with_sentence_context(document);
        let discovery = self.mapper.discover_equivalences(&mentions);

        // Extraction phase: the mapper is only read from here on
        let extractor = DependencyExtractor::new(&self.table, &self.mapper)
            .with_coordinated_predicates(self.options.follow_coordinated_predicates);
        let mut per_sentence = extract_sentences(&extractor, document, self.options.parallel);

        let min_confidence = self.options.min_confidence;
        let mut below_confidence = 0;
        for triples in &mut per_sentence {
            let before = triples.len();
            triples.retain(|triple| triple.confidence() >= min_confidence);
            below_confidence += before - triples.len();
        }
        if below_confidence > 0 {
            tracing::debug!(
                removed = below_confidence,
                min_confidence,
                "Dropped low-confidence triples"
            );
        }

        let sentences_with_triples = per_sentence.iter().filter(|t| !t.is_empty()).count();
        let mut triples: Vec<Triple> = per_sentence.into_iter().flatten().collect();

        if self.options.deduplicate {
            let before = triples.len();
            deduplicate(&mut triples);
            if triples.len() < before {
                tracing::debug!(removed = before - triples.len(), "Removed duplicate triples");
            }
        }

        let stats = ExtractionStats {
            sentences_processed: document.sentences.len(),
            sentences_with_triples,
            sentences_without_triples: document.sentences.len() - sentences_with_triples,
            below_confidence,
            discovery,
        };

        tracing::info!(
            document = %document.id,
            sentences = stats.sentences_processed,
            triples = triples.len(),
            aliases = discovery.aliases_added,
            "Document extracted"
        );

        DocumentAnalysis {
            document_id: document.id,
            title: document.title.clone(),
            triples,
            report: self.mapper.equivalence_report(),
            stats,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Mentions with their sentence text filled in from the document
fn with_sentence_context(document: &ParsedDocument) -> Vec<EntityMention> {
    document
        .entities
        .iter()
        .map(|mention| {
            let mut mention = mention.clone();
            if mention.source_sentence.is_none() {
                if let Some(sentence) = mention
                    .sentence_index
                    .and_then(|index| document.sentences.get(index))
                {
                    mention.source_sentence = Some(sentence.text());
                }
            }
            mention
        })
        .collect()
}

/// Triples of each sentence, in sentence order
fn extract_sentences(
    extractor: &DependencyExtractor<'_>,
    document: &ParsedDocument,
    parallel: bool,
) -> Vec<Vec<Triple>> {
    let extract_one = |(index, sentence): (usize, &SentenceSpan)| {
        extractor.extract(sentence, SentenceRef::new(document.id, index))
    };

    if parallel {
        document
            .sentences
            .par_iter()
            .enumerate()
            .map(extract_one)
            .collect()
    } else {
        document
            .sentences
            .iter()
            .enumerate()
            .map(extract_one)
            .collect()
    }
}

/// Drop repeated triples (case-insensitive)
///
/// Of each repeated triple the highest-confidence occurrence survives, the
/// first one on ties. Survivors keep their sentence order.
fn deduplicate(triples: &mut Vec<Triple>) {
    let mut best: HashMap<(String, String, String), usize> = HashMap::new();
    for (index, triple) in triples.iter().enumerate() {
        best.entry(triple.key())
            .and_modify(|kept| {
                if triple.confidence() > triples[*kept].confidence() {
                    *kept = index;
                }
            })
            .or_insert(index);
    }

    let survivors: HashSet<usize> = best.into_values().collect();
    let mut index = 0;
    triples.retain(|_| {
        let keep = survivors.contains(&index);
        index += 1;
        keep
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use fact_core::Token;

    fn config(language: Option<&str>) -> AppConfig {
        let mut config = AppConfig::default();
        config.extraction.language = language.map(str::to_string);
        config
    }

    fn niacin_supports(object: &str) -> SentenceSpan {
        SentenceSpan::new(vec![
            Token::new("Niacin", "niacin", "PROPN", "nsubj", Some(1)),
            Token::new("supports", "support", "VERB", "ROOT", None),
            Token::new(object, object, "NOUN", "dobj", Some(1)),
        ])
    }

    #[test]
    fn test_session_requires_language() {
        assert!(matches!(
            ExtractionSession::new(&config(None)),
            Err(FactError::UnsupportedLanguage(_))
        ));
        assert!(matches!(
            ExtractionSession::new(&config(Some("latin"))),
            Err(FactError::UnsupportedLanguage(_))
        ));
        assert!(ExtractionSession::new(&config(Some("en"))).is_ok());
    }

    #[test]
    fn test_deduplicate_keeps_first() {
        let mut session = ExtractionSession::new(&config(Some("en"))).unwrap();
        let document = ParsedDocument::new(vec![
            niacin_supports("metabolism"),
            niacin_supports("Metabolism"),
            niacin_supports("digestion"),
        ]);

        let analysis = session.run(&document);

        assert_eq!(analysis.triples.len(), 2);
        assert_eq!(analysis.triples[0].source().sentence_index, 0);
        assert_eq!(analysis.triples[1].object(), "digestion");
        assert_eq!(analysis.stats.sentences_with_triples, 3);
    }

    #[test]
    fn test_deduplicate_prefers_higher_confidence() {
        let source = |index| SentenceRef::new(uuid::Uuid::nil(), index);
        let mut triples = vec![
            Triple::new("Iron", "support", "blood", source(0)).with_confidence(0.5),
            Triple::new("Zinc", "support", "skin", source(1)).with_confidence(0.6),
            Triple::new("iron", "support", "Blood", source(2)).with_confidence(0.8),
            Triple::new("Iron", "support", "blood", source(3)).with_confidence(0.8),
        ];

        deduplicate(&mut triples);

        let kept: Vec<usize> = triples.iter().map(|t| t.source().sentence_index).collect();
        assert_eq!(kept, vec![1, 2]);
    }

    #[test]
    fn test_low_confidence_triples_dropped() {
        let document = ParsedDocument::new(vec![
            niacin_supports("metabolism"),
            // Coordinated verb with a two-letter object scores 0.5 - 0.2
            SentenceSpan::new(vec![
                Token::new("Iron", "iron", "PROPN", "nsubj", Some(1)),
                Token::new("binds", "bind", "VERB", "ROOT", None),
                Token::new("oxygen", "oxygen", "NOUN", "dobj", Some(1)),
                Token::new("and", "and", "CCONJ", "cc", Some(1)),
                Token::new("carries", "carry", "VERB", "conj", Some(1)),
                Token::new("it", "it", "PRON", "dobj", Some(4)),
            ]),
        ]);

        let mut session = ExtractionSession::new(&config(Some("en"))).unwrap();
        let analysis = session.run(&document);
        let objects: Vec<&str> = analysis.triples.iter().map(Triple::object).collect();
        assert_eq!(objects, vec!["metabolism", "oxygen"]);
        assert_eq!(analysis.stats.below_confidence, 1);

        let mut permissive = config(Some("en"));
        permissive.extraction.min_confidence = 0.0;
        let mut session = ExtractionSession::new(&permissive).unwrap();
        assert_eq!(session.run(&document).triples.len(), 3);
    }

    #[test]
    fn test_deduplicate_disabled() {
        let mut config = config(Some("en"));
        config.extraction.deduplicate = false;
        let mut session = ExtractionSession::new(&config).unwrap();
        let document = ParsedDocument::new(vec![
            niacin_supports("metabolism"),
            niacin_supports("metabolism"),
        ]);

        assert_eq!(session.run(&document).triples.len(), 2);
    }

    #[test]
    fn test_parallel_preserves_order() {
        let mut config = config(Some("en"));
        config.extraction.parallel = true;
        config.extraction.deduplicate = false;
        let mut session = ExtractionSession::new(&config).unwrap();

        let objects: Vec<String> = (0..64).map(|i| format!("target{i}")).collect();
        let document =
            ParsedDocument::new(objects.iter().map(|o| niacin_supports(o)).collect());

        let analysis = session.run(&document);
        let extracted: Vec<&str> = analysis.triples.iter().map(Triple::object).collect();

        assert_eq!(extracted, objects.iter().map(String::as_str).collect::<Vec<_>>());
        for (index, triple) in analysis.triples.iter().enumerate() {
            assert_eq!(triple.source().sentence_index, index);
        }
    }

    #[test]
    fn test_sentence_context_filled() {
        let document = ParsedDocument::new(vec![niacin_supports("digestion")]).with_entities(vec![
            EntityMention::new("Niacin").in_sentence(0),
            EntityMention::new("Zinc").in_sentence(4),
            EntityMention::new("Iron").with_source_sentence("Iron matters."),
        ]);

        let mentions = with_sentence_context(&document);

        assert_eq!(
            mentions[0].source_sentence.as_deref(),
            Some("Niacin supports digestion")
        );
        assert_eq!(mentions[1].source_sentence, None);
        assert_eq!(mentions[2].source_sentence.as_deref(), Some("Iron matters."));
    }
}
