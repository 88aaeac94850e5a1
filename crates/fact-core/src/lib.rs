//! Fact Core - Domain models, errors and configuration
//!
//! This crate defines the core abstractions shared by the extraction pipeline:
//! - Parse tree models (tokens, sentence spans) produced by an external parser
//! - Entity mentions used for alias discovery
//! - Canonical fact triples with sentence provenance
//! - Common error types
//! - Configuration management

pub mod config;

pub use config::{AppConfig, ConfigError, EquivalenceConfig, ExtractionConfig, LoggingConfig};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for fact extraction
///
/// Only construction-time problems are errors. Sentences that cannot be
/// analyzed produce empty results instead.
#[derive(Error, Debug)]
pub enum FactError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Invalid label table for {language}: role '{role}' is missing")]
    InvalidLabelTable { language: String, role: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for FactError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FactError>;

// ============================================================================
// Parse Tree Models
// ============================================================================

/// Dependency label of the token governing a sentence's main clause
pub const ROOT_LABEL: &str = "root";

/// A single node of an externally parsed dependency tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Surface text
    pub text: String,

    /// Lemma (base form)
    #[serde(default)]
    pub lemma: String,

    /// Coarse part-of-speech tag (VERB, AUX, NOUN, ...)
    #[serde(default)]
    pub pos: String,

    /// Dependency relation to the head token
    pub dep: String,

    /// Index of the head token within the sentence, `None` for the root
    #[serde(default)]
    pub head: Option<usize>,
}

impl Token {
    /// Create a new token
    pub fn new(
        text: impl Into<String>,
        lemma: impl Into<String>,
        pos: impl Into<String>,
        dep: impl Into<String>,
        head: Option<usize>,
    ) -> Self {
        Self {
            text: text.into(),
            lemma: lemma.into(),
            pos: pos.into(),
            dep: dep.into(),
            head,
        }
    }

    /// Whether the dependency label marks this token as the clause root
    pub fn is_root_label(&self) -> bool {
        self.dep.eq_ignore_ascii_case(ROOT_LABEL)
    }
}

/// One parsed sentence: an ordered token sequence forming a dependency tree
///
/// The child index is derived once at construction; the tokens themselves are
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SentenceWire", into = "SentenceWire")]
pub struct SentenceSpan {
    tokens: Vec<Token>,
    children: Vec<Vec<usize>>,
    root: Option<usize>,
}

#[derive(Serialize, Deserialize)]
struct SentenceWire {
    tokens: Vec<Token>,
}

impl From<SentenceWire> for SentenceSpan {
    fn from(wire: SentenceWire) -> Self {
        Self::new(wire.tokens)
    }
}

impl From<SentenceSpan> for SentenceWire {
    fn from(sentence: SentenceSpan) -> Self {
        Self {
            tokens: sentence.tokens,
        }
    }
}

impl SentenceSpan {
    /// Build a sentence from parser output
    ///
    /// Heads pointing at the token itself (spaCy's root convention) or outside
    /// the sentence are treated as absent.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        let len = tokens.len();
        for (index, token) in tokens.iter_mut().enumerate() {
            if matches!(token.head, Some(head) if head == index || head >= len) {
                token.head = None;
            }
        }

        let mut children = vec![Vec::new(); len];
        for (index, token) in tokens.iter().enumerate() {
            if let Some(head) = token.head {
                children[head].push(index);
            }
        }

        let root = tokens.iter().position(Token::is_root_label);

        Self {
            tokens,
            children,
            root,
        }
    }

    /// All tokens in sentence order
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Token at `index`
    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Index of the root token, if the parse has one
    pub fn root(&self) -> Option<usize> {
        self.root
    }

    /// Direct children of the token at `index`, in sentence order
    pub fn children(&self, index: usize) -> &[usize] {
        self.children.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Join the given tokens, in sentence order, into a phrase
    pub fn phrase(&self, indices: impl IntoIterator<Item = usize>) -> String {
        let mut indices: Vec<usize> = indices
            .into_iter()
            .filter(|&i| i < self.tokens.len())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        render(indices.iter().map(|&i| self.tokens[i].text.as_str()))
    }

    /// Reconstructed surface text of the whole sentence
    pub fn text(&self) -> String {
        render(self.tokens.iter().map(|t| t.text.as_str()))
    }
}

/// Render tokens with conventional spacing around punctuation
fn render<'a>(words: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::new();
    let mut glue_next = true;

    for word in words {
        let word = word.trim();
        if word.is_empty() {
            continue;
        }
        let closing = matches!(word, "," | "." | ")" | ";" | ":" | "!" | "?");
        if !glue_next && !closing {
            out.push(' ');
        }
        out.push_str(word);
        glue_next = word == "(";
    }

    out
}

// ============================================================================
// Entity Mentions
// ============================================================================

/// An entity mention found in a document before triple extraction
///
/// All provenance fields are declared here; nothing is attached later.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMention {
    /// Surface text of the mention
    #[serde(default)]
    pub text: String,

    /// Entity label from the upstream recognizer (NUTRIENT, ORG, ...)
    #[serde(default)]
    pub label: Option<String>,

    /// Lemma of the mention, when the recognizer provides one
    #[serde(default)]
    pub lemma: Option<String>,

    /// Index of the sentence the mention occurs in
    #[serde(default)]
    pub sentence_index: Option<usize>,

    /// Text of the sentence the mention occurs in
    #[serde(default)]
    pub source_sentence: Option<String>,
}

impl EntityMention {
    /// Create a new mention
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Set entity label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set lemma
    pub fn with_lemma(mut self, lemma: impl Into<String>) -> Self {
        self.lemma = Some(lemma.into());
        self
    }

    /// Attach to a sentence of the document
    pub fn in_sentence(mut self, index: usize) -> Self {
        self.sentence_index = Some(index);
        self
    }

    /// Set the source sentence text
    pub fn with_source_sentence(mut self, sentence: impl Into<String>) -> Self {
        self.source_sentence = Some(sentence.into());
        self
    }

    /// A mention without usable text cannot take part in discovery
    pub fn is_malformed(&self) -> bool {
        self.text.trim().is_empty()
    }
}

// ============================================================================
// Triples
// ============================================================================

/// Prefix marking a negated predicate (`not_cause`)
pub const NEGATION_PREFIX: &str = "not_";

/// Reference to the sentence a triple was extracted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SentenceRef {
    /// Document ID
    pub document_id: Uuid,

    /// Sentence position within the document
    pub sentence_index: usize,
}

impl SentenceRef {
    pub fn new(document_id: Uuid, sentence_index: usize) -> Self {
        Self {
            document_id,
            sentence_index,
        }
    }
}

/// A canonical (Subject, Predicate, Object) fact
///
/// Fields are read-only once the triple exists. Only derived short strings
/// are kept, never the source sentence text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triple {
    subject: String,
    predicate: String,
    object: String,
    source: SentenceRef,

    /// Extraction confidence (0.0 - 1.0)
    #[serde(default = "full_confidence")]
    confidence: f32,
}

fn full_confidence() -> f32 {
    1.0
}

impl Triple {
    /// Create a new triple
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
        source: SentenceRef,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            source,
            confidence: 1.0,
        }
    }

    /// Set confidence score, clamped to 0.0 - 1.0
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn source(&self) -> SentenceRef {
        self.source
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Whether the predicate carries the negation marker
    pub fn is_negated(&self) -> bool {
        self.predicate.starts_with(NEGATION_PREFIX)
    }

    /// Case-insensitive identity used for deduplication and evaluation
    pub fn key(&self) -> (String, String, String) {
        (
            self.subject.to_lowercase(),
            self.predicate.to_lowercase(),
            self.object.to_lowercase(),
        )
    }
}

impl std::fmt::Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.predicate, self.object)
    }
}

// ============================================================================
// Equivalence Groups
// ============================================================================

/// A curated set of surface forms denoting one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalenceGroup {
    /// Canonical name every alias resolves to
    pub primary: String,

    /// Alternative surface forms
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl EquivalenceGroup {
    pub fn new(primary: impl Into<String>, aliases: &[&str]) -> Self {
        Self {
            primary: primary.into(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ============================================================================
// Document Models
// ============================================================================

/// A parsed document: sentences plus pre-extracted entity mentions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// Unique identifier
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Document title
    #[serde(default)]
    pub title: Option<String>,

    /// Parsed sentences in document order
    #[serde(default)]
    pub sentences: Vec<SentenceSpan>,

    /// Entity mentions from the pre-extraction phase
    #[serde(default)]
    pub entities: Vec<EntityMention>,
}

impl ParsedDocument {
    /// Create a new document from parsed sentences
    pub fn new(sentences: Vec<SentenceSpan>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: None,
            sentences,
            entities: Vec::new(),
        }
    }

    /// Set entity mentions
    pub fn with_entities(mut self, entities: Vec<EntityMention>) -> Self {
        self.entities = entities;
        self
    }

    /// Set title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Parse a document from its JSON representation
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| FactError::ParseError(e.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn niacin_sentence() -> SentenceSpan {
        SentenceSpan::new(vec![
            Token::new("Niacin", "niacin", "PROPN", "nsubj", Some(1)),
            Token::new("supports", "support", "VERB", "ROOT", None),
            Token::new("nerve", "nerve", "NOUN", "compound", Some(3)),
            Token::new("function", "function", "NOUN", "dobj", Some(1)),
            Token::new(".", ".", "PUNCT", "punct", Some(1)),
        ])
    }

    #[test]
    fn test_sentence_children_and_root() {
        let sentence = niacin_sentence();

        assert_eq!(sentence.root(), Some(1));
        assert_eq!(sentence.children(1), &[0, 3, 4]);
        assert_eq!(sentence.children(3), &[2]);
        assert!(sentence.children(0).is_empty());
        assert!(sentence.children(42).is_empty());
    }

    #[test]
    fn test_self_head_is_treated_as_absent() {
        let sentence = SentenceSpan::new(vec![
            Token::new("Rain", "rain", "NOUN", "nsubj", Some(1)),
            Token::new("falls", "fall", "VERB", "ROOT", Some(1)),
            Token::new("x", "x", "X", "dep", Some(9)),
        ]);

        assert_eq!(sentence.tokens()[1].head, None);
        assert_eq!(sentence.tokens()[2].head, None);
        assert_eq!(sentence.children(1), &[0]);
    }

    #[test]
    fn test_sentence_without_root_label() {
        let sentence = SentenceSpan::new(vec![
            Token::new("Vitamin", "vitamin", "NOUN", "compound", Some(1)),
            Token::new("B3", "B3", "PROPN", "nk", None),
        ]);

        assert_eq!(sentence.root(), None);
    }

    #[test]
    fn test_sentence_text_rendering() {
        let sentence = SentenceSpan::new(vec![
            Token::new("Vitamin", "vitamin", "NOUN", "compound", Some(1)),
            Token::new("B3", "B3", "PROPN", "nsubj", Some(5)),
            Token::new("(", "(", "PUNCT", "punct", Some(1)),
            Token::new("Niacin", "niacin", "PROPN", "appos", Some(1)),
            Token::new(")", ")", "PUNCT", "punct", Some(1)),
            Token::new("is", "be", "AUX", "ROOT", None),
            Token::new("essential", "essential", "ADJ", "acomp", Some(5)),
            Token::new(".", ".", "PUNCT", "punct", Some(5)),
        ]);

        assert_eq!(sentence.text(), "Vitamin B3 (Niacin) is essential.");
        assert_eq!(sentence.phrase([1, 0]), "Vitamin B3");
    }

    #[test]
    fn test_sentence_json_roundtrip_rebuilds_children() {
        let sentence = niacin_sentence();
        let json = serde_json::to_string(&sentence).unwrap();
        let parsed: SentenceSpan = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, sentence);
        assert_eq!(parsed.children(3), &[2]);
    }

    #[test]
    fn test_document_from_json() {
        let json = r#"{
            "title": "Nutrients",
            "sentences": [
                {"tokens": [
                    {"text": "Niacin", "lemma": "niacin", "pos": "PROPN", "dep": "nsubj", "head": 1},
                    {"text": "helps", "lemma": "help", "pos": "VERB", "dep": "ROOT"}
                ]}
            ],
            "entities": [{"text": "Niacin", "sentence_index": 0}, {"label": "NUTRIENT"}]
        }"#;

        let doc = ParsedDocument::from_json(json).unwrap();
        assert_eq!(doc.title.as_deref(), Some("Nutrients"));
        assert_eq!(doc.sentences[0].root(), Some(1));
        assert_eq!(doc.entities.len(), 2);
        assert!(doc.entities[1].is_malformed());
    }

    #[test]
    fn test_document_from_invalid_json() {
        let err = ParsedDocument::from_json("{ not json").unwrap_err();
        assert!(matches!(err, FactError::ParseError(_)));
    }

    #[test]
    fn test_triple_negation_and_key() {
        let source = SentenceRef::new(Uuid::new_v4(), 0);
        let triple = Triple::new("Vitamin_B3", "not_cause", "Fatigue", source);

        assert!(triple.is_negated());
        assert_eq!(
            triple.key(),
            (
                "vitamin_b3".to_string(),
                "not_cause".to_string(),
                "fatigue".to_string()
            )
        );
        assert_eq!(triple.to_string(), "(Vitamin_B3, not_cause, Fatigue)");
    }

    #[test]
    fn test_triple_confidence() {
        let source = SentenceRef::new(Uuid::nil(), 0);
        let triple = Triple::new("Iron", "support", "blood formation", source);
        assert_eq!(triple.confidence(), 1.0);
        assert_eq!(triple.clone().with_confidence(0.6).confidence(), 0.6);
        assert_eq!(triple.clone().with_confidence(1.7).confidence(), 1.0);
        assert_eq!(triple.with_confidence(-0.1).confidence(), 0.0);

        // Serialized triples without a score load at full confidence
        let json = r#"{"subject":"Iron","predicate":"support","object":"blood",
            "source":{"document_id":"00000000-0000-0000-0000-000000000000","sentence_index":0}}"#;
        let parsed: Triple = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.confidence(), 1.0);
    }

    #[test]
    fn test_entity_mention_builder() {
        let mention = EntityMention::new("Niacin")
            .with_label("NUTRIENT")
            .in_sentence(3);

        assert_eq!(mention.label.as_deref(), Some("NUTRIENT"));
        assert_eq!(mention.sentence_index, Some(3));
        assert!(!mention.is_malformed());
        assert!(EntityMention::new("   ").is_malformed());
    }
}
