//! Syntactic Label Tables
//!
//! Per-language dependency relation labels classified into extraction roles.
//! Extraction logic never branches on the language itself; it only asks the
//! active table whether a label plays a given role.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use fact_core::{FactError, Result};

/// Relation emitted for a linking verb without a more specific mapping
pub const DEFAULT_COPULA_RELATION: &str = "has_property";

// ============================================================================
// Roles and Languages
// ============================================================================

/// Role a dependency label plays during triple extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    // Required roles
    Subject,
    Object,
    Copula,
    Predicative,
    Negation,

    // Optional roles
    Coordination,        // conjunct attached to the first conjunct
    Conjunction,         // coordinating word ("and", "und")
    Preposition,         // preposition-introducing relation
    PrepositionalObject, // object governed by a preposition
    Modifier,            // compound / determiner / adjectival modifier
    VerbalComplement,    // verb governed by a modal
}

impl Role {
    /// Roles every table must define
    pub const REQUIRED: [Role; 5] = [
        Role::Subject,
        Role::Object,
        Role::Copula,
        Role::Predicative,
        Role::Negation,
    ];

    /// Every role, required ones first
    pub const ALL: [Role; 11] = [
        Role::Subject,
        Role::Object,
        Role::Copula,
        Role::Predicative,
        Role::Negation,
        Role::Coordination,
        Role::Conjunction,
        Role::Preposition,
        Role::PrepositionalObject,
        Role::Modifier,
        Role::VerbalComplement,
    ];

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Object => "object",
            Self::Copula => "copula",
            Self::Predicative => "predicative",
            Self::Negation => "negation",
            Self::Coordination => "coordination",
            Self::Conjunction => "conjunction",
            Self::Preposition => "preposition",
            Self::PrepositionalObject => "prepositional_object",
            Self::Modifier => "modifier",
            Self::VerbalComplement => "verbal_complement",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Languages with a built-in label table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    German,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "english",
            Self::German => "german",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Language {
    type Err = FactError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "en" | "eng" | "english" => Ok(Self::English),
            "de" | "deu" | "ger" | "german" | "deutsch" => Ok(Self::German),
            _ => Err(FactError::UnsupportedLanguage(s.to_string())),
        }
    }
}

// ============================================================================
// Label Table
// ============================================================================

/// Immutable role → label mapping for one language
#[derive(Debug, Clone)]
pub struct LabelTable {
    language: Language,
    roles: HashMap<Role, HashSet<String>>,
    /// Linking verb lemma → canonical copula relation
    linking_verbs: BTreeMap<String, String>,
    /// Modal lemma → predicate prefix
    modal_verbs: BTreeMap<String, String>,
}

impl LabelTable {
    /// Built-in table for a language
    pub fn for_language(language: Language) -> Result<Self> {
        match language {
            Language::English => english_table(),
            Language::German => german_table(),
        }
    }

    /// Start building a custom table
    pub fn builder(language: Language) -> LabelTableBuilder {
        LabelTableBuilder {
            language,
            roles: HashMap::new(),
            linking_verbs: BTreeMap::new(),
            modal_verbs: BTreeMap::new(),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Whether `label` plays `role` (labels compare case-insensitively)
    pub fn has(&self, role: Role, label: &str) -> bool {
        self.roles
            .get(&role)
            .is_some_and(|labels| labels.contains(&label.to_lowercase()))
    }

    /// Labels assigned to a role, sorted
    pub fn labels(&self, role: Role) -> Vec<&str> {
        let mut labels: Vec<&str> = self
            .roles
            .get(&role)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default();
        labels.sort_unstable();
        labels
    }

    /// Canonical relation for a linking verb lemma
    pub fn copula_relation(&self, lemma: &str) -> Option<&str> {
        self.linking_verbs
            .get(&lemma.trim().to_lowercase())
            .map(String::as_str)
    }

    /// Predicate prefix for a modal lemma
    pub fn modal_prefix(&self, lemma: &str) -> Option<&str> {
        self.modal_verbs
            .get(&lemma.trim().to_lowercase())
            .map(String::as_str)
    }

    /// Linking verb lemmas with their relations
    pub fn linking_verbs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.linking_verbs
            .iter()
            .map(|(lemma, relation)| (lemma.as_str(), relation.as_str()))
    }

    /// Modal lemmas with their prefixes
    pub fn modal_verbs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.modal_verbs
            .iter()
            .map(|(lemma, prefix)| (lemma.as_str(), prefix.as_str()))
    }
}

/// Look up the built-in table for a language tag
pub fn get_table(language: &str) -> Result<LabelTable> {
    let language: Language = language.parse()?;
    LabelTable::for_language(language)
}

/// Builder validating that all required roles are present
#[derive(Debug, Clone)]
pub struct LabelTableBuilder {
    language: Language,
    roles: HashMap<Role, HashSet<String>>,
    linking_verbs: BTreeMap<String, String>,
    modal_verbs: BTreeMap<String, String>,
}

impl LabelTableBuilder {
    /// Add labels for a role
    pub fn role(mut self, role: Role, labels: &[&str]) -> Self {
        self.roles
            .entry(role)
            .or_default()
            .extend(labels.iter().map(|l| l.trim().to_lowercase()));
        self
    }

    /// Register a linking verb and the relation it expresses
    pub fn linking_verb(mut self, lemma: &str, relation: &str) -> Self {
        self.linking_verbs
            .insert(lemma.trim().to_lowercase(), relation.to_string());
        self
    }

    /// Register a modal verb and its predicate prefix
    pub fn modal_verb(mut self, lemma: &str, prefix: &str) -> Self {
        self.modal_verbs
            .insert(lemma.trim().to_lowercase(), prefix.to_string());
        self
    }

    /// Validate and freeze the table
    pub fn build(mut self) -> Result<LabelTable> {
        for role in Role::REQUIRED {
            let present = self
                .roles
                .get(&role)
                .is_some_and(|labels| labels.iter().any(|l| !l.is_empty()));
            if !present {
                return Err(FactError::InvalidLabelTable {
                    language: self.language.to_string(),
                    role: role.to_string(),
                });
            }
        }

        for labels in self.roles.values_mut() {
            labels.retain(|l| !l.is_empty());
        }

        Ok(LabelTable {
            language: self.language,
            roles: self.roles,
            linking_verbs: self.linking_verbs,
            modal_verbs: self.modal_verbs,
        })
    }
}

// ============================================================================
// Built-in Tables
// ============================================================================

/// English labels (ClearNLP scheme as produced by spaCy, plus UD aliases)
fn english_table() -> Result<LabelTable> {
    LabelTable::builder(Language::English)
        .role(
            Role::Subject,
            &["nsubj", "nsubjpass", "nsubj:pass", "csubj", "csubjpass"],
        )
        .role(Role::Object, &["dobj", "obj", "iobj", "dative", "oprd"])
        .role(Role::Copula, &["cop"])
        .role(Role::Predicative, &["attr", "acomp"])
        .role(Role::Negation, &["neg"])
        .role(Role::Coordination, &["conj"])
        .role(Role::Conjunction, &["cc"])
        .role(Role::Preposition, &["prep", "agent"])
        .role(Role::PrepositionalObject, &["pobj"])
        .role(
            Role::Modifier,
            &["compound", "amod", "det", "nummod", "poss", "flat"],
        )
        .linking_verb("be", DEFAULT_COPULA_RELATION)
        .linking_verb("become", "becomes")
        .linking_verb("remain", "remains")
        .linking_verb("seem", "appears_to_be")
        .linking_verb("appear", "appears_as")
        .modal_verb("can", "can")
        .modal_verb("should", "should")
        .modal_verb("must", "must")
        .modal_verb("may", "may")
        .build()
}

/// German labels (TIGER scheme as produced by spaCy)
fn german_table() -> Result<LabelTable> {
    LabelTable::builder(Language::German)
        .role(Role::Subject, &["sb"])
        .role(Role::Object, &["oa", "od", "og", "da"])
        .role(Role::Copula, &["cop"])
        .role(Role::Predicative, &["pd"])
        .role(Role::Negation, &["ng"])
        .role(Role::Coordination, &["cj"])
        .role(Role::Conjunction, &["cd"])
        .role(Role::Preposition, &["mo", "op", "mnr"])
        .role(Role::PrepositionalObject, &["nk"])
        .role(Role::Modifier, &["nk", "pnc", "adc"])
        .role(Role::VerbalComplement, &["oc"])
        .linking_verb("sein", DEFAULT_COPULA_RELATION)
        .linking_verb("werden", "becomes")
        .linking_verb("bleiben", "remains")
        .linking_verb("scheinen", "appears_to_be")
        .linking_verb("wirken", "appears_as")
        .modal_verb("können", "can")
        .modal_verb("sollen", "should")
        .modal_verb("müssen", "must")
        .modal_verb("dürfen", "may")
        .modal_verb("wollen", "wants_to")
        .modal_verb("mögen", "likes_to")
        .build()
}

// ============================================================================
// Tests
// ============================================================================
