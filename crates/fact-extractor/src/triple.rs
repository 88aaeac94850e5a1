//! Dependency-tree Triple Extraction
//!
//! Walks one parsed sentence from its root, collecting subject and object
//! phrases through the active label table. Subjects and objects are
//! canonicalized through the equivalence mapper before emission.

use std::collections::BTreeSet;

use fact_core::{SentenceRef, SentenceSpan, Token, Triple, NEGATION_PREFIX};

use crate::equivalence::EntityEquivalenceMapper;
use crate::labels::{LabelTable, Role, DEFAULT_COPULA_RELATION};
use crate::TripleExtractor;

/// Part-of-speech tags that may head a coordinated clause
const VERBAL_POS: &[&str] = &["VERB", "AUX"];

/// Prepositional children that never form an object on their own
const NON_NOMINAL_POS: &[&str] = &["DET", "PUNCT", "ADJ", "ADV", "PART"];

/// Subject terms marking a nutrient-domain fact
const DOMAIN_SUBJECT_TERMS: &[&str] = &["vitamin", "mineral", "nährstoff", "nutrient"];

/// Object terms marking a physiological effect
const DOMAIN_OBJECT_TERMS: &[&str] =
    &["stoffwechsel", "metabolism", "system", "funktion", "function"];

// ============================================================================
// Extractor
// ============================================================================

/// Rule-based extractor over dependency parses
#[derive(Debug, Clone, Copy)]
pub struct DependencyExtractor<'a> {
    table: &'a LabelTable,
    mapper: &'a EntityEquivalenceMapper,
    follow_coordinated_predicates: bool,
}

impl<'a> DependencyExtractor<'a> {
    pub fn new(table: &'a LabelTable, mapper: &'a EntityEquivalenceMapper) -> Self {
        Self {
            table,
            mapper,
            follow_coordinated_predicates: true,
        }
    }

    /// Whether verbs coordinated with the root yield their own triples
    pub fn with_coordinated_predicates(mut self, follow: bool) -> Self {
        self.follow_coordinated_predicates = follow;
        self
    }

    fn has(&self, sentence: &SentenceSpan, index: usize, role: Role) -> bool {
        sentence
            .token(index)
            .is_some_and(|token| self.table.has(role, &token.dep))
    }

    /// First direct child of `head` playing `role`
    fn find_child(&self, sentence: &SentenceSpan, head: usize, role: Role) -> Option<usize> {
        sentence
            .children(head)
            .iter()
            .copied()
            .find(|&child| self.has(sentence, child, role))
    }

    fn has_negation(&self, sentence: &SentenceSpan, head: usize) -> bool {
        self.find_child(sentence, head, Role::Negation).is_some()
    }

    // ------------------------------------------------------------------------
    // Phrases
    // ------------------------------------------------------------------------

    /// Head token plus its contiguous modifier descendants
    fn phrase(&self, sentence: &SentenceSpan, head: usize) -> String {
        let mut included = BTreeSet::from([head]);
        let mut stack = vec![head];

        while let Some(index) = stack.pop() {
            for &child in sentence.children(index) {
                if self.has(sentence, child, Role::Modifier) && included.insert(child) {
                    stack.push(child);
                }
            }
        }

        let mut start = head;
        while start > 0 && included.contains(&(start - 1)) {
            start -= 1;
        }
        let mut end = head;
        while included.contains(&(end + 1)) {
            end += 1;
        }

        sentence.phrase(start..=end)
    }

    /// Conjuncts of `head`, attached directly or through a conjunction word
    fn conjuncts(&self, sentence: &SentenceSpan, head: usize) -> Vec<usize> {
        let mut found = BTreeSet::new();
        let mut stack = vec![head];

        while let Some(index) = stack.pop() {
            for &child in sentence.children(index) {
                if self.has(sentence, child, Role::Coordination) {
                    if found.insert(child) {
                        stack.push(child);
                    }
                } else if self.has(sentence, child, Role::Conjunction) {
                    for &nested in sentence.children(child) {
                        if self.has(sentence, nested, Role::Coordination) && found.insert(nested) {
                            stack.push(nested);
                        }
                    }
                }
            }
        }

        found.remove(&head);
        found.into_iter().collect()
    }

    // ------------------------------------------------------------------------
    // Clause analysis
    // ------------------------------------------------------------------------

    /// Relation expressed by a linking construction headed at `head`
    fn copula_relation(&self, sentence: &SentenceSpan, head: usize) -> Option<String> {
        let token = sentence.token(head)?;
        let linking = self.table.copula_relation(&token.lemma);

        if self.table.has(Role::Copula, &token.dep) {
            return Some(linking.unwrap_or(DEFAULT_COPULA_RELATION).to_string());
        }
        if let Some(relation) = linking {
            if token.pos.is_empty() || VERBAL_POS.contains(&token.pos.as_str()) {
                return Some(relation.to_string());
            }
        }

        // Predicate nominal governing its own copula ("cop" child)
        self.find_child(sentence, head, Role::Copula).map(|cop| {
            sentence
                .token(cop)
                .and_then(|token| self.table.copula_relation(&token.lemma))
                .unwrap_or(DEFAULT_COPULA_RELATION)
                .to_string()
        })
    }

    /// Lexical head of the clause plus a modal prefix, if any
    fn modal_chain(&self, sentence: &SentenceSpan, head: usize) -> (usize, Option<String>) {
        let Some(token) = sentence.token(head) else {
            return (head, None);
        };

        // Modal governing a verbal complement ("kann ... führen")
        if let Some(prefix) = self.table.modal_prefix(&token.lemma) {
            if let Some(complement) = self.find_child(sentence, head, Role::VerbalComplement) {
                return (complement, Some(prefix.to_string()));
            }
        }

        // Modal auxiliary attached to the main verb ("can lead")
        let prefix = sentence
            .children(head)
            .iter()
            .filter_map(|&child| sentence.token(child))
            .filter(|child| child.pos == "AUX" || child.dep.starts_with("aux"))
            .find_map(|child| self.table.modal_prefix(&child.lemma));

        (head, prefix.map(str::to_string))
    }

    /// Object heads of a clause, prepositional objects included
    fn objects(&self, sentence: &SentenceSpan, head: usize) -> Vec<usize> {
        let mut objects = Vec::new();

        for &child in sentence.children(head) {
            let Some(token) = sentence.token(child) else {
                continue;
            };
            if self.table.has(Role::Object, &token.dep) {
                objects.push(child);
            } else if self.table.has(Role::Preposition, &token.dep) || token.pos == "ADP" {
                objects.extend(sentence.children(child).iter().copied().filter(|&nested| {
                    sentence.token(nested).is_some_and(|t| {
                        self.table.has(Role::PrepositionalObject, &t.dep)
                            && !NON_NOMINAL_POS.contains(&t.pos.as_str())
                    })
                }));
            }
        }

        objects
    }

    /// Triples of one clause headed at `head` for an already resolved subject
    fn clause_triples(
        &self,
        sentence: &SentenceSpan,
        head: usize,
        subject: &str,
        source: SentenceRef,
    ) -> Vec<Triple> {
        let (clause, modal) = self.modal_chain(sentence, head);
        let copula = self.copula_relation(sentence, clause);

        let mut objects = self.objects(sentence, clause);
        if objects.is_empty() && copula.is_some() {
            objects = sentence
                .children(clause)
                .iter()
                .copied()
                .filter(|&child| self.has(sentence, child, Role::Predicative))
                .collect();
            if objects.is_empty() && self.find_child(sentence, clause, Role::Copula).is_some() {
                objects.push(clause);
            }
        }
        if objects.is_empty() {
            return Vec::new();
        }

        let conjuncts: Vec<usize> = objects
            .iter()
            .flat_map(|&object| self.conjuncts(sentence, object))
            .collect();
        objects.extend(conjuncts);
        objects.sort_unstable();
        objects.dedup();

        let Some(base) = copula.or_else(|| sentence.token(clause).and_then(predicate_lemma)) else {
            return Vec::new();
        };
        let predicate = match modal {
            Some(prefix) => format!("{prefix}_{base}"),
            None => base,
        };

        let from_root = sentence.root() == Some(head);
        let clause_negated = self.has_negation(sentence, head)
            || (clause != head && self.has_negation(sentence, clause));

        let mut triples = Vec::new();
        for object in objects {
            let canonical = self.mapper.resolve(&self.phrase(sentence, object));
            if canonical.is_empty() {
                continue;
            }
            if canonical == subject {
                tracing::debug!(subject, object = %canonical, "Dropping self-referential object");
                continue;
            }

            let negated = clause_negated || (object != clause && self.has_negation(sentence, object));
            let predicate = if negated {
                format!("{NEGATION_PREFIX}{predicate}")
            } else {
                predicate.clone()
            };

            let confidence = triple_confidence(subject, &canonical, from_root);
            triples.push(
                Triple::new(subject, predicate, canonical, source).with_confidence(confidence),
            );
        }

        triples
    }

    /// Verbs coordinated with the root clause
    fn coordinated_predicates(&self, sentence: &SentenceSpan, root: usize) -> Vec<usize> {
        self.conjuncts(sentence, root)
            .into_iter()
            .filter(|&index| {
                sentence
                    .token(index)
                    .is_some_and(|token| VERBAL_POS.contains(&token.pos.as_str()))
            })
            .collect()
    }
}

impl TripleExtractor for DependencyExtractor<'_> {
    fn extract(&self, sentence: &SentenceSpan, source: SentenceRef) -> Vec<Triple> {
        let Some(root) = sentence.root() else {
            tracing::debug!(sentence = source.sentence_index, "No root token, skipping");
            return Vec::new();
        };
        let Some(subject_head) = self.find_child(sentence, root, Role::Subject) else {
            tracing::debug!(sentence = source.sentence_index, "No subject, skipping");
            return Vec::new();
        };

        let subject = self.mapper.resolve(&self.phrase(sentence, subject_head));
        if subject.is_empty() {
            return Vec::new();
        }

        let mut triples = self.clause_triples(sentence, root, &subject, source);

        if self.follow_coordinated_predicates {
            for verb in self.coordinated_predicates(sentence, root) {
                let own_subject = self
                    .find_child(sentence, verb, Role::Subject)
                    .map(|head| self.mapper.resolve(&self.phrase(sentence, head)))
                    .filter(|name| !name.is_empty());
                let clause_subject = own_subject.as_deref().unwrap_or(&subject);
                triples.extend(self.clause_triples(sentence, verb, clause_subject, source));
            }
        }

        triples
    }
}

/// Extract the triples of one sentence with default settings
pub fn extract(
    sentence: &SentenceSpan,
    table: &LabelTable,
    mapper: &EntityEquivalenceMapper,
    source: SentenceRef,
) -> Vec<Triple> {
    DependencyExtractor::new(table, mapper).extract(sentence, source)
}

/// Heuristic score of one triple
///
/// Starts at 0.5, gains for nutrient subjects, effect objects and predicates
/// taken from the root, loses for phrases shorter than three characters.
fn triple_confidence(subject: &str, object: &str, from_root: bool) -> f32 {
    let subject_lower = subject.to_lowercase();
    let object_lower = object.to_lowercase();
    let mut confidence = 0.5;

    if DOMAIN_SUBJECT_TERMS.iter().any(|term| subject_lower.contains(term)) {
        confidence += 0.2;
    }
    if DOMAIN_OBJECT_TERMS.iter().any(|term| object_lower.contains(term)) {
        confidence += 0.2;
    }
    if from_root {
        confidence += 0.1;
    }
    if subject.chars().count() < 3 || object.chars().count() < 3 {
        confidence -= 0.2;
    }

    f32::clamp(confidence, 0.0, 1.0)
}

fn predicate_lemma(token: &Token) -> Option<String> {
    let lemma = token.lemma.trim();
    let base = if lemma.is_empty() {
        token.text.trim()
    } else {
        lemma
    };
    (!base.is_empty()).then(|| base.to_lowercase())
}

// ============================================================================
// Tests
// ============================================================================
