//! Entity Equivalence Mapper
//!
//! Resolves surface-form entity mentions to canonical names using two layers:
//! a static table of curated groups fixed at construction, and a dynamic
//! table of aliases discovered per document. Static entries always win.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use fact_core::{EntityMention, EquivalenceConfig, EquivalenceGroup};

/// Longest alias (in words) accepted from a contextual pattern
const MAX_ALIAS_WORDS: usize = 5;

/// Shortest signal for which a prefix match counts as similar
const MIN_PREFIX_SIGNAL: usize = 4;

/// "Vitamin B3 (Niacin)" as a whole mention
static APPOSITION: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^\s*([^()]+?)\s*\(\s*([^()]+?)\s*\)\s*$").ok());

/// Words that end a definitional alias ("vitamin H by many people" -> "vitamin H")
const ALIAS_STOP_WORDS: &[&str] = &[
    // English
    "a", "an", "the", "by", "in", "on", "at", "for", "from", "with", "of", "to", "which", "that",
    "who", "is", "are", "was", "were", "and", "or", "because",
    // German
    "von", "bei", "im", "mit", "für", "durch", "aus", "zu", "und", "oder", "der", "die", "das",
    "welche", "welcher", "ist", "sind", "wird", "werden", "weil",
];

/// "X, also known as Y" and friends
static DEFINITIONAL: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)([^,;()]+?)\s*,\s*(?:also known as|auch bekannt als|called|genannt)\s+([^,;.()]+)",
        r"(?i)([^,;()]+?)\s*,\s*auch\s+([^,;.()]+?)\s+genannt",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

// ============================================================================
// Built-in Groups
// ============================================================================

/// Curated nutrient groups seeding the static layer
pub fn builtin_groups() -> Vec<EquivalenceGroup> {
    vec![
        // B vitamins
        EquivalenceGroup::new(
            "Vitamin_B3",
            &[
                "Niacin",
                "Nicotinamid",
                "Nikotinamid",
                "Nicotinic acid",
                "Vitamin B-3",
                "B3-Vitamin",
                "B3",
                "Vitamin B 3",
                "Pyridine-3-carboxylic acid",
            ],
        ),
        EquivalenceGroup::new(
            "Vitamin_B1",
            &["Thiamin", "Thiamine", "Vitamin B-1", "B1-Vitamin", "B1"],
        ),
        EquivalenceGroup::new(
            "Vitamin_B2",
            &["Riboflavin", "Vitamin B-2", "B2-Vitamin", "B2"],
        ),
        EquivalenceGroup::new(
            "Vitamin_B6",
            &["Pyridoxin", "Pyridoxine", "Vitamin B-6", "B6-Vitamin", "B6"],
        ),
        EquivalenceGroup::new(
            "Vitamin_B12",
            &[
                "Cobalamin",
                "Cyanocobalamin",
                "Vitamin B-12",
                "B12-Vitamin",
                "B12",
            ],
        ),
        // Other vitamins
        EquivalenceGroup::new(
            "Vitamin_D",
            &["Cholecalciferol", "Ergocalciferol", "Vitamin D3", "Vitamin D2"],
        ),
        // Minerals
        EquivalenceGroup::new("Magnesium", &["Mg"]),
        EquivalenceGroup::new("Calcium", &["Ca", "Kalzium"]),
    ]
}

// ============================================================================
// Reports
// ============================================================================

/// Snapshot of the equivalence state for observability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalenceReport {
    /// Number of curated groups in the static layer
    pub predefined_count: usize,

    /// Number of case-insensitive surface forms in the static layer
    pub predefined_mappings: usize,

    /// Canonical names of the curated groups
    pub predefined_primary_names: Vec<String>,

    /// Number of discovered aliases
    pub dynamic_count: usize,

    /// Discovered alias → canonical name
    pub dynamic_entries: BTreeMap<String, String>,
}

/// Counters from one discovery pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryStats {
    /// Mentions examined
    pub processed: usize,

    /// Mentions skipped for missing text
    pub skipped_malformed: usize,

    /// Aliases inserted into the dynamic layer
    pub aliases_added: usize,

    /// Aliases rejected because an earlier entry points elsewhere
    pub conflicts: usize,

    /// Aliases rejected because the static layer already knows the form
    pub shadowed_by_static: usize,
}

// ============================================================================
// Mapper
// ============================================================================

#[derive(Debug, Clone)]
struct DynamicEntry {
    /// Surface form as first discovered
    surface: String,
    canonical: String,
}

/// Two-layer resolver from surface forms to canonical entity names
#[derive(Debug, Clone)]
pub struct EntityEquivalenceMapper {
    groups: Vec<EquivalenceGroup>,
    static_exact: HashMap<String, String>,
    static_folded: HashMap<String, String>,
    /// Folded alias → entry
    dynamic: HashMap<String, DynamicEntry>,
    /// Folded canonical → canonical, for names only the dynamic layer knows
    dynamic_canonicals: HashMap<String, String>,
}

impl EntityEquivalenceMapper {
    /// Mapper seeded with the built-in nutrient groups
    pub fn new() -> Self {
        Self::with_groups(builtin_groups())
    }

    /// Mapper with an empty static layer
    pub fn empty() -> Self {
        Self {
            groups: Vec::new(),
            static_exact: HashMap::new(),
            static_folded: HashMap::new(),
            dynamic: HashMap::new(),
            dynamic_canonicals: HashMap::new(),
        }
    }

    /// Mapper whose static layer holds exactly `groups`
    pub fn with_groups(groups: Vec<EquivalenceGroup>) -> Self {
        let mut mapper = Self::empty();

        // Primaries first so each resolves to itself even when listed
        // as another group's alias.
        for group in &groups {
            mapper.add_static(&group.primary, &group.primary);
        }
        for group in &groups {
            for alias in &group.aliases {
                mapper.add_static(alias, &group.primary);
            }
        }

        mapper.groups = groups;
        mapper
    }

    /// Mapper configured from application settings
    pub fn from_config(config: &EquivalenceConfig) -> Self {
        let mut groups = if config.include_builtin {
            builtin_groups()
        } else {
            Vec::new()
        };
        groups.extend(config.groups.iter().cloned());
        Self::with_groups(groups)
    }

    fn add_static(&mut self, surface: &str, primary: &str) {
        let surface = surface.trim();
        if surface.is_empty() {
            return;
        }
        self.static_exact
            .entry(surface.to_string())
            .or_insert_with(|| primary.to_string());
        self.static_folded
            .entry(fold(surface))
            .or_insert_with(|| primary.to_string());
    }

    // ------------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------------

    /// Resolve a surface form to its canonical name
    ///
    /// Unknown forms are their own canonical name (trimmed). Never fails.
    pub fn resolve(&self, surface_form: &str) -> String {
        let trimmed = surface_form.trim();
        if trimmed.is_empty() {
            return String::new();
        }

        self.static_lookup(trimmed)
            .or_else(|| self.dynamic_lookup(trimmed))
            .unwrap_or(trimmed)
            .to_string()
    }

    /// Whether either layer knows the form
    pub fn is_known(&self, surface_form: &str) -> bool {
        let trimmed = surface_form.trim();
        self.static_lookup(trimmed).is_some() || self.dynamic_lookup(trimmed).is_some()
    }

    fn static_lookup(&self, trimmed: &str) -> Option<&str> {
        self.static_exact
            .get(trimmed)
            .or_else(|| self.static_folded.get(&fold(trimmed)))
            .map(String::as_str)
    }

    // Aliases are keyed case-insensitively and first-seen wins, so the exact
    // and folded dynamic lookups always agree.
    fn dynamic_lookup(&self, trimmed: &str) -> Option<&str> {
        let key = fold(trimmed);
        self.dynamic
            .get(&key)
            .map(|entry| entry.canonical.as_str())
            .or_else(|| self.dynamic_canonicals.get(&key).map(String::as_str))
    }

    // ------------------------------------------------------------------------
    // Discovery
    // ------------------------------------------------------------------------

    /// Populate the dynamic layer from a document's entity mentions
    ///
    /// Runs to completion before returning; the `&mut` receiver keeps
    /// concurrent readers out while the layer changes.
    pub fn discover_equivalences(&mut self, entities: &[EntityMention]) -> DiscoveryStats {
        let mut stats = DiscoveryStats::default();
        if entities.is_empty() {
            return stats;
        }

        let mut mentions = Vec::with_capacity(entities.len());
        for entity in entities {
            if entity.is_malformed() {
                stats.skipped_malformed += 1;
                tracing::warn!(
                    label = ?entity.label,
                    sentence = ?entity.sentence_index,
                    "Skipping entity mention without text"
                );
                continue;
            }
            mentions.push(entity);
        }
        stats.processed = mentions.len();

        // Co-occurrence only pairs forms that were unknown before this pass
        let known_before: Vec<bool> = mentions.iter().map(|m| self.is_known(&m.text)).collect();

        for mention in &mentions {
            self.detect_patterns(mention, &mut stats);
        }
        self.detect_cooccurrence(&mentions, &known_before, &mut stats);

        tracing::debug!(
            processed = stats.processed,
            aliases = stats.aliases_added,
            conflicts = stats.conflicts,
            "Equivalence discovery finished"
        );

        stats
    }

    fn detect_patterns(&mut self, mention: &EntityMention, stats: &mut DiscoveryStats) {
        let text = mention.text.trim();

        if let Some(caps) = APPOSITION.as_ref().and_then(|regex| regex.captures(text)) {
            self.link(&caps[1], &caps[2], stats);
        }

        let Some(sentence) = mention.source_sentence.as_deref() else {
            return;
        };

        // Mention immediately followed by a parenthetical, never inside a longer word
        let pattern = format!(
            r"(?i)(?:^|[^\p{{L}}\p{{N}}]){}\s*\(\s*([^()]+?)\s*\)",
            regex::escape(text)
        );
        if let Ok(regex) = Regex::new(&pattern) {
            for caps in regex.captures_iter(sentence) {
                self.link(text, &caps[1], stats);
            }
        }

        let folded_text = fold(text);
        for regex in DEFINITIONAL.iter() {
            for caps in regex.captures_iter(sentence) {
                let left = caps[1].trim();
                let right = definition_head(&caps[2]);
                let folded_left = fold(left);
                let folded_right = fold(right);

                if folded_left == folded_text || folded_left.ends_with(&format!(" {folded_text}")) {
                    self.link(text, right, stats);
                } else if folded_right == folded_text {
                    self.link(left, text, stats);
                }
            }
        }
    }

    fn detect_cooccurrence(
        &mut self,
        mentions: &[&EntityMention],
        known_before: &[bool],
        stats: &mut DiscoveryStats,
    ) {
        // Sentence context → distinct unknown forms in first-seen order
        let mut contexts: Vec<(String, Vec<(String, String)>)> = Vec::new();

        for (mention, &known) in mentions.iter().zip(known_before) {
            if known {
                continue;
            }
            let context = match (mention.sentence_index, mention.source_sentence.as_deref()) {
                (Some(index), _) => format!("#{index}"),
                (None, Some(sentence)) => sentence.trim().to_string(),
                (None, None) => continue,
            };
            let form = mention.text.trim().to_string();
            let signal = similarity_signal(mention.lemma.as_deref().unwrap_or(&form));

            let slot = match contexts.iter().position(|(key, _)| *key == context) {
                Some(position) => position,
                None => {
                    contexts.push((context, Vec::new()));
                    contexts.len() - 1
                }
            };
            let forms = &mut contexts[slot].1;
            if !forms.iter().any(|(seen, _)| fold(seen) == fold(&form)) {
                forms.push((form, signal));
            }
        }

        for (_, forms) in &contexts {
            for (i, (first, first_signal)) in forms.iter().enumerate() {
                for (second, second_signal) in &forms[i + 1..] {
                    if signals_match(first_signal, second_signal) {
                        self.link(first, second, stats);
                    }
                }
            }
        }
    }

    /// Record that `first` and `second` denote one entity
    ///
    /// The statically known side becomes the primary, otherwise `first`.
    fn link(&mut self, first: &str, second: &str, stats: &mut DiscoveryStats) {
        let (first, second) = (first.trim(), second.trim());
        if !is_alias_shaped(first) || !is_alias_shaped(second) || fold(first) == fold(second) {
            return;
        }

        let first_static = self.static_lookup(first).is_some();
        let second_static = self.static_lookup(second).is_some();

        if second_static && !first_static {
            self.insert_alias(first, second, stats);
        } else {
            self.insert_alias(second, first, stats);
        }
    }

    fn insert_alias(&mut self, alias: &str, primary: &str, stats: &mut DiscoveryStats) {
        let key = fold(alias);

        if self.static_lookup(alias).is_some() {
            stats.shadowed_by_static += 1;
            tracing::debug!(alias, primary, "Alias already curated, keeping static entry");
            return;
        }

        let canonical = self.resolve(primary);
        if fold(&canonical) == key {
            return;
        }

        if let Some(existing) = self.dynamic.get(&key) {
            if fold(&existing.canonical) != fold(&canonical) {
                stats.conflicts += 1;
                tracing::debug!(
                    alias,
                    kept = %existing.canonical,
                    rejected = %canonical,
                    "Conflicting alias, first-seen entry kept"
                );
            }
            return;
        }

        // A former canonical name becoming an alias drags its aliases along
        if self.dynamic_canonicals.remove(&key).is_some() {
            for entry in self.dynamic.values_mut() {
                if fold(&entry.canonical) == key {
                    entry.canonical = canonical.clone();
                }
            }
        }

        if self.static_lookup(&canonical).is_none() {
            self.dynamic_canonicals
                .entry(fold(&canonical))
                .or_insert_with(|| canonical.clone());
        }

        tracing::debug!(alias, canonical = %canonical, "Discovered equivalence");
        self.dynamic.insert(
            key,
            DynamicEntry {
                surface: alias.to_string(),
                canonical,
            },
        );
        stats.aliases_added += 1;
    }

    // ------------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------------

    /// Current state of both layers
    pub fn equivalence_report(&self) -> EquivalenceReport {
        EquivalenceReport {
            predefined_count: self.groups.len(),
            predefined_mappings: self.static_folded.len(),
            predefined_primary_names: self.groups.iter().map(|g| g.primary.clone()).collect(),
            dynamic_count: self.dynamic.len(),
            dynamic_entries: self
                .dynamic
                .values()
                .map(|entry| (entry.surface.clone(), entry.canonical.clone()))
                .collect(),
        }
    }

    /// Forget everything discovered so far
    pub fn clear_dynamic(&mut self) {
        self.dynamic.clear();
        self.dynamic_canonicals.clear();
    }

    /// Number of discovered aliases
    pub fn dynamic_len(&self) -> usize {
        self.dynamic.len()
    }
}

impl Default for EntityEquivalenceMapper {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Case- and spacing-insensitive key (underscores count as spaces)
fn fold(surface: &str) -> String {
    surface
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Leading words of a definition, up to the first function word
fn definition_head(definition: &str) -> &str {
    let definition = definition.trim();
    let mut offset = 0;
    for word in definition.split_whitespace() {
        let start = offset + definition[offset..].find(word).unwrap_or(0);
        if start > 0 && ALIAS_STOP_WORDS.contains(&word.to_lowercase().as_str()) {
            return definition[..start].trim_end();
        }
        offset = start + word.len();
    }
    definition
}

fn is_alias_shaped(form: &str) -> bool {
    !form.is_empty()
        && form.chars().any(char::is_alphabetic)
        && form.split_whitespace().count() <= MAX_ALIAS_WORDS
}

fn similarity_signal(form: &str) -> String {
    form.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Same signal, or one is an inflected form of the other ("thiamin"/"thiamine")
fn signals_match(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }

    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_len = short.chars().count();
    let long_len = long.chars().count();

    short_len >= MIN_PREFIX_SIGNAL
        && long_len - short_len < 3
        && long.starts_with(short)
        && long[short.len()..].chars().all(char::is_alphabetic)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_resolution() {
        let mapper = EntityEquivalenceMapper::new();

        assert_eq!(mapper.resolve("Niacin"), "Vitamin_B3");
        assert_eq!(mapper.resolve("NIACIN"), "Vitamin_B3");
        assert_eq!(mapper.resolve("Vitamin B3"), "Vitamin_B3");
        assert_eq!(mapper.resolve("  vitamin_b3 "), "Vitamin_B3");
        assert_eq!(mapper.resolve("Kalzium"), "Calcium");
        assert_eq!(mapper.resolve("Vitamin_B3"), "Vitamin_B3");
    }

    #[test]
    fn test_unknown_and_empty_forms() {
        let mapper = EntityEquivalenceMapper::new();

        assert_eq!(mapper.resolve("  nerve function "), "nerve function");
        assert_eq!(mapper.resolve(""), "");
        assert_eq!(mapper.resolve("   "), "");
        assert!(!mapper.is_known("nerve function"));
    }

    #[test]
    fn test_discover_apposition_entity() {
        let mut mapper = EntityEquivalenceMapper::empty();
        let entities = vec![
            EntityMention::new("Niacin").in_sentence(0),
            EntityMention::new("Vitamin B3 (Niacin)").in_sentence(0),
        ];

        let stats = mapper.discover_equivalences(&entities);

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.aliases_added, 1);
        assert_eq!(mapper.resolve("Niacin"), mapper.resolve("Vitamin B3"));
        assert_eq!(mapper.resolve("niacin"), "Vitamin B3");
        assert_eq!(mapper.resolve("VITAMIN B3"), "Vitamin B3");
    }

    #[test]
    fn test_discover_parenthetical_in_sentence() {
        let mut mapper = EntityEquivalenceMapper::empty();
        let entities = vec![EntityMention::new("Ascorbic acid")
            .with_source_sentence("Ascorbic acid (vitamin C) supports the immune system.")];

        mapper.discover_equivalences(&entities);

        assert_eq!(mapper.resolve("vitamin C"), "Ascorbic acid");
    }

    #[test]
    fn test_parenthetical_requires_whole_word_mention() {
        let mut mapper = EntityEquivalenceMapper::empty();
        let entities = vec![EntityMention::new("Eisen")
            .with_source_sentence("Nach dem Reisen (im Urlaub) fehlt oft Eisen.")];

        let stats = mapper.discover_equivalences(&entities);

        assert_eq!(stats.aliases_added, 0);
        assert_eq!(mapper.resolve("im Urlaub"), "im Urlaub");
        assert!(mapper.equivalence_report().dynamic_entries.is_empty());
    }

    #[test]
    fn test_parenthetical_after_punctuation() {
        let mut mapper = EntityEquivalenceMapper::empty();
        let entities = vec![EntityMention::new("Eisen")
            .with_source_sentence("Wichtig ist \"Eisen (Fe)\" für das Blut.")];

        mapper.discover_equivalences(&entities);

        assert_eq!(mapper.resolve("Fe"), "Eisen");
    }

    #[test]
    fn test_static_side_becomes_primary() {
        let mut mapper = EntityEquivalenceMapper::new();
        let entities = vec![EntityMention::new("Nicotinsäure")
            .with_source_sentence("Nicotinsäure (Niacin) ist wasserlöslich.")];

        let stats = mapper.discover_equivalences(&entities);

        assert_eq!(stats.aliases_added, 1);
        assert_eq!(mapper.resolve("Nicotinsäure"), "Vitamin_B3");
    }

    #[test]
    fn test_definitional_patterns() {
        let mut mapper = EntityEquivalenceMapper::empty();
        let entities = vec![
            EntityMention::new("Cholin")
                .with_source_sentence("Cholin, auch bekannt als Vitamin B4, ist wichtig."),
            EntityMention::new("Biotin")
                .with_source_sentence("Biotin, also known as vitamin H, helps the skin."),
            EntityMention::new("Folat")
                .with_source_sentence("Folat, auch Vitamin B9 genannt, fehlt oft."),
        ];

        mapper.discover_equivalences(&entities);

        assert_eq!(mapper.resolve("Vitamin B4"), "Cholin");
        assert_eq!(mapper.resolve("vitamin h"), "Biotin");
        assert_eq!(mapper.resolve("Vitamin B9"), "Folat");
    }

    #[test]
    fn test_definitional_alias_stops_at_continuation() {
        let mut mapper = EntityEquivalenceMapper::empty();
        let entities = vec![
            EntityMention::new("Biotin").with_source_sentence("Biotin, called vitamin H by many people."),
            EntityMention::new("Cholin")
                .with_source_sentence("Cholin, genannt Vitamin B4 von manchen Autoren"),
        ];

        mapper.discover_equivalences(&entities);

        assert_eq!(mapper.resolve("vitamin H"), "Biotin");
        assert_eq!(mapper.resolve("Vitamin B4"), "Cholin");
        let report = mapper.equivalence_report();
        assert_eq!(report.dynamic_count, 2);
        assert!(!report.dynamic_entries.contains_key("vitamin H by many people"));
        assert!(!report.dynamic_entries.contains_key("Vitamin B4 von manchen Autoren"));
    }

    #[test]
    fn test_definition_head() {
        assert_eq!(definition_head(" vitamin H by many people"), "vitamin H");
        assert_eq!(definition_head("Nicotinic acid"), "Nicotinic acid");
        assert_eq!(definition_head("Vitamin B9 und Folsäure"), "Vitamin B9");
        // A leading function word is kept
        assert_eq!(definition_head("the sunshine vitamin"), "the sunshine vitamin");
    }

    #[test]
    fn test_cooccurrence_similarity() {
        let mut mapper = EntityEquivalenceMapper::empty();
        let entities = vec![
            EntityMention::new("Carnitin").in_sentence(2),
            EntityMention::new("Carnitine").in_sentence(2),
            EntityMention::new("Carnosin").in_sentence(2),
            EntityMention::new("Carnitines").in_sentence(3),
        ];

        mapper.discover_equivalences(&entities);

        assert_eq!(mapper.resolve("Carnitine"), "Carnitin");
        assert_eq!(mapper.resolve("Carnosin"), "Carnosin");
        // Different sentence, no co-occurrence
        assert_eq!(mapper.resolve("Carnitines"), "Carnitines");
    }

    #[test]
    fn test_cooccurrence_ignores_known_forms() {
        let mut mapper = EntityEquivalenceMapper::new();
        let entities = vec![
            EntityMention::new("Thiamin").in_sentence(0),
            EntityMention::new("Thiaminx").in_sentence(0),
        ];

        let stats = mapper.discover_equivalences(&entities);

        assert_eq!(stats.aliases_added, 0);
        assert_eq!(mapper.resolve("Thiaminx"), "Thiaminx");
    }

    #[test]
    fn test_malformed_mentions_counted() {
        let mut mapper = EntityEquivalenceMapper::empty();
        let entities = vec![
            EntityMention::default(),
            EntityMention::new("  ").with_label("NUTRIENT"),
            EntityMention::new("Niacin"),
        ];

        let stats = mapper.discover_equivalences(&entities);

        assert_eq!(stats.skipped_malformed, 2);
        assert_eq!(stats.processed, 1);
    }

    #[test]
    fn test_empty_discovery_is_noop() {
        let mut mapper = EntityEquivalenceMapper::new();
        let stats = mapper.discover_equivalences(&[]);

        assert_eq!(stats, DiscoveryStats::default());
        assert_eq!(mapper.dynamic_len(), 0);
    }

    #[test]
    fn test_first_seen_wins() {
        let mut mapper = EntityEquivalenceMapper::empty();
        let entities = vec![
            EntityMention::new("Retinol (Vitamin A)"),
            EntityMention::new("Beta-Carotin (Vitamin A)"),
        ];

        let stats = mapper.discover_equivalences(&entities);

        assert_eq!(stats.conflicts, 1);
        assert_eq!(mapper.resolve("Vitamin A"), "Retinol");
        assert_eq!(mapper.resolve("Beta-Carotin"), "Beta-Carotin");
    }

    #[test]
    fn test_static_entries_never_overridden() {
        let mut mapper = EntityEquivalenceMapper::new();
        let entities = vec![EntityMention::new("Folsäure (Niacin)")];

        let stats = mapper.discover_equivalences(&entities);

        // Niacin is curated, so it becomes the primary instead of the alias
        assert_eq!(mapper.resolve("Niacin"), "Vitamin_B3");
        assert_eq!(mapper.resolve("Folsäure"), "Vitamin_B3");
        assert_eq!(stats.shadowed_by_static, 0);

        let stats = mapper.discover_equivalences(&[EntityMention::new("B1 (Niacin)")]);
        assert_eq!(stats.shadowed_by_static, 1);
        assert_eq!(mapper.resolve("B1"), "Vitamin_B1");
    }

    #[test]
    fn test_transitive_closure() {
        let mut mapper = EntityEquivalenceMapper::empty();
        mapper.discover_equivalences(&[EntityMention::new("Cobalt compound (Cobamid)")]);
        mapper.discover_equivalences(&[EntityMention::new("Corrinoid (Cobalt compound)")]);

        assert_eq!(mapper.resolve("Cobamid"), "Corrinoid");
        assert_eq!(mapper.resolve("Cobalt compound"), "Corrinoid");
        assert_eq!(mapper.resolve("Corrinoid"), "Corrinoid");
    }

    #[test]
    fn test_report_and_clear() {
        let mut mapper = EntityEquivalenceMapper::new();
        mapper.discover_equivalences(&[EntityMention::new("Inositol (Myo-Inositol)")]);

        let report = mapper.equivalence_report();
        assert_eq!(report.predefined_count, 8);
        assert!(report.predefined_mappings > report.predefined_count);
        assert!(report
            .predefined_primary_names
            .contains(&"Vitamin_B12".to_string()));
        assert_eq!(report.dynamic_count, 1);
        assert_eq!(
            report.dynamic_entries.get("Myo-Inositol").map(String::as_str),
            Some("Inositol")
        );

        mapper.clear_dynamic();
        assert_eq!(mapper.equivalence_report().dynamic_count, 0);
        assert_eq!(mapper.resolve("Myo-Inositol"), "Myo-Inositol");
    }

    #[test]
    fn test_from_config_groups() {
        let config = EquivalenceConfig {
            include_builtin: false,
            groups: vec![EquivalenceGroup::new("Folic_Acid", &["Folsäure", "Vitamin B9"])],
        };
        let mapper = EntityEquivalenceMapper::from_config(&config);

        assert_eq!(mapper.resolve("folsäure"), "Folic_Acid");
        assert_eq!(mapper.resolve("Niacin"), "Niacin");
        assert_eq!(mapper.equivalence_report().predefined_count, 1);
    }

    #[test]
    fn test_signals_match() {
        assert!(signals_match("thiamin", "thiamine"));
        assert!(signals_match("b3", "b3"));
        assert!(!signals_match("b3", "b31"));
        assert!(!signals_match("carnitin", "carnosin"));
        assert!(!signals_match("zinc", "zinc12"));
        assert!(!signals_match("", ""));
    }
}
