// src/core/dictionary.rs
use crate::error::{Result, RhymeError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// One dictionary key with the phrases filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    /// Raw (`ei4_e2`) or encoded (`e4v2`) phonetic key.
    pub key: String,
    pub phrases: Vec<String>,
}

/// Validated phrase dictionary, ready for indexing.
#[derive(Debug, Clone, Default)]
pub struct RawDictionary {
    entries: Vec<RawEntry>,
    positions: HashMap<String, usize>,
}

/// What the validating load kept and what it threw away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub accepted_keys: usize,
    /// Entries whose value was not a list.
    pub skipped_entries: usize,
    /// List items that were not non-empty strings.
    pub skipped_phrases: usize,
}

impl LoadReport {
    pub fn absorb(&mut self, other: LoadReport) {
        self.accepted_keys += other.accepted_keys;
        self.skipped_entries += other.skipped_entries;
        self.skipped_phrases += other.skipped_phrases;
    }
}

/// Size figures for a loaded dictionary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryStats {
    pub categories: usize,
    pub total_phrases: usize,
    /// Han characters (U+4E00..=U+9FA5) counted with repetition.
    pub total_han_chars: usize,
    pub unique_han_chars: usize,
}

pub fn is_han(ch: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&ch)
}

impl RawDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds from already-typed pairs. Empty phrases are dropped.
    pub fn from_pairs<K, P, I>(pairs: impl IntoIterator<Item = (K, I)>) -> Self
    where
        K: Into<String>,
        P: Into<String>,
        I: IntoIterator<Item = P>,
    {
        let mut dict = Self::new();
        for (key, phrases) in pairs {
            let phrases: Vec<String> = phrases.into_iter().map(Into::into).filter(|p: &String| !p.is_empty()).collect();
            dict.insert(key.into(), phrases);
        }
        dict
    }

    /// Validates an untyped JSON object of `key -> [phrase]`.
    pub fn from_value(value: &Value) -> Result<(Self, LoadReport)> {
        let object = value
            .as_object()
            .ok_or_else(|| RhymeError::InvalidDictionary("top level is not an object".into()))?;

        let mut dict = Self::new();
        let mut report = LoadReport::default();
        for (key, value) in object {
            let Some(items) = value.as_array() else {
                report.skipped_entries += 1;
                warn!(key = %key, "skipping dictionary entry whose value is not a list");
                continue;
            };
            let mut phrases = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(p) if !p.is_empty() => phrases.push(p.to_string()),
                    _ => report.skipped_phrases += 1,
                }
            }
            dict.insert(key.clone(), phrases);
            report.accepted_keys += 1;
        }
        Ok((dict, report))
    }

    /// Appends phrases under `key`, creating it if needed. Phrases already
    /// filed under the key are not repeated.
    pub fn insert(&mut self, key: String, phrases: Vec<String>) {
        let pos = match self.positions.get(&key) {
            Some(&pos) => pos,
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push(RawEntry { key, phrases: Vec::with_capacity(phrases.len()) });
                self.entries.len() - 1
            }
        };
        let known = &mut self.entries[pos].phrases;
        let mut seen: HashSet<String> = known.iter().cloned().collect();
        for phrase in phrases {
            if seen.insert(phrase.clone()) {
                known.push(phrase);
            }
        }
    }

    /// Folds another partial source in. Phrase lists of shared keys are unioned.
    pub fn merge(&mut self, other: RawDictionary) {
        for entry in other.entries {
            self.insert(entry.key, entry.phrases);
        }
    }

    pub fn entries(&self) -> &[RawEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> DictionaryStats {
        let mut unique = HashSet::new();
        let mut stats = DictionaryStats { categories: self.entries.len(), ..Default::default() };
        for entry in &self.entries {
            stats.total_phrases += entry.phrases.len();
            for ch in entry.phrases.iter().flat_map(|p| p.chars()).filter(|c| is_han(*c)) {
                stats.total_han_chars += 1;
                unique.insert(ch);
            }
        }
        stats.unique_han_chars = unique.len();
        stats
    }
}
