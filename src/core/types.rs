// src/core/types.rs
use serde::{Deserialize, Serialize};

/// A unique identifier for a phrase stored in the suffix index.
pub type PhraseId = usize;

/// Phonetic facts about a single character.
/// A pure function of the character, so it is safe to memoize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneticInfo {
    pub ch: char,
    /// Leading consonant(s), possibly empty.
    pub initial: String,
    /// The resolved final, e.g. "eng", "i-flat", "van".
    pub fin: String,
    /// 1..=4, or 0 for neutral/unknown.
    pub tone: u8,
    /// Numbered-tone romanization as delivered by the romanizer, e.g. "feng1".
    pub raw: String,
}

impl PhoneticInfo {
    /// Placeholder for a character the decoder could not read.
    /// Keeps phrase positions aligned while never taking part in a rhyme.
    pub fn unrhymable(ch: char) -> Self {
        Self { ch, initial: String::new(), fin: String::new(), tone: 0, raw: String::new() }
    }

    pub fn is_rhymable(&self) -> bool {
        !self.fin.is_empty() && self.tone != 0
    }
}

/// Discretized rhyme strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    /// Same final, same tone.
    Strict,
    /// Equivalent finals, same tone.
    Medium,
    /// Equivalent finals, any tone.
    Loose,
}

impl Tier {
    pub fn from_looseness(value: f32) -> Self {
        if value >= 0.67 {
            Tier::Loose
        } else if value >= 0.34 {
            Tier::Medium
        } else {
            // NaN lands here as well.
            Tier::Strict
        }
    }

    pub fn relaxes_tone(self) -> bool {
        self == Tier::Loose
    }

    pub fn level(self) -> u8 {
        match self {
            Tier::Strict => 0,
            Tier::Medium => 1,
            Tier::Loose => 2,
        }
    }
}

/// Phrases found for a source phrase of N characters, bucketed by length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Phrases of exactly N characters.
    pub same_length: Vec<String>,
    /// Phrases of N - 1 characters.
    pub shorter_by_one: Vec<String>,
    /// Phrases longer than N characters, shortest first.
    pub longer_lengths: Vec<String>,
    /// Set when `same_length` came from re-running the query on the last
    /// `k` characters only; holds that `k`.
    pub degraded_tail: Option<usize>,
}

impl QueryResult {
    pub fn is_degraded(&self) -> bool {
        self.degraded_tail.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.same_length.is_empty() && self.shorter_by_one.is_empty() && self.longer_lengths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_thresholds() {
        assert_eq!(Tier::from_looseness(0.0), Tier::Strict);
        assert_eq!(Tier::from_looseness(0.33), Tier::Strict);
        assert_eq!(Tier::from_looseness(0.34), Tier::Medium);
        assert_eq!(Tier::from_looseness(0.66), Tier::Medium);
        assert_eq!(Tier::from_looseness(0.67), Tier::Loose);
        assert_eq!(Tier::from_looseness(1.0), Tier::Loose);
        assert_eq!(Tier::from_looseness(f32::NAN), Tier::Strict);
    }

    #[test]
    fn neutral_tone_is_unrhymable() {
        let info = PhoneticInfo { ch: '的', initial: "d".into(), fin: "e".into(), tone: 0, raw: "de".into() };
        assert!(!info.is_rhymable());
        assert!(!PhoneticInfo::unrhymable('x').is_rhymable());
    }
}
