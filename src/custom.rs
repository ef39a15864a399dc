// File: src/custom.rs
use serde::{Deserialize, Serialize};

/// User-authored phrases that are offered ahead of dictionary hits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomBank {
    phrases: Vec<String>,
}

impl CustomBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a phrase. Returns false for blank or already-known phrases.
    pub fn add(&mut self, phrase: &str) -> bool {
        let phrase = phrase.trim();
        if phrase.is_empty() || self.contains(phrase) {
            return false;
        }
        self.phrases.push(phrase.to_string());
        true
    }

    pub fn remove(&mut self, phrase: &str) -> bool {
        let phrase = phrase.trim();
        let before = self.phrases.len();
        self.phrases.retain(|p| p != phrase);
        self.phrases.len() != before
    }

    pub fn contains(&self, phrase: &str) -> bool {
        self.phrases.iter().any(|p| p == phrase)
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

impl FromIterator<String> for CustomBank {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut bank = CustomBank::new();
        for phrase in iter {
            bank.add(&phrase);
        }
        bank
    }
}
