// src/core/converter.rs
use crate::core::types::PhoneticInfo;
use pinyin::ToPinyin;
use std::collections::HashMap;

/// Initials in match priority: two-letter initials precede their one-letter prefixes.
pub const INITIALS: [&str; 23] = [
    "zh", "ch", "sh", "z", "c", "s", "b", "p", "m", "f", "d", "t", "n", "l", "g", "k", "h", "j",
    "q", "x", "r", "w", "y",
];

/// Syllables that are a nasal on their own; the whole syllable is the final.
const SYLLABIC_NASALS: [&str; 5] = ["hng", "hm", "ng", "m", "n"];

const PALATAL_LIKE: [&str; 4] = ["j", "q", "x", "y"];
const FLAT_SIBILANTS: [&str; 3] = ["z", "c", "s"];
const RETROFLEXES: [&str; 4] = ["zh", "ch", "sh", "r"];

/// Source of numbered-tone romanizations ("feng1", "lü4", "de").
pub trait Romanizer {
    fn romanize(&self, ch: char) -> Option<String>;
}

/// Romanizer backed by the `pinyin` crate's reading tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct PinyinRomanizer;

impl Romanizer for PinyinRomanizer {
    fn romanize(&self, ch: char) -> Option<String> {
        ch.to_pinyin().map(|p| p.with_tone_num_end().to_string())
    }
}

/// A fixed character -> reading table. Useful for tests and for pinning
/// the reading of polyphonic characters.
#[derive(Debug, Default, Clone)]
pub struct TableRomanizer {
    readings: HashMap<char, String>,
}

impl TableRomanizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (char, &'a str)>) -> Self {
        Self { readings: pairs.into_iter().map(|(ch, raw)| (ch, raw.to_string())).collect() }
    }
}

impl Romanizer for TableRomanizer {
    fn romanize(&self, ch: char) -> Option<String> {
        self.readings.get(&ch).cloned()
    }
}

/// Memo of decoded characters. Owned by the caller so it can be swapped or
/// inspected; misses are memoized too.
#[derive(Debug, Default, Clone)]
pub struct PhoneticCache {
    entries: HashMap<char, Option<PhoneticInfo>>,
    hits: u64,
    misses: u64,
}

impl PhoneticCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Turns a character into (initial, final, tone).
pub struct PhoneticDecoder {
    romanizer: Box<dyn Romanizer + Send + Sync>,
}

impl PhoneticDecoder {
    pub fn new(romanizer: impl Romanizer + Send + Sync + 'static) -> Self {
        Self { romanizer: Box::new(romanizer) }
    }

    /// Decodes through `cache`. `None` means the character is unrhymable.
    pub fn decode(&self, ch: char, cache: &mut PhoneticCache) -> Option<PhoneticInfo> {
        if let Some(found) = cache.entries.get(&ch) {
            cache.hits += 1;
            return found.clone();
        }
        cache.misses += 1;
        let info = self.decode_uncached(ch);
        cache.entries.insert(ch, info.clone());
        info
    }

    pub fn decode_uncached(&self, ch: char) -> Option<PhoneticInfo> {
        let raw = self.romanizer.romanize(ch)?;
        parse_syllable(ch, &raw)
    }
}

/// Parses one numbered-tone syllable. Pure; exposed for tools that already
/// hold romanizations.
pub fn parse_syllable(ch: char, raw: &str) -> Option<PhoneticInfo> {
    if !raw.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let clean = normalize(raw);
    let (initial, fin) = split_initial_final(&clean);
    Some(PhoneticInfo { ch, initial, fin, tone: extract_tone(raw), raw: raw.to_string() })
}

/// Strips tone digits and folds ü / u: to `v`.
pub fn normalize(raw: &str) -> String {
    raw.to_lowercase()
        .replace("u:", "v")
        .replace('ü', "v")
        .chars()
        .filter(|c| !c.is_ascii_digit())
        .collect()
}

/// First tone digit; 5 (some tables' neutral tone) and missing digits map to 0.
pub fn extract_tone(raw: &str) -> u8 {
    match raw.chars().find(|c| c.is_ascii_digit()).and_then(|c| c.to_digit(10)) {
        Some(d @ 1..=4) => d as u8,
        _ => 0,
    }
}

/// Splits a normalized syllable into its initial and resolved final.
pub fn split_initial_final(syllable: &str) -> (String, String) {
    if SYLLABIC_NASALS.contains(&syllable) {
        return (String::new(), syllable.to_string());
    }

    let initial = INITIALS.iter().copied().find(|i| syllable.starts_with(i)).unwrap_or("");
    let mut rest = syllable[initial.len()..].to_string();

    if PALATAL_LIKE.contains(&initial) {
        if let Some(tail) = rest.strip_prefix('u') {
            rest = format!("v{tail}");
        }
        if rest == "e" {
            rest = "ie".to_string();
        }
    }
    if initial == "y" && rest == "an" {
        rest = "ian".to_string();
    }

    if rest == "i" {
        if FLAT_SIBILANTS.contains(&initial) {
            return (initial.to_string(), "i-flat".to_string());
        }
        if RETROFLEXES.contains(&initial) {
            return (initial.to_string(), "i-retro".to_string());
        }
    }

    if rest.is_empty() {
        return (initial.to_string(), syllable.to_string());
    }
    (initial.to_string(), rest)
}
