// --- File: src/core/index.rs
use crate::config::{EngineConfig, PrefilterConfig};
use crate::core::codec;
use crate::core::dictionary::{DictionaryStats, RawDictionary};
use crate::core::types::PhraseId;
use crate::filter::bloom::BloomFilter;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Phrases are searchable by at most this many trailing syllables.
pub const MAX_SUFFIX_LEN: usize = 4;

type Level = HashMap<String, Vec<PhraseId>>;

/// Read-only tail-rhyme index: `(suffix length, encoded suffix) -> phrases`.
#[derive(Debug, Clone)]
pub struct SuffixIndex {
    phrases: Vec<String>,
    levels: [Level; MAX_SUFFIX_LEN],
    filter: Option<BloomFilter>,
    stats: DictionaryStats,
}

fn filter_key(len: usize, suffix: &str) -> String {
    format!("{len}:{suffix}")
}

impl SuffixIndex {
    /// Phrases whose last `len` syllables encode to `suffix`. Empty on a miss.
    pub fn lookup(&self, suffix: &str, len: usize) -> Vec<&str> {
        self.bucket(suffix, len).iter().map(|&id| self.phrases[id].as_str()).collect()
    }

    pub(crate) fn bucket(&self, suffix: &str, len: usize) -> &[PhraseId] {
        if len == 0 || len > MAX_SUFFIX_LEN {
            return &[];
        }
        self.levels[len - 1].get(suffix).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `id` must come from this index's own buckets.
    pub(crate) fn phrase(&self, id: PhraseId) -> &str {
        &self.phrases[id]
    }

    /// Whether any phrase ends in `suffix`. Consults the pre-filter first.
    pub fn has_suffix(&self, suffix: &str, len: usize) -> bool {
        if len == 0 || len > MAX_SUFFIX_LEN {
            return false;
        }
        if let Some(filter) = &self.filter {
            if !filter.might_contain(&filter_key(len, suffix)) {
                return false;
            }
        }
        self.levels[len - 1].contains_key(suffix)
    }

    pub fn phrase_count(&self) -> usize {
        self.phrases.len()
    }

    pub fn key_count(&self) -> usize {
        self.levels.iter().map(HashMap::len).sum()
    }

    pub fn has_prefilter(&self) -> bool {
        self.filter.is_some()
    }

    pub fn stats(&self) -> DictionaryStats {
        self.stats
    }
}

/// Where a build currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildProgress {
    Inserting { done: usize, total: usize },
    Deduplicating { done: usize, total: usize },
    Finished,
}

enum Phase {
    Insert { next: usize },
    Dedup { next: usize },
    Done,
}

/// Incremental index construction. Every [`step`](Self::step) handles at
/// most `build_batch_size` items, so a caller can interleave other work
/// between steps; nothing is visible to queries until [`finish`](Self::finish).
pub struct IndexBuilder {
    source: RawDictionary,
    batch: usize,
    prefilter: PrefilterConfig,
    phase: Phase,
    phrases: Vec<String>,
    phrase_ids: HashMap<String, PhraseId>,
    levels: [Level; MAX_SUFFIX_LEN],
    pending: Vec<(usize, String)>,
    filter: Option<BloomFilter>,
    stats: DictionaryStats,
}

impl IndexBuilder {
    pub fn new(source: RawDictionary, config: &EngineConfig) -> Self {
        let stats = source.stats();
        Self {
            source,
            batch: config.build_batch_size.max(1),
            prefilter: config.prefilter.clone(),
            phase: Phase::Insert { next: 0 },
            phrases: Vec::new(),
            phrase_ids: HashMap::new(),
            levels: Default::default(),
            pending: Vec::new(),
            filter: None,
            stats,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Done)
    }

    /// Runs one bounded slice of work.
    pub fn step(&mut self) -> BuildProgress {
        match self.phase {
            Phase::Insert { next } => {
                let total = self.source.len();
                let end = (next + self.batch).min(total);
                for pos in next..end {
                    self.insert_entry(pos);
                }
                if end >= total {
                    self.begin_dedup();
                } else {
                    self.phase = Phase::Insert { next: end };
                }
                debug!(done = end, total, "suffix index insert tick");
                BuildProgress::Inserting { done: end, total }
            }
            Phase::Dedup { next } => {
                let total = self.pending.len();
                let end = (next + self.batch).min(total);
                for pos in next..end {
                    self.dedup_bucket(pos);
                }
                self.phase = if end >= total { Phase::Done } else { Phase::Dedup { next: end } };
                debug!(done = end, total, "suffix index dedup tick");
                BuildProgress::Deduplicating { done: end, total }
            }
            Phase::Done => BuildProgress::Finished,
        }
    }

    /// Drives the remaining steps and hands out the finished index.
    pub fn finish(mut self) -> SuffixIndex {
        while !self.is_finished() {
            self.step();
        }
        let index = SuffixIndex {
            phrases: self.phrases,
            levels: self.levels,
            filter: self.filter,
            stats: self.stats,
        };
        info!(
            phrases = index.phrase_count(),
            keys = index.key_count(),
            filter_bits = index.filter.as_ref().map_or(0, BloomFilter::bit_count),
            "suffix index built"
        );
        index
    }

    fn intern(&mut self, phrase: &str) -> PhraseId {
        if let Some(&id) = self.phrase_ids.get(phrase) {
            return id;
        }
        let id = self.phrases.len();
        self.phrases.push(phrase.to_string());
        self.phrase_ids.insert(phrase.to_string(), id);
        id
    }

    fn insert_entry(&mut self, pos: usize) {
        let entry = &self.source.entries()[pos];
        let syllables = codec::parse_key(&entry.key);
        if syllables.is_empty() || entry.phrases.is_empty() {
            return;
        }
        let (base, plain) = codec::encoded_variants(&syllables);
        let phrases = entry.phrases.clone();
        let ids: Vec<PhraseId> = phrases.iter().map(|p| self.intern(p)).collect();

        for codes in [base, plain].iter().filter(|c| !c.is_empty()) {
            for len in 1..=codes.len().min(MAX_SUFFIX_LEN) {
                let suffix = codes[codes.len() - len..].concat();
                self.levels[len - 1].entry(suffix).or_default().extend(&ids);
            }
        }
    }

    fn begin_dedup(&mut self) {
        self.pending = self
            .levels
            .iter()
            .enumerate()
            .flat_map(|(level, map)| map.keys().map(move |k| (level, k.clone())))
            .collect();
        self.pending.sort();
        if self.prefilter.enabled {
            self.filter = Some(BloomFilter::new(
                self.pending.len(),
                self.prefilter.bits_per_key,
                self.prefilter.hash_count,
            ));
        }
        self.phrase_ids = HashMap::new();
        self.phase = Phase::Dedup { next: 0 };
    }

    fn dedup_bucket(&mut self, pos: usize) {
        let (level, key) = &self.pending[pos];
        if let Some(bucket) = self.levels[*level].get_mut(key) {
            let mut seen = HashSet::with_capacity(bucket.len());
            bucket.retain(|id| seen.insert(*id));
        }
        if let Some(filter) = self.filter.as_mut() {
            filter.add(&filter_key(level + 1, key));
        }
    }
}

/// Builds an index in one go.
pub fn build_index(source: RawDictionary, config: &EngineConfig) -> SuffixIndex {
    IndexBuilder::new(source, config).finish()
}
