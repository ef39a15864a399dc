// src/core/engine.rs
use crate::config::EngineConfig;
use crate::core::converter::{PhoneticCache, PhoneticDecoder, PinyinRomanizer, Romanizer};
use crate::core::dictionary::RawDictionary;
use crate::core::finals::VariantCache;
use crate::core::index::{BuildProgress, IndexBuilder, SuffixIndex};
use crate::core::query::{filter_by_tone, phrase_fits, QueryEngine, ToneFilter};
use crate::core::types::{PhoneticInfo, QueryResult, Tier};
use crate::custom::CustomBank;
use crate::error::{Result, RhymeError};
use crate::persistence::{load_custom_bank, save_custom_bank};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

// The engine owns the decoder, the installed index snapshot, the user's
// custom bank and both memo caches. The index is only ever replaced whole.
pub struct RhymeEngine {
    decoder: PhoneticDecoder,
    config: EngineConfig,
    index: Option<Arc<SuffixIndex>>,
    custom_bank: CustomBank,
    phonetic_cache: PhoneticCache,
    variant_cache: VariantCache,
    custom_bank_path: Option<PathBuf>,
}

impl Default for RhymeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RhymeEngine {
    /// Engine reading characters through the `pinyin` crate, default config.
    pub fn new() -> Self {
        Self::with_romanizer(PinyinRomanizer, EngineConfig::default())
    }

    pub fn with_romanizer(romanizer: impl Romanizer + Send + Sync + 'static, config: EngineConfig) -> Self {
        Self {
            decoder: PhoneticDecoder::new(romanizer),
            config: config.sanitized(),
            index: None,
            custom_bank: CustomBank::new(),
            phonetic_cache: PhoneticCache::new(),
            variant_cache: VariantCache::new(),
            custom_bank_path: None,
        }
    }

    /// Restores the custom bank saved at `path`, or starts empty.
    pub fn from_file_or_new(path: &Path, config: EngineConfig) -> Self {
        let mut engine = Self::with_romanizer(PinyinRomanizer, config);
        match load_custom_bank(path) {
            Ok(bank) => engine.custom_bank = bank,
            Err(e) => debug!(path = %path.display(), error = %e, "starting with an empty custom bank"),
        }
        engine.custom_bank_path = Some(path.to_path_buf());
        engine
    }

    // --- decoding ---

    pub fn decode(&mut self, ch: char) -> Option<PhoneticInfo> {
        self.decoder.decode(ch, &mut self.phonetic_cache)
    }

    /// One entry per character; unreadable characters become unrhymable placeholders.
    pub fn decode_phrase(&mut self, phrase: &str) -> Vec<PhoneticInfo> {
        phrase
            .chars()
            .map(|ch| self.decode(ch).unwrap_or_else(|| PhoneticInfo::unrhymable(ch)))
            .collect()
    }

    /// Installs fresh memo caches, returning the old ones.
    pub fn replace_caches(&mut self, phonetic: PhoneticCache, variants: VariantCache) -> (PhoneticCache, VariantCache) {
        (
            std::mem::replace(&mut self.phonetic_cache, phonetic),
            std::mem::replace(&mut self.variant_cache, variants),
        )
    }

    pub fn phonetic_cache(&self) -> &PhoneticCache {
        &self.phonetic_cache
    }

    pub fn variant_cache(&self) -> &VariantCache {
        &self.variant_cache
    }

    // --- querying ---

    /// Rhymes for the tail of `infos`.
    /// `Ok(None)`: nothing rhymable. `Err(IndexNotReady)`: no index installed yet.
    pub fn query(&mut self, infos: &[PhoneticInfo], looseness: f32) -> Result<Option<QueryResult>> {
        let index = self.index.as_ref().ok_or(RhymeError::IndexNotReady)?;
        let mut engine = QueryEngine {
            index,
            decoder: &self.decoder,
            custom: self.custom_bank.phrases(),
            config: &self.config,
            phonetic_cache: &mut self.phonetic_cache,
            variant_cache: &mut self.variant_cache,
        };
        let result = engine.query(infos, looseness);
        debug!(
            phonetic_hits = self.phonetic_cache.hits(),
            phonetic_misses = self.phonetic_cache.misses(),
            variant_hits = self.variant_cache.hits(),
            variant_misses = self.variant_cache.misses(),
            "cache statistics"
        );
        Ok(result)
    }

    pub fn query_phrase(&mut self, phrase: &str, looseness: f32) -> Result<Option<QueryResult>> {
        let infos = self.decode_phrase(phrase);
        self.query(&infos, looseness)
    }

    /// Whether `phrase` rhymes with `source` at `tier`, aligned from the tail.
    pub fn fits(&mut self, phrase: &str, source: &[PhoneticInfo], tier: Tier) -> bool {
        let decoded: Vec<Option<PhoneticInfo>> = phrase.chars().map(|ch| self.decode(ch)).collect();
        phrase_fits(&decoded, source, tier, &mut self.variant_cache)
    }

    pub fn filter_by_tone(&mut self, phrases: Vec<String>, filter: ToneFilter) -> Vec<String> {
        filter_by_tone(phrases, filter, |ch| self.decode(ch))
    }

    // --- index lifecycle ---

    /// Builds an index in bounded batches and installs it once complete.
    pub fn build_index(&mut self, raw: RawDictionary) -> Arc<SuffixIndex> {
        self.build_index_with_progress(raw, |_| {})
    }

    pub fn build_index_with_progress(
        &mut self,
        raw: RawDictionary,
        mut on_progress: impl FnMut(BuildProgress),
    ) -> Arc<SuffixIndex> {
        let mut builder = IndexBuilder::new(raw, &self.config);
        while !builder.is_finished() {
            on_progress(builder.step());
        }
        let index = Arc::new(builder.finish());
        self.install_index(Arc::clone(&index));
        index
    }

    /// Swaps in a complete index.
    pub fn install_index(&mut self, index: Arc<SuffixIndex>) {
        info!(phrases = index.phrase_count(), keys = index.key_count(), "rhyme index installed");
        self.index = Some(index);
    }

    pub fn clear_index(&mut self) {
        if self.index.take().is_some() {
            info!("rhyme index cleared");
        }
    }

    pub fn index(&self) -> Option<&Arc<SuffixIndex>> {
        self.index.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.index.is_some()
    }

    // --- custom bank ---

    pub fn add_custom_phrase(&mut self, phrase: &str) -> bool {
        self.custom_bank.add(phrase)
    }

    pub fn remove_custom_phrase(&mut self, phrase: &str) -> bool {
        self.custom_bank.remove(phrase)
    }

    pub fn custom_bank(&self) -> &CustomBank {
        &self.custom_bank
    }

    pub fn save_custom_bank(&self) -> Result<()> {
        match &self.custom_bank_path {
            Some(path) => save_custom_bank(&self.custom_bank, path),
            None => {
                warn!("no custom bank path configured; nothing saved");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::converter::TableRomanizer;

    fn engine() -> RhymeEngine {
        let table = TableRomanizer::from_pairs([
            ('春', "chun1"),
            ('风', "feng1"),
            ('东', "dong1"),
            ('深', "shen1"),
            ('冬', "dong1"),
            ('蓝', "lan2"),
            ('天', "tian1"),
            ('吞', "tun1"),
        ]);
        RhymeEngine::with_romanizer(table, EngineConfig::default())
    }

    fn dictionary() -> RawDictionary {
        RawDictionary::from_pairs([("un1_eng1", vec!["春风"]), ("en1_ong1", vec!["深冬"])])
    }

    #[test]
    fn query_before_build_is_not_ready() {
        let mut engine = engine();
        assert!(!engine.is_ready());
        assert!(matches!(engine.query_phrase("春风", 0.0), Err(RhymeError::IndexNotReady)));
    }

    #[test]
    fn build_installs_index_and_answers() {
        let mut engine = engine();
        let mut ticks = 0;
        engine.build_index_with_progress(dictionary(), |_| ticks += 1);
        assert!(ticks > 0);
        assert!(engine.is_ready());

        let strict = engine.query_phrase("春风", 0.0).unwrap().unwrap();
        assert_eq!(strict.same_length, vec!["春风"]);
        let medium = engine.query_phrase("春风", 0.5).unwrap().unwrap();
        assert_eq!(medium.same_length, vec!["春风", "深冬"]);

        engine.clear_index();
        assert!(matches!(engine.query_phrase("春风", 0.0), Err(RhymeError::IndexNotReady)));
    }

    #[test]
    fn unreadable_source_yields_nothing() {
        let mut engine = engine();
        engine.build_index(dictionary());
        assert_eq!(engine.query_phrase("ab", 1.0).unwrap(), None);
    }

    #[test]
    fn decode_phrase_keeps_positions() {
        let mut engine = engine();
        let infos = engine.decode_phrase("春x风");
        assert_eq!(infos.len(), 3);
        assert!(!infos[1].is_rhymable());
        assert_eq!(infos[2].fin, "eng");
    }

    #[test]
    fn decode_is_memoized() {
        let mut engine = engine();
        engine.decode('春');
        engine.decode('春');
        assert_eq!(engine.phonetic_cache().misses(), 1);
        assert_eq!(engine.phonetic_cache().hits(), 1);

        let (old, _) = engine.replace_caches(PhoneticCache::new(), VariantCache::new());
        assert_eq!(old.len(), 1);
        assert!(engine.phonetic_cache().is_empty());
    }

    #[test]
    fn custom_phrases_are_offered_first() {
        let mut engine = engine();
        engine.build_index(dictionary());
        assert!(engine.add_custom_phrase("吞风"));
        assert!(engine.add_custom_phrase("东风"));
        let result = engine.query_phrase("春风", 0.0).unwrap().unwrap();
        assert_eq!(result.same_length, vec!["吞风", "春风"]);
        assert!(engine.remove_custom_phrase("吞风"));
        assert!(engine.remove_custom_phrase("东风"));
        assert!(engine.custom_bank().is_empty());
    }

    #[test]
    fn fits_and_tone_filter() {
        let mut engine = engine();
        let source = engine.decode_phrase("春风");
        assert!(engine.fits("深冬", &source, Tier::Medium));
        assert!(!engine.fits("深冬", &source, Tier::Strict));
        let kept = engine.filter_by_tone(vec!["蓝天".into(), "深蓝".into()], ToneFilter::Level);
        assert_eq!(kept, vec!["蓝天", "深蓝"]);
        let kept = engine.filter_by_tone(vec!["蓝天".into(), "深蓝".into()], ToneFilter::Oblique);
        assert!(kept.is_empty());
    }

    #[test]
    fn save_without_path_is_a_no_op() {
        let engine = engine();
        assert!(engine.save_custom_bank().is_ok());
    }

    #[test]
    fn bank_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom_bank.bin");
        let mut engine = RhymeEngine::from_file_or_new(&path, EngineConfig::default());
        assert!(engine.custom_bank().is_empty());
        engine.add_custom_phrase("北京");
        engine.save_custom_bank().unwrap();

        let reopened = RhymeEngine::from_file_or_new(&path, EngineConfig::default());
        assert!(reopened.custom_bank().contains("北京"));
    }
}
