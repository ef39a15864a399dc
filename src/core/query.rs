// src/core/query.rs
use crate::config::EngineConfig;
use crate::core::codec;
use crate::core::converter::{PhoneticCache, PhoneticDecoder};
use crate::core::finals::{cached_variants, with_legacy_aliases, VariantCache};
use crate::core::index::{SuffixIndex, MAX_SUFFIX_LEN};
use crate::core::types::{PhoneticInfo, QueryResult, Tier};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Sibilant and retroflex initials. A plain-initial source never rhymes
/// with a candidate from this class.
const SIBILANT_INITIALS: [&str; 7] = ["zh", "ch", "sh", "r", "z", "c", "s"];

fn is_sibilant(initial: &str) -> bool {
    SIBILANT_INITIALS.contains(&initial)
}

/// Level (平, tones 1-2) / oblique (仄, tones 3-4) selection on a phrase's last character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToneFilter {
    #[default]
    All,
    Level,
    Oblique,
}

impl ToneFilter {
    /// The filter that actually applies at `looseness`. Below the loosest
    /// setting every hit already shares the source's tone, so only
    /// `looseness >= 1.0` narrows by tone class.
    pub fn at_looseness(self, looseness: f32) -> ToneFilter {
        if looseness >= 1.0 {
            self
        } else {
            ToneFilter::All
        }
    }

    pub fn accepts(self, tone: u8) -> bool {
        match self {
            ToneFilter::All => true,
            ToneFilter::Level => matches!(tone, 1 | 2),
            ToneFilter::Oblique => matches!(tone, 3 | 4),
        }
    }
}

/// Keeps phrases whose last character passes `filter`. Phrases ending in an
/// unreadable character survive only under [`ToneFilter::All`].
pub fn filter_by_tone(
    phrases: Vec<String>,
    filter: ToneFilter,
    mut decode: impl FnMut(char) -> Option<PhoneticInfo>,
) -> Vec<String> {
    if filter == ToneFilter::All {
        return phrases;
    }
    phrases
        .into_iter()
        .filter(|phrase| {
            phrase
                .chars()
                .last()
                .and_then(&mut decode)
                .is_some_and(|info| info.tone != 0 && filter.accepts(info.tone))
        })
        .collect()
}

/// Tail-aligned rhyme check of a decoded candidate against the source.
/// `candidate` holds one entry per character, `None` where decoding failed.
pub fn phrase_fits(
    candidate: &[Option<PhoneticInfo>],
    source: &[PhoneticInfo],
    tier: Tier,
    cache: &mut VariantCache,
) -> bool {
    let len = candidate.len().min(source.len());
    if len == 0 {
        return false;
    }
    let src_tail = &source[source.len() - len..];
    let cand_tail = &candidate[candidate.len() - len..];

    src_tail.iter().zip(cand_tail).all(|(src, cand)| {
        let Some(cand) = cand else { return false };
        if src.fin.is_empty() {
            return false;
        }
        let rhyme_ok = match tier {
            Tier::Strict => src.fin == cand.fin,
            _ => cached_variants(&src.fin, tier, cache).iter().any(|f| *f == cand.fin),
        };
        let tone_ok = tier.relaxes_tone() || src.tone == cand.tone;
        let initial_ok = is_sibilant(&src.initial) || !is_sibilant(&cand.initial);
        rhyme_ok && tone_ok && initial_ok
    })
}

/// Encoded query keys for the tail of a source phrase.
#[derive(Debug, Default)]
struct KeyPlan {
    /// Number of trailing syllables the keys cover.
    probe_len: usize,
    /// Keys at `probe_len`, both umlaut spellings.
    full: Vec<String>,
    /// Keys at `probe_len - 1`, both umlaut spellings.
    shorter: Vec<String>,
}

/// Phrases grouped by character count. Each phrase is judged once per
/// collection; a rejected phrase stays rejected.
#[derive(Default)]
struct LengthBuckets {
    by_len: BTreeMap<usize, Vec<String>>,
    seen: HashSet<String>,
}

impl LengthBuckets {
    fn offer(&mut self, phrase: &str, accept: impl FnOnce() -> bool) {
        if self.seen.contains(phrase) {
            return;
        }
        self.seen.insert(phrase.to_string());
        if accept() {
            self.by_len.entry(phrase.chars().count()).or_default().push(phrase.to_string());
        }
    }

    fn take(&mut self, len: usize) -> Vec<String> {
        self.by_len.remove(&len).unwrap_or_default()
    }
}

/// One query's worth of borrowed engine state.
pub struct QueryEngine<'a> {
    pub index: &'a SuffixIndex,
    pub decoder: &'a PhoneticDecoder,
    pub custom: &'a [String],
    pub config: &'a EngineConfig,
    pub phonetic_cache: &'a mut PhoneticCache,
    pub variant_cache: &'a mut VariantCache,
}

impl<'a> QueryEngine<'a> {
    /// Finds phrases rhyming with the tail of `infos`. `None` when no
    /// position is rhymable.
    pub fn query(&mut self, infos: &[PhoneticInfo], looseness: f32) -> Option<QueryResult> {
        if !infos.iter().any(PhoneticInfo::is_rhymable) {
            return None;
        }
        let tier = Tier::from_looseness(looseness);
        let n = infos.len();

        let mut buckets = self.collect(infos, tier);
        let mut result = QueryResult {
            same_length: buckets.take(n),
            shorter_by_one: if n > 1 { buckets.take(n - 1) } else { Vec::new() },
            longer_lengths: buckets.by_len.range(n + 1..).flat_map(|(_, p)| p.iter().cloned()).collect(),
            degraded_tail: None,
        };

        if result.same_length.is_empty() && n > 2 {
            for tail in (2..n).rev() {
                let sub = &infos[n - tail..];
                if !sub.iter().any(PhoneticInfo::is_rhymable) {
                    continue;
                }
                let found = self.collect(sub, tier).take(tail);
                if !found.is_empty() {
                    debug!(source_len = n, tail, "degraded to a tail-only match");
                    result.same_length = found;
                    result.degraded_tail = Some(tail);
                    break;
                }
            }
        }
        Some(result)
    }

    /// Custom-bank and dictionary hits for `infos` that pass [`phrase_fits`],
    /// bucketed by length. Custom phrases come first.
    fn collect(&mut self, infos: &[PhoneticInfo], tier: Tier) -> LengthBuckets {
        let mut buckets = LengthBuckets::default();
        let n = infos.len();
        let (index, custom) = (self.index, self.custom);

        for phrase in custom {
            buckets.offer(phrase, || self.fits(phrase, infos, tier));
        }

        let valid: Vec<&PhoneticInfo> = infos.iter().filter(|i| i.is_rhymable()).collect();
        let plan = self.plan_keys(&valid, tier);

        let mut probed = HashSet::new();
        for key in &plan.full {
            if probed.insert(key.as_str()) {
                for &id in index.bucket(key, plan.probe_len) {
                    let phrase = index.phrase(id);
                    buckets.offer(phrase, || self.fits(phrase, infos, tier));
                }
            }
        }

        if plan.probe_len == valid.len() && plan.probe_len >= 2 && n >= 2 {
            let mut probed = HashSet::new();
            for key in &plan.shorter {
                if !probed.insert(key.as_str()) {
                    continue;
                }
                for &id in index.bucket(key, plan.probe_len - 1) {
                    let phrase = index.phrase(id);
                    if phrase.chars().count() == n - 1 {
                        buckets.offer(phrase, || self.fits(phrase, infos, tier));
                    }
                }
            }
        }
        buckets
    }

    /// Decodes the overlapping tail of `phrase` and checks it against `infos`.
    fn fits(&mut self, phrase: &str, infos: &[PhoneticInfo], tier: Tier) -> bool {
        let skip = phrase.chars().count().saturating_sub(infos.len());
        let decoded: Vec<Option<PhoneticInfo>> =
            phrase.chars().skip(skip).map(|ch| self.decoder.decode(ch, self.phonetic_cache)).collect();
        phrase_fits(&decoded, infos, tier, self.variant_cache)
    }

    /// `(base, plain)` encoded syllables a position may match, exact choice first.
    fn position_choices(&mut self, info: &PhoneticInfo, tier: Tier) -> Vec<(String, String)> {
        let finals = with_legacy_aliases(&cached_variants(&info.fin, tier, self.variant_cache));
        let tones: Vec<u8> = if tier.relaxes_tone() {
            std::iter::once(info.tone).chain((1..=4).filter(|t| *t != info.tone)).collect()
        } else {
            vec![info.tone]
        };

        let mut choices: Vec<(String, String)> = Vec::new();
        for fin in &finals {
            for tone in &tones {
                let base = codec::fold_umlaut(&format!("{fin}{tone}"));
                let plain = base.replace('v', "u");
                let choice = (codec::encode_syllable(&base), codec::encode_syllable(&plain));
                if !choices.contains(&choice) {
                    choices.push(choice);
                }
            }
        }
        if choices.len() > self.config.max_fanout_per_position {
            warn!(
                ch = %info.ch,
                kept = self.config.max_fanout_per_position,
                dropped = choices.len() - self.config.max_fanout_per_position,
                "per-position fan-out capped"
            );
            choices.truncate(self.config.max_fanout_per_position);
        }
        choices
    }

    /// Cartesian product of the position choices, built from the last
    /// syllable backwards. A partial suffix nobody ends in is dropped at once,
    /// which is exact: every phrase indexed under k syllables is also indexed
    /// under each shorter tail.
    fn plan_keys(&mut self, valid: &[&PhoneticInfo], tier: Tier) -> KeyPlan {
        let probe_len = valid.len().min(MAX_SUFFIX_LEN);
        let tail = &valid[valid.len() - probe_len..];
        let choices: Vec<Vec<(String, String)>> =
            tail.iter().map(|info| self.position_choices(info, tier)).collect();

        let mut plan = KeyPlan { probe_len, ..Default::default() };
        let mut partials: Vec<(String, String)> = vec![(String::new(), String::new())];
        let mut capped = false;

        for k in 1..=probe_len {
            let mut next: Vec<(String, String)> = Vec::new();
            'expand: for (cb, cp) in &choices[probe_len - k] {
                for (pb, pp) in &partials {
                    let base = format!("{cb}{pb}");
                    let plain = format!("{cp}{pp}");
                    if !self.index.has_suffix(&base, k) && !self.index.has_suffix(&plain, k) {
                        continue;
                    }
                    if next.len() >= self.config.max_query_keys {
                        capped = true;
                        break 'expand;
                    }
                    next.push((base, plain));
                }
            }
            if k + 1 == probe_len {
                plan.shorter = flatten(&next);
            }
            partials = next;
            if partials.is_empty() {
                break;
            }
        }
        if capped {
            warn!(limit = self.config.max_query_keys, "candidate key generation capped");
        }
        if probe_len > 0 && !partials.is_empty() {
            plan.full = flatten(&partials);
        }
        plan
    }
}

fn flatten(pairs: &[(String, String)]) -> Vec<String> {
    let mut out = Vec::with_capacity(pairs.len() * 2);
    for (base, plain) in pairs {
        out.push(base.clone());
        if plain != base {
            out.push(plain.clone());
        }
    }
    out
}
