// src/core/finals.rs
use crate::core::types::Tier;
use std::collections::HashMap;
use std::sync::Arc;

/// A named family of finals that rhyme with each other.
#[derive(Debug, Clone, Copy)]
pub struct RhymeGroup {
    pub name: &'static str,
    pub finals: &'static [&'static str],
}

/// Front/back nasal merges, consulted before the thirteen schemes.
pub const NASAL_MERGES: [RhymeGroup; 3] = [
    RhymeGroup { name: "an-ang", finals: &["an", "ian", "uan", "van", "üan", "ang", "iang", "uang"] },
    RhymeGroup { name: "en-eng", finals: &["en", "un", "eng", "ong", "iong"] },
    RhymeGroup { name: "in-ing", finals: &["in", "vn", "ün", "ing"] },
];

/// The Thirteen Rhyme Schemes (十三辙); 人辰 is split into its two halves.
pub const THIRTEEN_SCHEMES: [RhymeGroup; 14] = [
    RhymeGroup { name: "发花", finals: &["a", "ia", "ua"] },
    RhymeGroup { name: "梭波", finals: &["o", "e", "uo"] },
    RhymeGroup { name: "乜斜", finals: &["ie", "ue", "ve"] },
    RhymeGroup { name: "言前", finals: &["an", "ian", "uan", "van", "üan"] },
    RhymeGroup { name: "人辰-深", finals: &["en", "un"] },
    RhymeGroup { name: "人辰-亲", finals: &["in", "vn", "ün"] },
    RhymeGroup { name: "江阳", finals: &["ang", "iang", "uang"] },
    RhymeGroup { name: "中东", finals: &["eng", "ing", "ong", "iong"] },
    RhymeGroup { name: "一七", finals: &["i", "v", "er", "ü", "i-flat", "i-retro"] },
    RhymeGroup { name: "姑苏", finals: &["u"] },
    RhymeGroup { name: "怀来", finals: &["ai", "uai"] },
    RhymeGroup { name: "灰堆", finals: &["ei", "ui", "uei"] },
    RhymeGroup { name: "遥条", finals: &["ao", "iao"] },
    RhymeGroup { name: "油求", finals: &["ou", "iu", "iou"] },
];

/// Older dictionary builds filed apical and some plain i/u syllables under
/// these labels. Query keys must also try them to reach those entries.
pub fn legacy_aliases(fin: &str) -> &'static [&'static str] {
    match fin {
        "i-flat" | "i-retro" => &["i"],
        "i" => &[
            "i",
            "z-retroflex",
            "c-retroflex",
            "s-retroflex",
            "zh-retroflex-e",
            "ch-retroflex-e",
            "sh-retroflex-e",
            "r-retroflex-e",
            "j-palatal",
            "q-palatal",
            "x-palatal",
        ],
        "u" => &[
            "u",
            "z-retroflex",
            "c-retroflex",
            "s-retroflex",
            "zh-retroflex-e",
            "ch-retroflex-e",
            "sh-retroflex-e",
            "r-retroflex-e",
        ],
        _ => &[],
    }
}

/// Name of the thirteen-scheme family a final belongs to.
pub fn scheme_of(fin: &str) -> Option<&'static str> {
    THIRTEEN_SCHEMES.iter().find(|g| g.finals.contains(&fin)).map(|g| g.name)
}

/// Memo of `(final, tier) -> variants`, owned by the caller.
#[derive(Debug, Default, Clone)]
pub struct VariantCache {
    entries: HashMap<(String, Tier), Arc<[String]>>,
    hits: u64,
    misses: u64,
}

impl VariantCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

/// Finals considered equivalent to `fin` at `tier`. Never empty and always
/// starts with `fin` itself. Only finals widen here; tone relaxation is the
/// caller's business.
pub fn variants(fin: &str, tier: Tier) -> Vec<String> {
    if tier == Tier::Strict {
        return vec![fin.to_string()];
    }
    let group = NASAL_MERGES
        .iter()
        .chain(THIRTEEN_SCHEMES.iter())
        .find(|g| g.finals.contains(&fin));

    let mut out = vec![fin.to_string()];
    if let Some(group) = group {
        out.extend(group.finals.iter().filter(|f| **f != fin).map(|f| f.to_string()));
    }
    out
}

/// Cached form of [`variants`].
pub fn cached_variants(fin: &str, tier: Tier, cache: &mut VariantCache) -> Arc<[String]> {
    let key = (fin.to_string(), tier);
    if let Some(found) = cache.entries.get(&key) {
        cache.hits += 1;
        return Arc::clone(found);
    }
    cache.misses += 1;
    let computed: Arc<[String]> = variants(fin, tier).into();
    cache.entries.insert(key, Arc::clone(&computed));
    computed
}

/// Variants widened by the legacy alias map, order-preserving and deduplicated.
pub fn with_legacy_aliases(finals: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(finals.len());
    let mut push = |f: &str| {
        if !out.iter().any(|o| o == f) {
            out.push(f.to_string());
        }
    };
    for fin in finals {
        push(fin.as_str());
        for alias in legacy_aliases(fin) {
            push(*alias);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn set(v: Vec<String>) -> HashSet<String> {
        v.into_iter().collect()
    }

    #[test]
    fn strict_is_identity() {
        for fin in ["an", "i-flat", "zzz"] {
            assert_eq!(variants(fin, Tier::Strict), vec![fin.to_string()]);
        }
    }

    #[test]
    fn nasal_merge_beats_scheme() {
        let got = set(variants("un", Tier::Medium));
        let want: HashSet<String> = ["en", "un", "eng", "ong", "iong"].iter().map(|s| s.to_string()).collect();
        assert_eq!(got, want);
        assert!(variants("ing", Tier::Medium).contains(&"in".to_string()));
    }

    #[test]
    fn falls_back_to_thirteen_schemes() {
        let got = set(variants("i-flat", Tier::Medium));
        assert!(got.contains("i-retro"));
        assert!(got.contains("er"));
        assert_eq!(set(variants("ao", Tier::Medium)).len(), 2);
    }

    #[test]
    fn unknown_final_is_unchanged() {
        assert_eq!(variants("z-retroflex", Tier::Loose), vec!["z-retroflex".to_string()]);
    }

    #[test]
    fn medium_and_loose_agree_on_finals() {
        for group in THIRTEEN_SCHEMES.iter().chain(NASAL_MERGES.iter()) {
            for fin in group.finals {
                assert_eq!(variants(fin, Tier::Medium), variants(fin, Tier::Loose));
                assert_eq!(variants(fin, Tier::Medium)[0], *fin);
            }
        }
    }

    #[test]
    fn legacy_aliases_widen_apicals() {
        let widened = with_legacy_aliases(&["i-flat".to_string()]);
        assert_eq!(widened, vec!["i-flat".to_string(), "i".to_string()]);
        let widened = with_legacy_aliases(&variants("i-retro", Tier::Strict));
        assert!(widened.contains(&"i".to_string()));
        assert!(!widened.contains(&"z-retroflex".to_string()));
    }

    #[test]
    fn variant_cache_hits() {
        let mut cache = VariantCache::new();
        let a = cached_variants("an", Tier::Medium, &mut cache);
        let b = cached_variants("an", Tier::Medium, &mut cache);
        cached_variants("an", Tier::Strict, &mut cache);
        assert_eq!(a, b);
        assert_eq!((cache.hits(), cache.misses()), (1, 2));
    }

    #[test]
    fn scheme_lookup() {
        assert_eq!(scheme_of("iang"), Some("江阳"));
        assert_eq!(scheme_of("m"), None);
    }
}
