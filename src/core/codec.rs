// src/core/codec.rs
//! Compact phonetic keys.
//!
//! A key spells the trailing syllables of a phrase as `final + tone` pairs.
//! In its raw form syllables are joined by `_` (`"ei4_e2"`); the encoded
//! form replaces every known final with one symbol and drops the separator
//! (`"e4v2"`). Finals without a symbol pass through verbatim.

/// Separator between syllables of a raw key.
pub const SEPARATOR: char = '_';

/// Final -> single-symbol table. One-to-one in both directions.
pub const FINAL_CODES: [(&str, char); 45] = [
    ("iong", '0'), ("uang", '1'), ("iang", '2'), ("ueng", '3'), ("uan", '4'),
    ("ian", '5'), ("uen", '6'), ("iao", '7'), ("uai", '8'), ("ang", '9'),
    ("eng", 'a'), ("ing", 'b'), ("ong", 'c'), ("ai", 'd'), ("ei", 'e'),
    ("ao", 'f'), ("ou", 'g'), ("an", 'h'), ("en", 'i'), ("in", 'j'),
    ("un", 'k'), ("vn", 'l'), ("ia", 'm'), ("ua", 'n'), ("uo", 'o'),
    ("ie", 'p'), ("ue", 'q'), ("ui", 'r'), ("er", 's'), ("a", 't'),
    ("o", 'u'), ("e", 'v'), ("i", 'w'), ("u", 'x'), ("v", 'y'),
    ("i-flat", 'z'), ("i-retro", 'A'), ("ü", 'B'), ("üan", 'C'), ("ün", 'D'),
    ("m", 'E'), ("n", 'F'), ("ng", 'G'), ("hm", 'H'), ("hng", 'I'),
];

pub fn code_for(fin: &str) -> Option<char> {
    FINAL_CODES.iter().find(|(f, _)| *f == fin).map(|(_, c)| *c)
}

pub fn final_for(code: char) -> Option<&'static str> {
    FINAL_CODES.iter().find(|(_, c)| *c == code).map(|(f, _)| *f)
}

fn is_tone_digit(c: char) -> bool {
    ('0'..='4').contains(&c)
}

/// Splits `"eng1"` into `("eng", 1)`.
pub fn split_tone(syllable: &str) -> Option<(&str, u8)> {
    let last = syllable.chars().last()?;
    if !is_tone_digit(last) || syllable.len() < 2 {
        return None;
    }
    let body = &syllable[..syllable.len() - 1];
    Some((body, last as u8 - b'0'))
}

/// Encodes one `final + tone` syllable, passing unknown finals through.
pub fn encode_syllable(syllable: &str) -> String {
    match split_tone(syllable).and_then(|(body, tone)| code_for(body).map(|c| (c, tone))) {
        Some((code, tone)) => format!("{code}{tone}"),
        None => syllable.to_string(),
    }
}

/// `"ei4_e2"` -> `"e4v2"`.
pub fn encode(final_tone: &str) -> String {
    final_tone
        .split(SEPARATOR)
        .filter(|part| !part.is_empty())
        .map(encode_syllable)
        .collect()
}

/// Inverse of [`encode`]. Tolerates verbatim syllables mixed with encoded
/// pairs; trailing text without a tone digit is kept as its own syllable.
pub fn decode(encoded: &str) -> String {
    decode_syllables(encoded).join(&SEPARATOR.to_string())
}

fn decode_syllables(encoded: &str) -> Vec<String> {
    let chars: Vec<char> = encoded.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let pair = chars.get(i + 1).filter(|c| is_tone_digit(**c)).and_then(|tone| {
            final_for(chars[i]).map(|fin| format!("{fin}{tone}"))
        });
        if let Some(syllable) = pair {
            out.push(syllable);
            i += 2;
            continue;
        }
        // Verbatim syllable: runs up to and including the next tone digit.
        let start = i;
        while i < chars.len() && !is_tone_digit(chars[i]) {
            i += 1;
        }
        i = (i + 1).min(chars.len());
        out.push(chars[start..i].iter().collect());
    }
    out
}

/// Folds the two umlaut spellings to `v`.
pub fn fold_umlaut(s: &str) -> String {
    s.replace("u:", "v").replace('ü', "v")
}

fn looks_encoded(part: &str) -> bool {
    let chars: Vec<char> = part.chars().collect();
    !chars.is_empty()
        && chars.len() % 2 == 0
        && chars.chunks(2).all(|pair| final_for(pair[0]).is_some() && is_tone_digit(pair[1]))
}

/// Splits a dictionary key (raw, single-syllable or already encoded) into
/// raw `final + tone` syllables.
pub fn parse_key(key: &str) -> Vec<String> {
    let mut out = Vec::new();
    for part in key.split(SEPARATOR).filter(|p| !p.is_empty()) {
        let known_raw = split_tone(part).is_some_and(|(body, _)| code_for(&fold_umlaut(body)).is_some());
        if !known_raw && looks_encoded(part) {
            out.extend(decode_syllables(part));
        } else {
            out.push(part.to_string());
        }
    }
    out
}

/// Encoded per-syllable codes for both umlaut spellings of `syllables`.
/// The second list is empty when both spellings coincide.
pub fn encoded_variants(syllables: &[String]) -> (Vec<String>, Vec<String>) {
    let base: Vec<String> = syllables.iter().map(|s| fold_umlaut(s)).collect();
    let plain: Vec<String> = base.iter().map(|s| s.replace('v', "u")).collect();
    let encode_all = |list: &[String]| list.iter().map(|s| encode_syllable(s)).collect::<Vec<_>>();
    if plain == base {
        (encode_all(&base), Vec::new())
    } else {
        (encode_all(&base), encode_all(&plain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_finals_round_trip() {
        for (fin, _) in FINAL_CODES {
            for tone in 1..=4 {
                let raw = format!("{fin}{tone}");
                assert_eq!(decode(&encode(&raw)), raw, "final {fin}");
            }
        }
    }

    #[test]
    fn codes_are_unique() {
        for (fin, code) in FINAL_CODES {
            assert_eq!(final_for(code), Some(fin));
            assert_eq!(code_for(fin), Some(code));
        }
        let mut codes: Vec<char> = FINAL_CODES.iter().map(|(_, c)| *c).collect();
        codes.sort();
        codes.dedup();
        let mut finals: Vec<&str> = FINAL_CODES.iter().map(|(f, _)| *f).collect();
        finals.sort();
        finals.dedup();
        assert_eq!(codes.len(), finals.len());
    }

    #[test]
    fn multi_syllable_keys() {
        assert_eq!(encode("ei4_e2"), "e4v2");
        assert_eq!(decode("e4v2"), "ei4_e2");
        assert_eq!(encode("un1_eng1"), "k1a1");
    }

    #[test]
    fn unknown_finals_pass_through() {
        assert_eq!(encode("ve1"), "ve1");
        assert_eq!(decode("ve1"), "ve1");
        assert_eq!(encode("z-retroflex3_an1"), "z-retroflex3h1");
        assert_eq!(decode("z-retroflex3h1"), "z-retroflex3_an1");
        assert_eq!(decode("junk"), "junk");
    }

    #[test]
    fn umlaut_variants() {
        assert_eq!(fold_umlaut("lü4"), "lv4");
        assert_eq!(fold_umlaut("nu:e4"), "nve4");
        let (_, plain) = encoded_variants(&["an1".to_string()]);
        assert!(plain.is_empty());
        let (base, plain) = encoded_variants(&["van1".to_string(), "e2".to_string()]);
        assert_eq!(base, vec!["van1".to_string(), "v2".to_string()]);
        assert_eq!(plain, vec!["41".to_string(), "v2".to_string()]);
    }

    #[test]
    fn parses_every_key_form() {
        assert_eq!(parse_key("ei4_e2"), vec!["ei4", "e2"]);
        assert_eq!(parse_key("e4v2"), vec!["ei4", "e2"]);
        assert_eq!(parse_key("a1"), vec!["a1"]);
        assert_eq!(parse_key("van1"), vec!["van1"]);
        assert_eq!(parse_key("i-retro4__"), vec!["i-retro4"]);
    }
}
