// File: src/persistence.rs
use crate::core::dictionary::{LoadReport, RawDictionary};
use crate::custom::CustomBank;
use crate::error::Result;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Reads one JSON dictionary source, skipping malformed entries.
pub fn load_dictionary(path: &Path) -> Result<(RawDictionary, LoadReport)> {
    let reader = BufReader::new(File::open(path)?);
    let value: Value = serde_json::from_reader(reader)?;
    let (dict, report) = RawDictionary::from_value(&value)?;
    info!(
        path = %path.display(),
        keys = report.accepted_keys,
        skipped_entries = report.skipped_entries,
        skipped_phrases = report.skipped_phrases,
        "dictionary source loaded"
    );
    Ok((dict, report))
}

/// Loads and merges several partial sources, in order.
pub fn load_dictionaries<P: AsRef<Path>>(paths: &[P]) -> Result<(RawDictionary, LoadReport)> {
    let mut merged = RawDictionary::new();
    let mut report = LoadReport::default();
    for path in paths {
        let (dict, part) = load_dictionary(path.as_ref())?;
        merged.merge(dict);
        report.absorb(part);
    }
    Ok((merged, report))
}

/// Writes the custom bank through a temp file and an atomic rename.
pub fn save_custom_bank(bank: &CustomBank, path: &Path) -> Result<()> {
    let parent_dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent_dir)?;

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    let mut writer = BufWriter::new(&temp_file);
    bincode::serialize_into(&mut writer, bank)?;
    writer.flush()?;
    drop(writer);
    temp_file.persist(path)?;
    Ok(())
}

pub fn load_custom_bank(path: &Path) -> Result<CustomBank> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_sources_merge() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("part_1.json");
        let second = dir.path().join("part_2.json");
        File::create(&first).unwrap().write_all(r#"{"a1": ["花"], "bad": 3}"#.as_bytes()).unwrap();
        File::create(&second).unwrap().write_all(r#"{"a1": ["家"], "i4": ["地", null]}"#.as_bytes()).unwrap();

        let (dict, report) = load_dictionaries(&[first, second]).unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(report, LoadReport { accepted_keys: 3, skipped_entries: 1, skipped_phrases: 1 });
    }

    #[test]
    fn custom_bank_round_trips_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("custom_bank.bin");
        let bank: CustomBank = vec!["北京".to_string(), "程序员".to_string()].into_iter().collect();
        save_custom_bank(&bank, &path).unwrap();
        assert_eq!(load_custom_bank(&path).unwrap(), bank);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_dictionary(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, crate::error::RhymeError::Io(_)));
    }
}
