// Integration tests for dictionary loading, background builds and the custom bank

use rhyme_core::core::converter::TableRomanizer;
use rhyme_core::core::index::BuildProgress;
use rhyme_core::core::worker::spawn_index_build;
use rhyme_core::custom::CustomBank;
use rhyme_core::persistence::{load_custom_bank, load_dictionaries, save_custom_bank};
use rhyme_core::{EngineConfig, RhymeEngine};
use std::fs;

const PART_ONE: &str = r#"{
    "un1_eng1": ["春风", "春风"],
    "en1_ong1": ["深冬", 7],
    "broken": "not a list"
}"#;

const PART_TWO: &str = r#"{
    "k1a1": ["吞风"],
    "eng1": ["风"]
}"#;

#[test]
fn test_partial_sources_build_one_index() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("dict_part_1.json");
    let second = dir.path().join("dict_part_2.json");
    fs::write(&first, PART_ONE).unwrap();
    fs::write(&second, PART_TWO).unwrap();

    let (raw, report) = load_dictionaries(&[&first, &second]).unwrap();
    assert_eq!(report.accepted_keys, 4);
    assert_eq!(report.skipped_entries, 1);
    assert_eq!(report.skipped_phrases, 1);

    let stats = raw.stats();
    assert_eq!(stats.categories, 4);
    assert_eq!(stats.total_phrases, 4);
    assert_eq!(stats.unique_han_chars, 5);

    let config = EngineConfig { build_batch_size: 1, ..Default::default() };
    let mut progress = Vec::new();
    let index = spawn_index_build(raw, config.clone()).wait(|p| progress.push(p)).unwrap();
    assert!(progress.iter().any(|p| matches!(p, BuildProgress::Inserting { .. })));
    assert!(matches!(progress.last(), Some(BuildProgress::Deduplicating { done, total }) if done == total));

    // The encoded key and the raw key name the same suffix.
    assert_eq!(index.lookup("k1a1", 2), vec!["春风", "吞风"]);

    let readings = TableRomanizer::from_pairs([('春', "chun1"), ('风', "feng1"), ('吞', "tun1")]);
    let mut engine = RhymeEngine::with_romanizer(readings, config);
    engine.install_index(index);
    let result = engine.query_phrase("春风", 0.0).unwrap().unwrap();
    assert_eq!(result.same_length, vec!["春风", "吞风"]);
    assert_eq!(result.shorter_by_one, vec!["风"]);
}

#[test]
fn test_custom_bank_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom_bank.bin");

    let mut engine = RhymeEngine::from_file_or_new(&path, EngineConfig::default());
    assert!(engine.add_custom_phrase("  程序员 "));
    assert!(!engine.add_custom_phrase("程序员"));
    engine.save_custom_bank().unwrap();

    let bank = load_custom_bank(&path).unwrap();
    assert_eq!(bank.phrases(), ["程序员".to_string()]);

    let reopened = RhymeEngine::from_file_or_new(&path, EngineConfig::default());
    assert_eq!(reopened.custom_bank(), &bank);
}

#[test]
fn test_saving_overwrites_previous_bank() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom_bank.bin");

    let first: CustomBank = vec!["北京".to_string()].into_iter().collect();
    let second: CustomBank = vec!["上海".to_string(), "天津".to_string()].into_iter().collect();
    save_custom_bank(&first, &path).unwrap();
    save_custom_bank(&second, &path).unwrap();

    assert_eq!(load_custom_bank(&path).unwrap(), second);
}

#[test]
fn test_config_file_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.json");
    fs::write(&path, r#"{"max_query_keys": 16, "prefilter": {"enabled": false}}"#).unwrap();

    let config = EngineConfig::from_json_file(&path).unwrap();
    assert_eq!(config.max_query_keys, 16);
    assert!(!config.prefilter.enabled);
    assert_eq!(config.build_batch_size, EngineConfig::default().build_batch_size);
}
