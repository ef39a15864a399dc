use crossterm::style::Stylize;
use rhyme_core::core::finals::scheme_of;
use rhyme_core::core::index::BuildProgress;
use rhyme_core::core::worker::spawn_index_build;
use rhyme_core::persistence::load_dictionaries;
use rhyme_core::{EngineConfig, QueryResult, RhymeEngine, Tier, ToneFilter};
use std::io::{stdin, stdout, Write};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::EnvFilter;

const CUSTOM_BANK_PATH: &str = "custom_bank.bin";
const SHOWN_PER_BUCKET: usize = 30;

struct Args {
    config: Option<PathBuf>,
    dictionaries: Vec<PathBuf>,
}

fn parse_args() -> Option<Args> {
    let mut config = None;
    let mut dictionaries = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            config = Some(PathBuf::from(args.next()?));
        } else {
            dictionaries.push(PathBuf::from(arg));
        }
    }
    if dictionaries.is_empty() {
        return None;
    }
    Some(Args { config, dictionaries })
}

fn main() -> rhyme_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let Some(args) = parse_args() else {
        eprintln!("usage: rhyme_repl [--config engine.json] <dictionary.json>...");
        std::process::exit(2);
    };

    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    let mut engine = RhymeEngine::from_file_or_new(Path::new(CUSTOM_BANK_PATH), config.clone());

    let (raw, report) = load_dictionaries(&args.dictionaries)?;
    if report.skipped_entries + report.skipped_phrases > 0 {
        println!(
            "{}",
            format!("Skipped {} malformed entries and {} phrases.", report.skipped_entries, report.skipped_phrases)
                .yellow()
        );
    }

    let index = spawn_index_build(raw, config).wait(print_progress)?;
    println!();
    let stats = index.stats();
    println!(
        "Indexed {} categories, {} phrases, {} Han characters ({} unique).",
        stats.categories, stats.total_phrases, stats.total_han_chars, stats.unique_han_chars
    );
    engine.install_index(index);

    let mut looseness = 0.5_f32;
    let mut tone_filter = ToneFilter::All;

    println!("{}", "Rhyme lookup. Type a phrase, or 'exit' to save and quit.".bold());
    println!(":l <0..1> looseness | :p all|level|oblique | :add <phrase> | :rm <phrase>");

    loop {
        print!(
            "\n[{} {:?}] > ",
            format!("tier {}", Tier::from_looseness(looseness).level()).cyan(),
            tone_filter
        );
        stdout().flush()?;

        let mut input = String::new();
        if stdin().read_line(&mut input)? == 0 {
            break;
        }
        let cmd = input.trim();

        match cmd {
            "exit" => break,
            "" => {}
            s if s.starts_with(":l ") => match s[3..].trim().parse::<f32>() {
                Ok(v) if (0.0..=1.0).contains(&v) => looseness = v,
                _ => println!("{}", "looseness must be a number in 0..1".red()),
            },
            s if s.starts_with(":p ") => {
                tone_filter = match s[3..].trim() {
                    "all" => ToneFilter::All,
                    "level" => ToneFilter::Level,
                    "oblique" => ToneFilter::Oblique,
                    other => {
                        println!("{}", format!("unknown tone filter '{other}'").red());
                        tone_filter
                    }
                }
            }
            s if s.starts_with(":add ") => {
                if engine.add_custom_phrase(&s[5..]) {
                    println!("added");
                } else {
                    println!("{}", "blank or already in the custom bank".yellow());
                }
            }
            s if s.starts_with(":rm ") => {
                if !engine.remove_custom_phrase(&s[4..]) {
                    println!("{}", "not in the custom bank".yellow());
                }
            }
            phrase => match engine.query_phrase(phrase, looseness) {
                Ok(Some(result)) => {
                    print_family(&mut engine, phrase);
                    print_result(&mut engine, result, tone_filter.at_looseness(looseness));
                }
                Ok(None) => println!("{}", "no rhymable characters".yellow()),
                Err(e) => println!("{}", format!("query failed: {e}").red()),
            },
        }
    }

    println!("\nSaving custom bank...");
    if let Err(e) = engine.save_custom_bank() {
        error!(error = %e, "could not save custom bank");
    } else {
        println!("Custom bank saved to '{}'", CUSTOM_BANK_PATH);
    }
    Ok(())
}

fn print_progress(progress: BuildProgress) {
    match progress {
        BuildProgress::Inserting { done, total } => eprint!("\rindexing {done}/{total}"),
        BuildProgress::Deduplicating { done, total } => eprint!("\rdeduplicating {done}/{total}   "),
        BuildProgress::Finished => eprint!("\rindex ready                    "),
    }
}

fn print_family(engine: &mut RhymeEngine, phrase: &str) {
    let last = phrase.chars().last().and_then(|ch| engine.decode(ch));
    if let Some(info) = last {
        let family = scheme_of(&info.fin).unwrap_or("-");
        println!("{} {}{} ({family})", "rhyme:".dark_grey(), info.fin, info.tone);
    }
}

fn print_result(engine: &mut RhymeEngine, result: QueryResult, filter: ToneFilter) {
    if result.is_empty() {
        println!("{}", "no rhymes found".yellow());
        return;
    }
    if let Some(tail) = result.degraded_tail {
        println!("{}", format!("no full match; showing rhymes for the last {tail} characters").yellow());
    }
    let buckets = [
        ("same length", result.same_length),
        ("one shorter", result.shorter_by_one),
        ("longer", result.longer_lengths),
    ];
    for (label, phrases) in buckets {
        let phrases = engine.filter_by_tone(phrases, filter);
        if phrases.is_empty() {
            continue;
        }
        let shown: Vec<&str> = phrases.iter().take(SHOWN_PER_BUCKET).map(String::as_str).collect();
        println!("{} ({}): {}", label.green().bold(), phrases.len(), shown.join(" "));
    }
}
