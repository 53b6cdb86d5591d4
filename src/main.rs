use anyhow::{bail, Context};
use clap::{Arg, Command};
use log::LevelFilter;
use serde::Serialize;
use spamlens::{AppConfig, EmailRecord, SpamScorer};
use std::fs;
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let matches = Command::new("spamlens")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Heuristic and Bayesian spam scoring for parsed email records")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (YAML)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("email")
                .long("email")
                .value_name("FILE")
                .help("Score one email record (JSON)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("batch")
                .long("batch")
                .value_name("FILE")
                .help("Score a JSON array of email records")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("datasets")
                .long("datasets")
                .value_name("DIR")
                .help("Directory of additional language datasets")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("threshold")
                .long("threshold")
                .value_name("SCORE")
                .help("Override the spam threshold")
                .value_parser(clap::value_parser!(f64))
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Include extracted URLs, addresses, language and text statistics")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-rules")
                .long("list-rules")
                .help("List every analyzer rule with its base score")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    // Initialize logger based on verbose flag
    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => match AppConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading configuration: {e}");
                process::exit(1);
            }
        },
        None => AppConfig::default(),
    };

    if let Some(dir) = matches.get_one::<String>("datasets") {
        config.datasets_dir = Some(dir.clone());
    }
    if let Some(threshold) = matches.get_one::<f64>("threshold") {
        config.scoring.spam_threshold = *threshold;
    }
    if matches.get_flag("debug") {
        config.scoring.enable_debug = true;
    }

    let scorer = match SpamScorer::from_app_config(&config) {
        Ok(scorer) => scorer,
        Err(e) => {
            eprintln!("Error initializing scorer: {e}");
            process::exit(1);
        }
    };
    log::debug!("Datasets available: {}", scorer.languages().join(", "));

    if matches.get_flag("list-rules") {
        list_rules(&scorer);
        return;
    }

    let outcome = if let Some(path) = matches.get_one::<String>("email") {
        score_email_file(&scorer, path)
    } else if let Some(path) = matches.get_one::<String>("batch") {
        score_batch_file(scorer, path).await
    } else {
        eprintln!("Nothing to do: pass --email FILE or --batch FILE (see --help)");
        process::exit(1);
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn generate_default_config(path: &str) {
    match fs::write(path, AppConfig::default_yaml()) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

fn list_rules(scorer: &SpamScorer) {
    println!("📋 Analyzer rules");
    println!("═══════════════════════════════════════");
    for analyzer in scorer.analyzers() {
        let catalog = analyzer.catalog();
        println!();
        println!("{} ({} rules)", analyzer.name(), catalog.len());
        for rule in catalog.rules() {
            println!(
                "  {:<28} {:>5.1}  {:<14} {}",
                rule.name,
                rule.score,
                format!("{:?}", rule.category),
                rule.description
            );
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{rendered}");
    Ok(())
}

fn score_email_file(scorer: &SpamScorer, path: &str) -> anyhow::Result<()> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    let email = EmailRecord::from_json_str(&content)
        .with_context(|| format!("Failed to decode email record from {path}"))?;
    let result = scorer.analyze(&email);
    log::info!(
        "{}: score {:.2} ({})",
        path,
        result.score,
        result.classification
    );
    print_json(&result)
}

async fn score_batch_file(scorer: SpamScorer, path: &str) -> anyhow::Result<()> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    let value: serde_json::Value =
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {path}"))?;
    let serde_json::Value::Array(items) = value else {
        bail!("{path} must contain a JSON array of email records");
    };

    let report = SpamScorer::analyze_batch_concurrent(Arc::new(scorer), items).await;
    log::info!(
        "Scored {} records: {} spam, {} probable spam, {} probable ham, {} ham, {} errors",
        report.summary.total,
        report.summary.spam,
        report.summary.probable_spam,
        report.summary.probable_ham,
        report.summary.ham,
        report.summary.errors
    );
    print_json(&report)
}
