//! Fact CLI - Command-line interface
//!
//! Usage:
//!   fact extract <file> [--language de] [--format json|text] [--max-facts N] [--min-confidence X]
//!   fact labels <language>
//!   fact resolve <names...>

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use fact_core::{AppConfig, LoggingConfig, ParsedDocument};
use fact_extractor::{get_table, EntityEquivalenceMapper, ExtractionSession, Role};

#[derive(Parser)]
#[command(name = "fact")]
#[command(about = "Fact triple extraction from dependency parses")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract triples from a parsed document (JSON)
    Extract {
        /// Path to the parsed document
        file: PathBuf,

        /// Language of the label table (overrides configuration)
        #[arg(short, long)]
        language: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Maximum number of facts to print
        #[arg(long)]
        max_facts: Option<usize>,

        /// Drop triples scored below this (0.0 - 1.0)
        #[arg(long)]
        min_confidence: Option<f32>,
    },
    /// Show the label table of a language
    Labels {
        /// Language tag (en, de, ...)
        language: String,
    },
    /// Resolve entity names through the static equivalence table
    Resolve {
        /// Names to resolve
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    init_logging(&config.logging);

    match cli.command {
        Commands::Extract {
            file,
            language,
            format,
            max_facts,
            min_confidence,
        } => {
            if let Some(threshold) = min_confidence {
                anyhow::ensure!(
                    (0.0..=1.0).contains(&threshold),
                    "--min-confidence must be between 0.0 and 1.0"
                );
                config.extraction.min_confidence = threshold;
            }
            extract(config, &file, language, format, max_facts)?
        }
        Commands::Labels { language } => labels(&language)?,
        Commands::Resolve { names } => {
            let mapper = EntityEquivalenceMapper::from_config(&config.equivalence);
            for name in names {
                println!("{} -> {}", name, mapper.resolve(&name));
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    Ok(config.with_env_override()?)
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("fact_extractor={0},fact_cli={0}", config.level))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    if config.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn extract(
    mut config: AppConfig,
    file: &Path,
    language: Option<String>,
    format: OutputFormat,
    max_facts: Option<usize>,
) -> anyhow::Result<()> {
    if language.is_some() {
        config.extraction.language = language;
    }

    tracing::debug!(path = %file.display(), "Loading parsed document");
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let document = ParsedDocument::from_json(&content)?;

    let mut session = ExtractionSession::new(&config)?;
    let mut analysis = session.run(&document);

    match format {
        OutputFormat::Json => {
            if let Some(max) = max_facts {
                analysis.triples.truncate(max);
            }
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        OutputFormat::Text => {
            println!("{}", analysis.to_llm_context(max_facts));
            println!();
            println!(
                "Processed {} sentences in {} ms ({:.1}% with facts), {} aliases discovered",
                analysis.stats.sentences_processed,
                analysis.duration_ms(),
                analysis.success_rate(),
                analysis.report.dynamic_count,
            );
        }
    }

    Ok(())
}

fn labels(language: &str) -> anyhow::Result<()> {
    let table = get_table(language)?;

    println!("Label table: {}", table.language());
    for role in Role::ALL {
        println!("  {:<22} {}", role.as_str(), table.labels(role).join(", "));
    }

    println!("Linking verbs:");
    for (lemma, relation) in table.linking_verbs() {
        println!("  {lemma} -> {relation}");
    }

    let modals: Vec<String> = table
        .modal_verbs()
        .map(|(lemma, prefix)| format!("{lemma} -> {prefix}"))
        .collect();
    if !modals.is_empty() {
        println!("Modal verbs:");
        for modal in modals {
            println!("  {modal}");
        }
    }

    Ok(())
}
