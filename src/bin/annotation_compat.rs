//! Annotation Compatibility CLI
//!
//! Checks annotation compatibility between two versions of a schema document.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use schema_annotation_compat::config::OutputFormat;
use schema_annotation_compat::{
    is_backward_compatible, AnnotationCompatibilityChecker, CheckerConfig, CompatibilityResult,
    DataSchema,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "annotation-compat")]
#[command(about = "Check backward compatibility of schema annotations")]
struct Cli {
    /// Config file to load (optional)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the annotations of two schema versions
    Check {
        /// Older schema (JSON)
        older: PathBuf,
        /// Newer schema (JSON)
        newer: PathBuf,
        /// Annotation namespace to check (repeatable, merged into configured handlers)
        #[arg(short, long = "namespace")]
        namespaces: Vec<String>,
        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the default configuration to a file
    Init {
        /// Output path
        #[arg(short, long, default_value = "annotation-compat.toml")]
        output: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.command {
        Commands::Check { namespaces, .. } => {
            CheckerConfig::load_for_check(cli.config.as_deref(), namespaces)
        }
        Commands::Init { .. } => CheckerConfig::load_from(cli.config.as_deref()),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    match run(cli.command, config) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

/// Returns false when the check should fail the process
fn run(command: Commands, mut config: CheckerConfig) -> anyhow::Result<bool> {
    match command {
        Commands::Check { older, newer, json, .. } => {
            if json {
                config.check.output_format = OutputFormat::Json;
            }

            let older_schema = load_schema(&older)?;
            let newer_schema = load_schema(&newer)?;
            let handlers = config.build_handlers();
            info!(
                older = %older.display(),
                newer = %newer.display(),
                handlers = handlers.len(),
                "checking annotation compatibility"
            );

            let checker = AnnotationCompatibilityChecker::with_declared_properties();
            let results = checker.check(&older_schema, &newer_schema, &handlers)?;
            let compatible = is_backward_compatible(&results);

            match config.check.output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
                OutputFormat::Text => print_text(&older, &newer, &results, compatible),
            }

            Ok(compatible || !config.check.fail_on_incompatible)
        }

        Commands::Init { output } => {
            CheckerConfig::default().save(&output)?;
            println!("✅ Created config file: {}", output);
            Ok(true)
        }
    }
}

fn load_schema(path: &Path) -> anyhow::Result<DataSchema> {
    DataSchema::from_file(path).with_context(|| format!("loading {}", path.display()))
}

fn print_text(older: &Path, newer: &Path, results: &[CompatibilityResult], compatible: bool) {
    println!(
        "🔍 Checking annotation compatibility: {} -> {}",
        older.display(),
        newer.display()
    );
    println!();

    for message in results.iter().flat_map(|r| r.messages()) {
        let marker = if message.is_breaking() { "❌" } else { "✅" };
        println!("{} {}", marker, message.path());
        println!("   └─ {}", message.message());
    }

    println!();
    if compatible {
        println!("✅ All annotation changes are backward compatible");
    } else {
        println!("❌ Incompatible annotation changes detected!");
    }
}
