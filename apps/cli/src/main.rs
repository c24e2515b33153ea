//! Verdict CLI - evaluate YAML rule documents from the command line

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use verdict_engine::{Engine, EngineConfig, Value};

#[derive(Parser)]
#[command(name = "verdict", about = "YAML rules engine for business decisioning", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate a rule document against an input map
    Eval {
        /// Path to the YAML rule document
        #[arg(long)]
        rule: PathBuf,
        /// Path to a JSON object of input values
        #[arg(long)]
        input: Option<PathBuf>,
        /// Path to a JSON object of constant values (served through an
        /// in-memory constant provider)
        #[arg(long)]
        constants: Option<PathBuf>,
        /// Pretty-print the result envelope
        #[arg(long)]
        pretty: bool,
    },
    /// Parse a rule document and report validation findings without
    /// evaluating it
    Check {
        /// Path to the YAML rule document
        rule: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Eval {
            rule,
            input,
            constants,
            pretty,
        } => eval(rule, input, constants, pretty).await,
        Command::Check { rule } => check(rule),
    }
}

async fn eval(
    rule: PathBuf,
    input: Option<PathBuf>,
    constants: Option<PathBuf>,
    pretty: bool,
) -> anyhow::Result<()> {
    let yaml_text = std::fs::read_to_string(&rule)
        .with_context(|| format!("failed to read rule document {}", rule.display()))?;
    let inputs = input.map(read_value_map).transpose()?.unwrap_or_default();

    let mut config = EngineConfig::default();
    if let Some(path) = constants {
        let values = read_value_map(path)?;
        config = config.with_constant_provider(Arc::new(
            verdict_engine::providers::InMemoryConstantProvider::new(values),
        ));
    }

    let engine = Engine::new(config);
    let result = engine.evaluate(&yaml_text, &inputs).await;

    let rendered = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", rendered);

    if result.success {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

fn check(rule: PathBuf) -> anyhow::Result<()> {
    let yaml_text = std::fs::read_to_string(&rule)
        .with_context(|| format!("failed to read rule document {}", rule.display()))?;

    match verdict_engine::RuleDocument::parse(&yaml_text) {
        Ok(document) => {
            if document.diagnostics.is_empty() {
                println!("{}: ok", document.name);
            } else {
                println!("{}: {} finding(s)", document.name, document.diagnostics.len());
                for diagnostic in &document.diagnostics {
                    println!("  {}", diagnostic);
                }
            }
            Ok(())
        }
        Err(error) => {
            eprintln!("{}", error);
            std::process::exit(1);
        }
    }
}

fn read_value_map(path: PathBuf) -> anyhow::Result<BTreeMap<String, Value>> {
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    match Value::from_json(json) {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("{} must contain a JSON object", path.display()),
    }
}
