//! Attune CLI - JSON in, JSON out.
//!
//! Each subcommand reads one JSON document from a file (or stdin for `-`),
//! runs it through [`attune_core`], and prints the result to stdout. Logs go
//! to stderr so stdout stays machine readable.
//!
//! ```text
//! attune friction <metrics.json>
//! attune decide <context.json> [--seed N]
//! attune orchestrate <scenario.json>
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use attune_core::{Attune, AttuneBuilder};
use attune_types::{
    DecisionContext, EmotionVector, FrictionMetrics, FrictionScore, OrchestrationResult, Policy,
    Settings, SmartDevice, UserId,
};

#[derive(Parser)]
#[command(name = "attune")]
#[command(about = "Friction scoring, decision collapse and device orchestration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score friction metrics
    Friction {
        /// Metrics JSON file, or - for stdin
        input: PathBuf,
    },
    /// Collapse a decision context into an action
    Decide {
        /// Decision context JSON file, or - for stdin
        input: PathBuf,
        /// Seed the collapse engine for a reproducible result
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Register devices and policies, orchestrate once and report history
    Orchestrate {
        /// Scenario JSON file, or - for stdin
        input: PathBuf,
    },
}

/// Everything one orchestration run needs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Scenario {
    user_id: UserId,
    #[serde(default)]
    devices: Vec<SmartDevice>,
    #[serde(default)]
    policies: Vec<Policy>,
    #[serde(default)]
    emotion_vector: EmotionVector,
    #[serde(default)]
    friction_score: FrictionScore,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScenarioReport {
    results: Vec<OrchestrationResult>,
    devices: Vec<SmartDevice>,
    history: Vec<OrchestrationResult>,
}

fn init_tracing(settings: &Settings) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new(Settings::DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read stdin")?;
        return Ok(content);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn parse_input<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let content = read_input(path)?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{rendered}");
    Ok(())
}

async fn run_scenario(attune: &Attune, scenario: Scenario) -> Result<ScenarioReport> {
    for device in scenario.devices {
        attune.register_device(device);
    }
    for policy in scenario.policies {
        let name = policy.policy_name.clone();
        attune
            .create_policy(policy)
            .with_context(|| format!("Failed to create policy {name:?}"))?;
    }

    let results = attune
        .orchestrate(
            &scenario.user_id,
            &scenario.emotion_vector,
            scenario.friction_score,
        )
        .await;
    Ok(ScenarioReport {
        results,
        devices: attune.get_devices(&scenario.user_id),
        history: attune.get_history(&scenario.user_id, None),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = attune_config::load_settings().context("Failed to load configuration")?;
    init_tracing(&settings);

    match cli.command {
        Commands::Friction { input } => {
            let metrics: FrictionMetrics = parse_input(&input)?;
            let attune = Attune::from_settings(&settings);
            print_json(&attune.calculate_friction(&metrics))
        }
        Commands::Decide { input, seed } => {
            let context: DecisionContext = parse_input(&input)?;
            let mut builder = AttuneBuilder::from_settings(&settings);
            if let Some(seed) = seed {
                builder = builder.seed(seed);
            }
            print_json(&builder.build().decide(&context))
        }
        Commands::Orchestrate { input } => {
            let scenario: Scenario = parse_input(&input)?;
            let attune = Attune::from_settings(&settings);
            let report = run_scenario(&attune, scenario).await?;
            print_json(&report)
        }
    }
}
