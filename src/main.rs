mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use scribble_session::{Session, SessionConfig};
use tracing_subscriber::EnvFilter;

use scenario::{Scenario, SceneSummary, apply_step};

/// Replay a scripted diagram editing session with undo/redo and remote peers
#[derive(Parser, Debug)]
#[command(name = "scribble")]
#[command(version, about, long_about = None)]
struct Args {
    /// Scenario script to replay
    #[arg(value_name = "SCENARIO")]
    scenario: PathBuf,

    /// Session config file (defaults to the user config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print one JSON object per step instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scribble=info")))
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => SessionConfig::load(path),
        None => SessionConfig::load_default(),
    }
    .context("Failed to load session config")?;

    let scenario = Scenario::load(&args.scenario)?;
    if let Some(name) = &scenario.name {
        tracing::info!(scenario = %name, steps = scenario.steps.len(), "replaying");
    }

    let mut session = Session::new(&config);
    session.subscribe(|increment| {
        tracing::debug!(
            elements = increment.elements_change.len(),
            app_state = !increment.app_state_change.is_empty(),
            "recorded increment"
        );
    });
    scenario.prepare(&mut session)?;

    for (index, step) in scenario.steps.iter().enumerate() {
        let step_number = index + 1;
        let outcome = apply_step(&mut session, step)
            .with_context(|| format!("Step {step_number} ({}) failed", step.name()))?;
        let summary = SceneSummary::capture(step_number, step.name(), outcome, &session);
        if args.json {
            println!("{}", serde_json::to_string(&summary)?);
        } else {
            println!("{}", summary.render());
        }
    }

    Ok(())
}
