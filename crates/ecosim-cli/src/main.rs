//! Headless runner for the predator/prey simulation.

mod logging;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ecosim_core::{PopulationStats, SimulationConfig, ViabilityRule};
use ecosim_world::{Simulator, StepReport};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ecosim")]
#[command(about = "Predator/prey grid simulation")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run until the step budget is spent or the world stops being viable
    Run {
        #[command(flatten)]
        world: WorldArgs,
        /// Step budget; defaults to the configured max_steps
        #[arg(long)]
        steps: Option<usize>,
        #[arg(long, value_enum)]
        viability: Option<ViabilityArg>,
        /// Include the per-step population history in the summary
        #[arg(long, default_value_t = false)]
        history: bool,
    },
    /// Take single steps and print a report after each one
    Step {
        #[command(flatten)]
        world: WorldArgs,
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
}

#[derive(Args, Debug)]
struct WorldArgs {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    width: Option<i32>,
    #[arg(long)]
    height: Option<i32>,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ViabilityArg {
    Always,
    AnySpecies,
    MultipleSpecies,
    AllSpecies,
    Predators,
}

impl From<ViabilityArg> for ViabilityRule {
    fn from(arg: ViabilityArg) -> Self {
        match arg {
            ViabilityArg::Always => ViabilityRule::Always,
            ViabilityArg::AnySpecies => ViabilityRule::AnySpeciesAlive,
            ViabilityArg::MultipleSpecies => ViabilityRule::MultipleSpecies,
            ViabilityArg::AllSpecies => ViabilityRule::AllSpecies,
            ViabilityArg::Predators => ViabilityRule::PredatorsAlive,
        }
    }
}

#[derive(Serialize)]
struct RunSummary<'a> {
    seed: u64,
    width: i32,
    height: i32,
    steps_taken: usize,
    final_step: u64,
    agents: usize,
    final_stats: &'a PopulationStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    history: Option<&'a [PopulationStats]>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.json_logs)?;

    match cli.command {
        Commands::Run {
            world,
            steps,
            viability,
            history,
        } => {
            let mut config = load_config(&world)?;
            if let Some(rule) = viability {
                config.viability = rule.into();
            }
            let budget = steps.unwrap_or(config.max_steps);
            let mut sim = Simulator::with_config(config).context("invalid configuration")?;

            info!(budget, "Starting simulation");
            let steps_taken = sim.run(budget);

            let summary = RunSummary {
                seed: sim.config().seed,
                width: sim.config().width,
                height: sim.config().height,
                steps_taken,
                final_step: sim.step_count(),
                agents: sim.agent_count(),
                final_stats: sim.current_stats(),
                history: history.then(|| sim.history()),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Step { world, steps } => {
            let config = load_config(&world)?;
            let mut sim = Simulator::with_config(config).context("invalid configuration")?;
            println!("{}", sim.current_stats());
            for _ in 0..steps {
                let report = sim.step();
                print_report(&report, sim.current_stats());
            }
        }
    }

    Ok(())
}

fn load_config(args: &WorldArgs) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    Ok(config)
}

fn print_report(report: &StepReport, stats: &PopulationStats) {
    println!(
        "{stats} | births {} deaths {} agents {}",
        report.births,
        report.total_deaths(),
        report.agents_at_end
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = WorldArgs {
            config: None,
            width: Some(12),
            height: None,
            seed: Some(5),
        };
        let config = load_config(&args).unwrap();
        assert_eq!(config.width, 12);
        assert_eq!(config.height, SimulationConfig::default().height);
        assert_eq!(config.seed, 5);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = WorldArgs {
            config: Some(PathBuf::from("/nonexistent/ecosim.json")),
            width: None,
            height: None,
            seed: None,
        };
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn test_run_arguments_parse() {
        let cli = Cli::try_parse_from([
            "ecosim",
            "run",
            "--width",
            "10",
            "--steps",
            "3",
            "--viability",
            "predators",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                world,
                steps,
                viability,
                ..
            } => {
                assert_eq!(world.width, Some(10));
                assert_eq!(steps, Some(3));
                assert_eq!(
                    ViabilityRule::from(viability.unwrap()),
                    ViabilityRule::PredatorsAlive
                );
            }
            Commands::Step { .. } => panic!("expected run"),
        }
    }
}
