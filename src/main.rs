//! World-Cup Monte-Carlo CLI.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use std::path::PathBuf;
use wcmc_tournaments::data;
use wcmc_tournaments::report::Report;
use wcmc_tournaments::simulation::{Simulation, StartPoint};
use wcmc_tournaments::{gen_seed, SimulationConfig};

#[derive(Parser)]
#[command(name = "wcmc")]
#[command(about = "Monte-Carlo prediction of the World Cup", long_about = None)]
struct Cli {
    /// Team file: `name abbreviation [rank]` per line
    #[arg(long)]
    teams: PathBuf,

    /// Group file: `label team1 team2 team3 team4` per line
    #[arg(long)]
    groups: Option<PathBuf>,

    /// Resume after a completed stage
    #[arg(long, value_enum, requires = "passed")]
    resume: Option<ResumeStage>,

    /// Teams that passed the completed stage, one per line
    #[arg(long)]
    passed: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the number of trials
    #[arg(long)]
    trials: Option<u64>,

    /// Override the base seed
    #[arg(long, conflicts_with = "random_seed")]
    seed: Option<u64>,

    /// Draw a random base seed
    #[arg(long)]
    random_seed: bool,

    /// Spread the trials over all cores
    #[arg(long)]
    parallel: bool,

    /// Write the full report as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of bracket outcomes to show per depth
    #[arg(long, default_value = "10")]
    top: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ResumeStage {
    AfterGroupStage,
    #[value(name = "after-round-of-16")]
    AfterRoundOf16,
    AfterQuarterFinals,
    AfterSemiFinals,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(trials) = cli.trials {
        config.trials = trials;
    }
    if let Some(seed) = cli.seed {
        config.base_seed = seed;
    }
    if cli.random_seed {
        config.base_seed = gen_seed();
        info!("random base seed {}", config.base_seed);
    }
    config.parallel |= cli.parallel;

    let groups = match cli.resume {
        None => Some(
            cli.groups
                .as_deref()
                .context("a group file is needed to simulate the group stage")?,
        ),
        Some(_) => cli.groups.as_deref(),
    };
    let tournament = data::load_tournament(&cli.teams, groups, config.tie_breaks)?;

    let start = match (cli.resume, &cli.passed) {
        (None, _) => StartPoint::Full,
        (Some(stage), Some(passed)) => {
            let teams = data::load_team_list(passed, tournament.teams())?;
            match stage {
                ResumeStage::AfterGroupStage => StartPoint::AfterGroupStage(teams),
                ResumeStage::AfterRoundOf16 => StartPoint::AfterRoundOf16(teams),
                ResumeStage::AfterQuarterFinals => StartPoint::AfterQuarterFinals(teams),
                ResumeStage::AfterSemiFinals => StartPoint::AfterSemiFinals(teams),
            }
        }
        (Some(_), None) => anyhow::bail!("--resume needs --passed"),
    };

    let simulation = Simulation::new(tournament, start, config)?;
    let tally = simulation.run()?;
    let report = Report::new(&simulation, &tally, cli.top);

    println!("{report}");

    if let Some(path) = &cli.output {
        std::fs::write(path, report.to_json()?)
            .with_context(|| format!("cannot write the report to {}", path.display()))?;
        info!("report written to {}", path.display());
    }

    Ok(())
}
