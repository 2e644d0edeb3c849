use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use autobattle_core::app::{AutomationConfig, ControllerBuilder};
use autobattle_core::domain::{AutomationState, Objective, Strategy, Team};
use autobattle_core::impls::{SimulatedDevice, SimulationScript};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Card battle automation driver", version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a session against the simulated device.
    Simulate(SimulateArgs),
    /// Validate a config file and print the effective values.
    CheckConfig {
        #[arg(long)]
        config: PathBuf,
    },
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    /// TOML file with session options; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides `max_battles` from the config.
    #[arg(long)]
    battles: Option<i64>,
    /// Battles before the simulated AP runs out.
    #[arg(long, default_value_t = 3)]
    ap: u32,
    #[arg(long, default_value_t = 3)]
    turns: u32,
    /// Every n-th simulated battle is lost.
    #[arg(long)]
    lose_every: Option<u32>,
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Multiplier on gesture delays; 0 makes the device instant.
    #[arg(long, default_value_t = 0.05)]
    time_scale: f64,
    #[arg(long, value_enum, default_value_t = ObjectiveArg::Farming)]
    objective: ObjectiveArg,
    #[arg(long, value_enum, default_value_t = StrategyArg::FullTurn)]
    strategy: StrategyArg,
    #[arg(long, default_value = "simulated party")]
    team: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ObjectiveArg {
    Farming,
    Story,
    Event,
    Challenge,
    Daily,
}

impl From<ObjectiveArg> for Objective {
    fn from(arg: ObjectiveArg) -> Self {
        match arg {
            ObjectiveArg::Farming => Objective::Farming,
            ObjectiveArg::Story => Objective::Story,
            ObjectiveArg::Event => Objective::Event,
            ObjectiveArg::Challenge => Objective::Challenge,
            ObjectiveArg::Daily => Objective::Daily,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    CardsOnly,
    FullTurn,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::CardsOnly => Strategy::CardsOnly,
            StrategyArg::FullTurn => Strategy::FullTurn,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match args.command {
        Command::Simulate(simulate) => run_simulation(simulate).await,
        Command::CheckConfig { config } => {
            let config = AutomationConfig::load(&config)
                .with_context(|| format!("checking {}", config.display()))?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn run_simulation(args: SimulateArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => AutomationConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AutomationConfig::default(),
    };
    if let Some(battles) = args.battles {
        config.max_battles = battles;
    }

    let device = Arc::new(SimulatedDevice::new(SimulationScript {
        turns_per_battle: args.turns,
        ap_battles: Some(args.ap),
        lose_every: args.lose_every,
        seed: args.seed,
        time_scale: args.time_scale,
    }));
    let controller = ControllerBuilder::new()
        .capture(device.clone())
        .perception(device.clone())
        .actuation(device.clone())
        .config(config)
        .build()
        .context("building controller")?;

    controller.initialize().await?;

    let team = Team::new(args.team)
        .with_objective(args.objective.into())
        .with_strategy(args.strategy.into());
    let session_id = controller.start(team).await?;
    tracing::info!(%session_id, "simulation running, ctrl-c to stop");

    tokio::select! {
        state = controller.wait_for_state(|s| s.is_terminal()) => {
            tracing::info!(%state, "session ended");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("waiting for ctrl-c")?;
            tracing::info!("interrupted");
        }
    }

    let status = controller.status().await;
    println!("{}", status.to_json()?);
    println!(
        "device: {} battles finished, {} taps",
        device.battles_finished(),
        device.taps()
    );

    let ended_in_error = status.state == AutomationState::Error;
    controller.stop().await?;

    if ended_in_error {
        anyhow::bail!("session ended in error after {} failed cycles", status.stats.errors_encountered);
    }
    Ok(())
}
