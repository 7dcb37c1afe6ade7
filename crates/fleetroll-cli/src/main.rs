//! fleetroll — zero-downtime rolling replacement of auto-scaling group
//! instances.
//!
//! # Usage
//!
//! ```text
//! fleetroll simulate --group web --instances 3
//! fleetroll event --group web --channel roll-topic > event.json
//! fleetroll invoke --event event.json --fleet fleet.toml
//! fleetroll init-config
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fleetroll_fleet::SimGroup;
use fleetroll_state::WorkflowState;

mod commands;
mod config;
mod fixture;

use config::{FleetrollConfig, LogFormat, LoggingConfig, DEFAULT_LOG_FILTER};

#[derive(Parser)]
#[command(
    name = "fleetroll",
    about = "fleetroll — zero-downtime rolling replacement of auto-scaling groups",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to fleetroll.toml (default: ./fleetroll.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format; overrides [logging].format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

/// Knobs carried in the first message of a workflow.
#[derive(clap::Args, Debug, Clone)]
struct WorkflowArgs {
    /// Target auto-scaling group.
    #[arg(short, long)]
    group: String,

    /// Log every mutating action instead of performing it.
    #[arg(long)]
    dry_run: bool,

    /// Headroom over desired capacity, in percent.
    #[arg(long)]
    growth_percent: Option<u32>,

    /// Seconds to wait between steps.
    #[arg(long)]
    pause_seconds: Option<u64>,

    /// Iteration budget per original instance.
    #[arg(long)]
    iters_per_instance: Option<u32>,
}

impl WorkflowArgs {
    fn into_state(self) -> WorkflowState {
        let mut state = WorkflowState::new(&self.group);
        state.dry_run = self.dry_run;
        state.growth_percent = self.growth_percent;
        state.pause_seconds = self.pause_seconds;
        state.iters_per_instance = self.iters_per_instance;
        state
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run one invocation against a fleet fixture and print the result.
    Invoke {
        /// Trigger event (JSON).
        #[arg(short, long)]
        event: PathBuf,
        /// Fleet fixture (TOML).
        #[arg(short, long)]
        fleet: PathBuf,
    },
    /// Drive a whole rolling update against an in-memory fleet.
    Simulate {
        #[command(flatten)]
        workflow: WorkflowArgs,
        /// Instances in the simulated group.
        #[arg(long, default_value = "3")]
        instances: u32,
        /// Max size of the simulated group (default: --instances).
        #[arg(long)]
        max_size: Option<u32>,
        /// Describe calls before a new instance reports healthy.
        #[arg(long, default_value = "1")]
        warmup: u32,
        /// Continuation channel.
        #[arg(long, default_value = "fleetroll")]
        channel: String,
    },
    /// Print the trigger event that starts a rolling update.
    Event {
        #[command(flatten)]
        workflow: WorkflowArgs,
        /// Continuation channel.
        #[arg(long, default_value = "fleetroll")]
        channel: String,
    },
    /// Generate a fleetroll.toml scaffold.
    InitConfig {
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
}

fn init_tracing(logging: &LoggingConfig, format: Option<LogFormat>) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(logging.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER))?,
    };

    match format.or(logging.format).unwrap_or_default() {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = FleetrollConfig::load(cli.config.as_deref())?;
    init_tracing(&config.logging, cli.log_format)?;
    let defaults = config.defaults.resolve();

    let code = match cli.command {
        Commands::Invoke { event, fleet } => {
            commands::invoke::invoke(&event, &fleet, defaults).await?
        }
        Commands::Simulate {
            workflow,
            instances,
            max_size,
            warmup,
            channel,
        } => {
            let group = SimGroup::new(&workflow.group, instances)
                .with_max_size(max_size.unwrap_or(instances))
                .with_warmup(warmup);
            let sim = commands::simulate::Simulation {
                group,
                state: workflow.into_state(),
                channel,
            };
            commands::simulate::simulate(sim, defaults).await?
        }
        Commands::Event { workflow, channel } => {
            commands::config::event(&workflow.into_state(), &channel)?;
            0
        }
        Commands::InitConfig { path } => {
            commands::config::init(&path)?;
            0
        }
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
