mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{actuator::ActuatorSubcommand, command::CommandSubcommand, schedule::ScheduleSubcommand};
use std::path::PathBuf;
use verdant_core::config::Config;

#[derive(Parser)]
#[command(
    name = "verdant",
    about = "Greenhouse actuator control — schedules, commands, and the reconciliation loop",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true, env = "VERDANT_CONFIG", default_value = "verdant.yaml")]
    config: PathBuf,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the reconciliation loop and run until Ctrl-C
    Run {
        /// Seconds between ticks (overrides the config)
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Run exactly one reconciliation pass and print the summary
    Tick,

    /// Manage actuators
    Actuator {
        #[command(subcommand)]
        subcommand: ActuatorSubcommand,
    },

    /// Manage schedule windows
    Schedule {
        #[command(subcommand)]
        subcommand: ScheduleSubcommand,
    },

    /// Issue and inspect actuator commands
    Command {
        #[command(subcommand)]
        subcommand: CommandSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let result = Config::load(&cli.config)
        .map_err(anyhow::Error::from)
        .and_then(|config| match cli.command {
            Commands::Run { interval_secs } => cmd::run::run_loop(&config, interval_secs),
            Commands::Tick => cmd::run::run_once(&config, cli.json),
            Commands::Actuator { subcommand } => cmd::actuator::run(&config, subcommand, cli.json),
            Commands::Schedule { subcommand } => cmd::schedule::run(&config, subcommand, cli.json),
            Commands::Command { subcommand } => cmd::command::run(&config, subcommand, cli.json),
        });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
