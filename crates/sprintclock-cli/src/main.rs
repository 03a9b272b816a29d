use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// Environment variable holding the log filter (e.g. "sprintclock_core=debug").
const LOG_ENV: &str = "SPRINTCLOCK_LOG";

#[derive(Parser)]
#[command(name = "sprintclock", version, about = "Sprint timer with cooldown and chaos tracking")]
struct Cli {
    /// Session key to load and save state under
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Accumulated time per category
    Stats(commands::stats::StatsArgs),
    /// Live one-line view, refreshed every display.refresh_ms
    Watch(commands::watch::WatchArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Persisted state and session key
    Sync {
        #[command(subcommand)]
        action: commands::sync::SyncAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let user = cli.user.as_deref();
    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action, user),
        Commands::Stats(args) => commands::stats::run(args, user),
        Commands::Watch(args) => commands::watch::run(args, user),
        Commands::Config { action } => commands::config::run(action),
        Commands::Sync { action } => commands::sync::run(action, user),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
