use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod common;

#[derive(Parser)]
#[command(name = "alive-cli", version, about = "Alive 28-day challenge CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the task card for a challenge day
    Prompt(commands::prompt::PromptArgs),
    /// Submit today's check-in
    Checkin(commands::checkin::CheckinArgs),
    /// Show derived progress for a participant
    Progress(commands::progress::ProgressArgs),
    /// Build a weekly or final report
    Report(commands::report::ReportArgs),
    /// Confirm external transactions and reward mints
    Confirm {
        #[command(subcommand)]
        action: commands::confirm::ConfirmAction,
    },
    /// Create or update a participant profile
    Profile(commands::profile::ProfileArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Prompt(args) => commands::prompt::run(args),
        Commands::Checkin(args) => commands::checkin::run(args).await,
        Commands::Progress(args) => commands::progress::run(args),
        Commands::Report(args) => commands::report::run(args).await,
        Commands::Confirm { action } => commands::confirm::run(action),
        Commands::Profile(args) => commands::profile::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
