//! CLI frontend for the Rollkeeper dice engine.

mod commands;

use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use commands::Session;
use commands::roll::RollArgs;

#[derive(Parser)]
#[command(
    name = "rk",
    about = "Rollkeeper: dice rolls with memory",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    session: Session,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Roll a dice expression such as 1d20+5 or e 3d6
    Roll(RollArgs),

    /// Roll a death save
    Death {
        /// User making the save
        #[arg(short, long)]
        user: String,
    },

    /// Inspect or rewrite the state file
    State {
        #[command(subcommand)]
        action: StateAction,
    },
}

#[derive(Subcommand)]
enum StateAction {
    /// Show one user's state
    Show {
        /// User to show
        #[arg(short, long)]
        user: String,
    },

    /// Load the state file and write it back unchanged
    Resave,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Commands::Roll(args) => commands::roll::run(&cli.session, &args),
        Commands::Death { user } => commands::death::run(&cli.session, &user),
        Commands::State { action } => match action {
            StateAction::Show { user } => commands::state::show(&cli.session, &user),
            StateAction::Resave => commands::state::resave(&cli.session),
        },
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
