//! Velvet CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! velvet-cli migrate
//!
//! # Create the admin account and the starter catalog
//! VELVET_ADMIN_PASSWORD=... velvet-cli seed
//!
//! # Create a user (password read from VELVET_USER_PASSWORD)
//! velvet-cli user create -u alice -e alice@example.com -r admin
//!
//! # Grant an extra role
//! velvet-cli user grant -u alice -r guest
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "velvet-cli")]
#[command(author, version, about = "Velvet CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the admin account and the starter catalog
    Seed,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Role (`admin`, `guest`)
        #[arg(short, long, default_value = "guest")]
        role: String,
    },
    /// Grant a role to an existing user
    Grant {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Role (`admin`, `guest`)
        #[arg(short, long)]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed => commands::seed::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                email,
                role,
            } => {
                commands::user::create(&username, &email, &role).await?;
            }
            UserAction::Grant { username, role } => {
                commands::user::grant(&username, &role).await?;
            }
        },
    }
    Ok(())
}
