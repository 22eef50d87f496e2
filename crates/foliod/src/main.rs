//! foliod: the Folio daemon.
//!
//! Single binary that assembles the collection engine:
//! - Document store (redb)
//! - Blob store (filesystem)
//! - Collection registry + record dispatcher
//! - REST API
//!
//! # Usage
//!
//! ```text
//! foliod init --dir /var/lib/folio
//! foliod hash-password 'correct horse'
//! foliod serve --config /var/lib/folio/folio.toml
//! ```

mod daemon;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "foliod", about = "Folio collection engine daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the REST API.
    Serve {
        /// Configuration file.
        #[arg(long, default_value = "folio.toml")]
        config: PathBuf,

        /// Override `server.listen`.
        #[arg(long)]
        listen: Option<String>,

        /// Keep documents and blobs in memory; nothing survives a restart.
        #[arg(long)]
        in_memory: bool,
    },

    /// Compare collection definitions with the physical collections and
    /// print the drift as JSON.
    Reconcile {
        #[arg(long, default_value = "folio.toml")]
        config: PathBuf,
    },

    /// Print an argon2 hash of a password, for `auth.login_hash`.
    HashPassword { password: String },

    /// Write a starter folio.toml.
    Init {
        /// Data directory the generated configuration points at.
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Overwrite an existing folio.toml.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Command::Serve {
            config,
            listen,
            in_memory,
        } => daemon::serve(&config, listen, in_memory).await,
        Command::Reconcile { config } => daemon::reconcile(&config).await,
        Command::HashPassword { password } => {
            println!("{}", folio_api::hash_password(&password)?);
            Ok(())
        }
        Command::Init { dir, force } => daemon::init(&dir, force),
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,foliod=debug,folio=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
