//! StampLink CLI - ledger queries, stamp commits, and member-device hosting.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;

use commands::{add, checkpoints, code, history, host, init, list, member, resolve, session};
use context::Context;

#[derive(Parser)]
#[command(name = "stamplink")]
#[command(about = "StampLink stamp card ledger and peer sync CLI")]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Use an in-memory ledger seeded from a JSON list of members
    #[arg(long, global = true, value_name = "SEED")]
    memory: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a settings file with every default filled in
    Init {
        /// Where to write the file
        path: PathBuf,
        /// Ledger endpoint to record
        #[arg(long)]
        ledger_url: Option<String>,
    },
    /// Show one member and their progress
    Member {
        /// Member id
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List every member
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a member's stamp history
    History {
        /// Member id
        id: String,
        /// Only entries of this type (add, redeem, voucher_earned, voucher_redeemed)
        #[arg(long = "type")]
        kind: Option<String>,
        /// Only entries at or after this time (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add stamps to a member's card
    Add {
        /// Member id
        id: String,
        /// Stamps to add
        #[arg(long, default_value_t = 1)]
        count: u32,
        /// Peer session to notify afterwards
        #[arg(long)]
        peer: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve a scanned code to a member
    Resolve {
        /// Raw code contents
        code: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the code a member device would display
    Code {
        /// Member id
        id: String,
        /// Peer session to embed
        #[arg(long)]
        peer: Option<String>,
    },
    /// Show or replace the reward checkpoints
    Checkpoints {
        #[command(subcommand)]
        action: CheckpointAction,
    },
    /// Register a new member
    Register {
        /// Display name
        #[arg(long)]
        name: String,
        /// Phone number
        #[arg(long)]
        phone: String,
        /// Birth date, YYYY-MM-DD
        #[arg(long)]
        birth_date: String,
        /// Contact email
        #[arg(long, default_value = "")]
        email: String,
        /// Postal address
        #[arg(long, default_value = "")]
        address: String,
    },
    /// Look up a member by phone number and birth date
    Login {
        /// Phone number
        #[arg(long)]
        phone: String,
        /// Birth date, YYYY-MM-DD
        #[arg(long)]
        birth_date: String,
    },
    /// Run a member device: listen for peer messages and keep the card in sync
    Host {
        /// Member id
        id: String,
    },
}

#[derive(Subcommand)]
enum CheckpointAction {
    /// Print the current configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the configuration with the contents of a JSON file
    Save {
        /// JSON file holding `maxStamps` and `checkpoints`
        file: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Commands::Init { path, ledger_url } = &cli.command {
        return init::run(path, ledger_url.clone());
    }

    let ctx = Context::open(cli.config.as_deref(), cli.memory.as_deref())?;
    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Member { id, json } => member::run(&ctx, id, json).await,
        Commands::List { json } => list::run(&ctx, json).await,
        Commands::History {
            id,
            kind,
            since,
            json,
        } => history::run(&ctx, id, kind, since, json).await,
        Commands::Add {
            id,
            count,
            peer,
            json,
        } => add::run(&ctx, id, count, peer, json).await,
        Commands::Resolve { code, json } => resolve::run(&ctx, code, json).await,
        Commands::Code { id, peer } => code::run(&ctx, id, peer).await,
        Commands::Checkpoints { action } => match action {
            CheckpointAction::Show { json } => checkpoints::show(&ctx, json).await,
            CheckpointAction::Save { file } => checkpoints::save(&ctx, &file).await,
        },
        Commands::Register {
            name,
            phone,
            birth_date,
            email,
            address,
        } => session::register(&ctx, name, phone, birth_date, email, address).await,
        Commands::Login { phone, birth_date } => session::login(&ctx, phone, birth_date).await,
        Commands::Host { id } => host::run(&ctx, id).await,
    }
}
