mod commands;
mod config;
mod server;
mod store;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::commands::{cmd_add, cmd_delete, cmd_today};
use crate::config::Config;
use crate::store::RestStoreClient;
use platelog_core::engine::MealLogEngine;
use platelog_core::gateway::{MealGateway, MemoryGateway};
use platelog_core::models::QuickAddForm;

#[derive(Parser)]
#[command(
    name = "platelog",
    version,
    about = "Log meals and watch today's totals against your targets"
)]
struct Cli {
    /// Log engine activity (info level)
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Log everything at debug level
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's meals, totals and macro progress
    Today {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Quick add a meal (name plus at least one nutrition value)
    Add {
        /// Meal name
        name: String,
        /// Calories (kcal)
        #[arg(long, default_value = "")]
        calories: String,
        /// Protein in grams
        #[arg(long, default_value = "")]
        protein: String,
        /// Carbohydrates in grams
        #[arg(long, default_value = "")]
        carbs: String,
        /// Fat in grams
        #[arg(long, default_value = "")]
        fat: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a meal entry by ID
    Delete {
        /// Entry ID to delete
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Serve the meal log over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Keep meals in memory instead of the remote store (lost on exit)
        #[arg(long)]
        memory: bool,
    },
}

fn init_tracing(verbose: bool, debug: bool) {
    // --debug > --verbose > RUST_LOG > warn, with HTTP plumbing kept quiet
    let filter = if debug {
        EnvFilter::new("debug,hyper=warn,hyper_util=warn,h2=warn,reqwest=warn,rustls=warn")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.debug);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn remote_gateway(config: &Config) -> Result<Arc<dyn MealGateway>> {
    let client =
        RestStoreClient::new(config.store()?).context("Failed to set up meal store client")?;
    Ok(Arc::new(client))
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command {
        Commands::Today { json } => {
            let engine = MealLogEngine::new(remote_gateway(&config)?);
            cmd_today(&engine, json).await
        }
        Commands::Add {
            name,
            calories,
            protein,
            carbs,
            fat,
            json,
        } => {
            let engine = MealLogEngine::new(remote_gateway(&config)?);
            let form = QuickAddForm {
                name,
                calories,
                protein,
                carbs,
                fat,
            };
            cmd_add(&engine, form, json).await
        }
        Commands::Delete { id, json } => {
            let engine = MealLogEngine::new(remote_gateway(&config)?);
            cmd_delete(&engine, &id, json).await
        }
        Commands::Serve { port, bind, memory } => {
            let gateway: Arc<dyn MealGateway> = if memory {
                eprintln!("Warning: Using an in-memory store. Meals are lost when the server stops.");
                Arc::new(MemoryGateway::new())
            } else {
                remote_gateway(&config)?
            };
            let engine = Arc::new(MealLogEngine::new(gateway));
            server::start_server(engine, port, &bind).await
        }
    }
}
