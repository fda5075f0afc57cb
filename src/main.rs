use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use boutinf::engine::Engine;
use boutinf::index::IndexStore;
use boutinf::interface::{QueryInterface, QueryOptions};
use boutinf::settings::Settings;
use boutinf::source::{Message, MessageSource, SqliteSource};
use boutinf::Result;

/// Index and query the messages of bouts.
#[derive(Parser, Debug)]
#[command(name = "boutinf", author, version, about, long_about = None)]
struct Cli {
    /// Config file to read on top of the defaults and boutinf.toml
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Post a message to a bout and index it
    Post {
        #[arg(long)]
        bout: u64,
        #[arg(long)]
        number: u64,
        #[arg(long)]
        author: String,
        text: String,
    },
    /// Add a participant to a bout
    Join { bout: u64, identity: String },
    /// Print the messages of a bout accepted by a query, newest first
    Query {
        bout: u64,
        #[arg(default_value = "")]
        query: String,
        /// Overrides query_timeout_ms from the settings
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Describe the materialized indexes
    Stats,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(level) = &cli.log_level {
        settings.log_level = level.clone();
    }
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .init();

    match run(cli.command, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "boutinf failed");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, settings: &Settings) -> Result<()> {
    let store = Arc::new(IndexStore::open(&settings.index_directory)?);
    let source = Arc::new(SqliteSource::open(&settings.database_path)?);
    let engine = Arc::new(Engine::with_cache_size(
        Arc::clone(&store),
        Arc::clone(&source) as Arc<dyn MessageSource>,
        settings.query_cache_size,
    ));
    match command {
        Command::Post { bout, number, author, text } => {
            let message = Message::new(number, bout, &author, &text, Utc::now());
            source.post(&message)?;
            engine.index_message(&message)?;
            info!(bout, number, "message posted");
        }
        Command::Join { bout, identity } => {
            source.join(bout, &identity)?;
            info!(bout, identity = %identity, "participant joined");
        }
        Command::Query { bout, query, timeout_ms } => {
            let timeout = match timeout_ms {
                Some(ms) => (ms > 0).then(|| std::time::Duration::from_millis(ms)),
                None => settings.query_timeout(),
            };
            let interface = QueryInterface::new(Arc::clone(&engine));
            let candidates = source.messages(bout)?;
            let handle = interface.start_query(query, candidates, QueryOptions { timeout })?;
            for message in handle.wait()? {
                println!(
                    "#{} {} {}: {}",
                    message.number,
                    message.date.to_rfc3339(),
                    message.author,
                    message.text
                );
            }
        }
        Command::Stats => print!("{}", store.statistics()?),
    }
    store.flush_all()?;
    Ok(())
}
