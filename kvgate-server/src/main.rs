//! kvgate server - concurrent key-value store with an operator console

use std::sync::Arc;

use tokio::io::BufReader;
use tracing::info;

use kvgate_utils::Result;

mod barrier;
mod cli;
mod config;
mod context;
mod control;
mod gate;
mod interpreter;
mod listener;
mod orchestrator;
mod registry;
mod signals;
mod store;
mod worker;

use cli::Args;
use config::ConfigLoader;
use orchestrator::Server;
use store::Database;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();
    args.validate()?;

    let config = ConfigLoader::load_and_validate(args.config.as_deref())?;
    kvgate_utils::init_logging_with_config(config.logging.to_log_config())?;

    // Install the SIGINT handler before any client can connect
    let signals = signals::interrupt_stream()?;

    let addr = format!("{}:{}", config.server.bind_address, args.port);
    let listener = listener::bind(&addr).await?;

    let server = Server::new(Arc::new(Database::new()), config);
    server
        .run(listener, BufReader::new(tokio::io::stdin()), signals)
        .await?;

    info!("kvgate server exited cleanly");
    Ok(())
}
