use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tracing::{info, Level};
use tycoon_execution::SessionStore;
use tycoon_types::Catalog;

mod config;
mod hub;
mod protocol;
mod ws;

use config::RoomConfig;
use hub::Hub;
use ws::{ws_handler, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host interface to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(short, long, default_value_t = 9124)]
    port: u16,

    /// JSON catalog to play with (built-in standard deck when omitted).
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Seed for game codes and trend timelines (random when omitted).
    #[arg(long)]
    seed: Option<u64>,
}

fn load_catalog(path: Option<&PathBuf>) -> anyhow::Result<Catalog> {
    let Some(path) = path else {
        return Ok(Catalog::standard());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    Catalog::from_json(&raw).with_context(|| format!("invalid catalog {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let args = Args::parse();
    let config = RoomConfig::from_env().context("invalid environment")?;
    let catalog = load_catalog(args.catalog.as_ref())?;
    info!(
        cards = catalog.cards.len(),
        markets = catalog.markets.len(),
        seeded = args.seed.is_some(),
        "catalog loaded"
    );

    let store = Arc::new(SessionStore::new(Arc::new(catalog), args.seed));
    let state = AppState {
        hub: Arc::new(Hub::new(store, config.broadcast_capacity)),
        max_message_bytes: config.max_message_bytes,
    };

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(healthz))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("invalid listen addr")?;
    info!(%addr, "game room listening");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}
