use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use lanseat_api::commands::COMMANDS;
use lanseat_api::seatmap::GridRenderer;
use lanseat_api::{AppStateInner, BotConfig, router};
use lanseat_db::{Database, format_ts};
use lanseat_gateway::Dispatcher;
use lanseat_gateway::connection;
use lanseat_types::api::Claims;

/// Secrets that ship in examples and must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["", "change-me", "dev-secret-change-me", "secret"];

/// Bridge tokens minted by `mint-token` stay valid for a year.
const TOKEN_LIFETIME_DAYS: i64 = 365;

#[derive(Debug, Clone)]
struct Config {
    db_path: PathBuf,
    host: String,
    port: u16,
    bridge_secret: String,
    owner_id: Option<String>,
    roster_delay: Duration,
    hold_window: Duration,
    sweep_interval: Duration,
    seatmap_background: Option<PathBuf>,
    payment_info: Option<String>,
}

impl Config {
    fn from_env() -> anyhow::Result<Self> {
        let bridge_secret = std::env::var("LANSEAT_BRIDGE_SECRET").unwrap_or_default();
        if PLACEHOLDER_SECRETS.contains(&bridge_secret.trim()) {
            anyhow::bail!("LANSEAT_BRIDGE_SECRET must be set to a real secret");
        }

        Ok(Self {
            db_path: PathBuf::from(env_or("LANSEAT_DB_PATH", "lanseat.db")),
            host: env_or("LANSEAT_HOST", "0.0.0.0"),
            port: env_or("LANSEAT_PORT", "3100").parse()?,
            bridge_secret,
            owner_id: env_opt("LANSEAT_OWNER_ID"),
            roster_delay: Duration::from_secs(env_or("LANSEAT_ROSTER_DELAY_SECS", "5").parse()?),
            hold_window: Duration::from_secs(env_or("LANSEAT_HOLD_MINUTES", "10").parse::<u64>()? * 60),
            sweep_interval: Duration::from_secs(env_or("LANSEAT_SWEEP_INTERVAL_SECS", "60").parse()?),
            seatmap_background: env_opt("LANSEAT_SEATMAP_BACKGROUND").map(PathBuf::from),
            payment_info: env_opt("LANSEAT_PAYMENT_INFO"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Clone)]
struct ServerState {
    dispatcher: Dispatcher,
    bridge_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lanseat=debug,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    let mut args = std::env::args().skip(1);
    if let Some(cmd) = args.next() {
        if cmd == "mint-token" {
            let Some(bridge) = args.next() else {
                anyhow::bail!("usage: lanseat mint-token <bridge-name>");
            };
            println!("{}", mint_token(&bridge, &config.bridge_secret)?);
            return Ok(());
        }
        anyhow::bail!("unknown command '{}'", cmd);
    }

    let db = Arc::new(Database::open(&config.db_path)?);
    let (dispatcher, inbound_rx) = Dispatcher::new();
    let renderer = Arc::new(GridRenderer::new(config.seatmap_background.clone()));
    let bot_config = BotConfig {
        owner_id: config.owner_id.clone(),
        roster_delay: config.roster_delay,
        payment_info: config.payment_info.clone(),
    };
    let app = AppStateInner::new(db.clone(), dispatcher.clone(), bot_config, renderer);

    tokio::spawn(router::run(app, inbound_rx));
    tokio::spawn(sweep_holds(db, config.hold_window, config.sweep_interval));

    let state = ServerState {
        dispatcher,
        bridge_secret: config.bridge_secret.clone(),
    };
    let routes = Router::new()
        .route("/gateway", get(ws_upgrade))
        .route("/health", get(health))
        .route("/commands", get(commands))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("LAN seat bot listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, routes)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn mint_token(bridge: &str, secret: &str) -> anyhow::Result<String> {
    let exp = (Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS)).timestamp();
    let claims = Claims {
        sub: bridge.to_string(),
        exp: usize::try_from(exp)?,
    };
    Ok(encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))?)
}

/// Periodically flip unconfirmed seat holds older than `window` back to
/// available.
async fn sweep_holds(db: Arc<Database>, window: Duration, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let Ok(window) = chrono::Duration::from_std(window) else {
            warn!("Hold window {:?} out of range, sweep disabled", window);
            return;
        };
        let cutoff = format_ts(Utc::now().naive_utc() - window);
        let db = db.clone();
        match tokio::task::spawn_blocking(move || db.release_expired_holds(&cutoff)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => error!("Seat hold sweep failed: {:#}", e),
            Err(e) => error!("Seat hold sweep panicked: {}", e),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn ws_upgrade(State(state): State<ServerState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_connection(socket, state.dispatcher, state.bridge_secret))
}

async fn health(State(state): State<ServerState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "bridges": state.dispatcher.connected_bridges().await,
    }))
}

async fn commands() -> impl IntoResponse {
    Json(COMMANDS)
}
