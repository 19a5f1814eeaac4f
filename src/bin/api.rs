use bookkeeping_command_interpreter::{
    api::{start_server, ApiState},
    config::{system_clock, InterpreterConfig, ServerConfig},
    context::store::build_session_store,
    dispatcher::Interpreter,
    store::{HttpLedgerStore, InMemoryLedgerStore, LedgerStore},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let server = ServerConfig::from_env()?;
    let config = InterpreterConfig::from_env()?;

    info!("🚀 Bookkeeping Command Interpreter - API Server");
    info!("📍 Port: {}", server.port);

    let store: Arc<dyn LedgerStore> = match server.ledger_api_base_url.as_deref() {
        Some(base_url) => {
            info!(%base_url, "Using HTTP ledger store");
            Arc::new(HttpLedgerStore::new(base_url)?)
        }
        None => {
            warn!("LEDGER_API_BASE_URL not set; records are kept in memory only");
            Arc::new(InMemoryLedgerStore::new())
        }
    };

    if config.confirmation_secret.is_none() {
        warn!("CONFIRMATION_SECRET not set; proposals will not survive a restart");
    }

    let sessions = build_session_store(server.database_url.as_deref(), config.context_history_limit);
    let interpreter = Arc::new(Interpreter::new(store, config, system_clock()));

    info!("✅ Interpreter initialized");
    info!("📡 Starting API server...");

    start_server(ApiState::new(interpreter, sessions), server.port).await?;

    Ok(())
}
