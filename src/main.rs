use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use secrecy::SecretString;

use charla_engine::{TenantRegistry, TurnOrchestrator};
use charla_llm::OpenAiProvider;
use charla_server::ServerConfig;
use charla_store::{KvStore, MemoryStore, SessionStore, SqliteStore};

#[derive(Parser)]
#[command(name = "charla", about = "Chatbot backend for WhatsApp and web chat")]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Session storage backend
    #[arg(long, value_enum, default_value_t = Backend::Sqlite)]
    store: Backend,

    /// Data directory for the durable backends
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Tenant registry config file (JSON)
    #[arg(long)]
    tenants: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    /// Volatile in-process store (dev only)
    Memory,
    /// SQLite database
    Sqlite,
    /// Embedded key-value store
    Kv,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    tracing::info!("starting charla server");

    let data_dir = args
        .data_dir
        .unwrap_or_else(|| dirs_home().join(".charla"));

    let store: Arc<dyn SessionStore> = match args.store {
        Backend::Memory => Arc::new(MemoryStore::new()),
        Backend::Sqlite => Arc::new(
            SqliteStore::open(&data_dir.join("chat.db")).expect("failed to open sqlite store"),
        ),
        Backend::Kv => Arc::new(
            KvStore::open(&data_dir.join("chat.redb")).expect("failed to open kv store"),
        ),
    };

    let registry = match &args.tenants {
        Some(path) => {
            let registry =
                TenantRegistry::from_file(path).expect("failed to load tenant registry");
            tracing::info!(path = %path.display(), tenants = registry.tenant_count(), "tenant registry loaded");
            registry
        }
        None => {
            tracing::info!("no tenant registry given, using built-in default tenant");
            TenantRegistry::default()
        }
    };

    let api_key = std::env::var("OPENAI_API_KEY")
        .map(SecretString::from)
        .expect("OPENAI_API_KEY is not set");
    let provider = Arc::new(OpenAiProvider::new(api_key));

    let orchestrator = Arc::new(TurnOrchestrator::new(store, provider, Arc::new(registry)));

    let config = ServerConfig { port: args.port };
    let handle = charla_server::start(config, orchestrator)
        .await
        .expect("failed to start server");

    tracing::info!(port = handle.port, "charla ready");

    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl+c");

    tracing::info!("shutting down");
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
