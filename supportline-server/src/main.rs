use std::sync::Arc;

use clap::Parser;
use supportline_core::config::StoreBackend;
use supportline_core::models::WidgetSettings;
use supportline_core::{ChatStore, InMemoryStore, PgStore, SupportlineConfig};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use supportline_server::AppContext;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "supportline.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

async fn open_store(config: &SupportlineConfig) -> anyhow::Result<Arc<dyn ChatStore>> {
    let seed = WidgetSettings::from(&config.widget);
    match config.database.backend {
        StoreBackend::Postgres => {
            let pool = supportline_core::db::create_pool(&config.database).await?;
            let store = PgStore::new(pool, seed);
            store.prepare().await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; sessions will not survive a restart");
            Ok(Arc::new(InMemoryStore::with_widget_settings(seed)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real deployments set SUPPORTLINE__* directly
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match SupportlineConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    let store = match open_store(&config).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match store.health().await {
            Ok(v) => println!("✅ Store reachable: {}", v),
            Err(e) => {
                println!("❌ Store health check failed: {}", e);
                std::process::exit(1);
            }
        }
        println!("✅ Supportline health check passed");
        return Ok(());
    }

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    if !config.http.enabled {
        tracing::warn!("HTTP API disabled in config; nothing to serve");
        return Ok(());
    }

    let ctx = AppContext::new(store, config);
    supportline_server::http::start_http_server(ctx, tx.subscribe()).await?;

    Ok(())
}
