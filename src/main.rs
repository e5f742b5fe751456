use pokemon_catalog::{Config, LogFormat, PokemonStore, http};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        config
            .logging
            .filter
            .clone()
            .unwrap_or_else(|| format!("{}=debug,axum::rejection=trace", env!("CARGO_CRATE_NAME")))
            .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(&config);

    let store = match PokemonStore::from_config(&config) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("Failed to initialize store: {}", e);
            std::process::exit(1);
        }
    };

    // Warm-up mirrors the home screen: favorites, first page, name index, types
    let warmup = Arc::clone(&store);
    tokio::spawn(async move {
        warmup.load_favorites().await;
        let (list, names, _) = tokio::join!(
            warmup.fetch_pokemon_list(false),
            warmup.fetch_all_pokemon_names(),
            warmup.fetch_pokemon_types(),
        );
        if let Err(e) = list {
            tracing::warn!("Initial page failed: {}", e);
        }
        if let Err(e) = names {
            tracing::warn!("Name index unavailable, search falls back to exact lookup: {}", e);
        }
    });

    let app = http::router(http::AppState::from_config(store, &config.pokemon));

    let listener = match tokio::net::TcpListener::bind(&config.server.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to address {}: {}", config.server.bind, e);
            std::process::exit(1);
        }
    };

    match listener.local_addr() {
        Ok(addr) => tracing::info!("listening on {}", addr),
        Err(e) => tracing::warn!("listening on unknown address: {}", e),
    }

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
