use tracing_subscriber::EnvFilter;

use arcade_core::catalog::GameCatalog;
use arcade_server::config::ServerConfig;
use arcade_server::{build_app, spawn_view_reaper};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("ARCADE_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = ServerConfig::load();
    config.validate();
    let catalog = GameCatalog::load();
    let addr = config.listen_addr.clone();

    tracing::info!(games = catalog.len(), "Arcade server starting");

    let (app, state) = match build_app(config, catalog) {
        Ok(built) => built,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize server");
            std::process::exit(1);
        },
    };
    spawn_view_reaper(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        },
    };
    tracing::info!(addr = %addr, "Arcade server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
    tracing::info!("Arcade server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
