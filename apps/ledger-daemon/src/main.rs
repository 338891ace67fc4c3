use anchor_ethereum::{EthereumProvider, EthereumProviderStub};
use ledger_core::anchor::AnchorProvider;
use ledger_core::{Config, LedgerSubsystem};
use ledger_daemon::config::DaemonConfig;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn build_anchor_provider(daemon_config: &DaemonConfig, ledger_config: &Config) -> Arc<dyn AnchorProvider> {
    if daemon_config.use_stub_anchor {
        tracing::info!("using EthereumProviderStub for development/testing");
        return Arc::new(EthereumProviderStub::default());
    }

    tracing::info!(endpoint = %daemon_config.ethereum_endpoint, "using real EthereumProvider");
    Arc::new(EthereumProvider::new(
        daemon_config.ethereum_endpoint.clone(),
        ledger_config.ethereum.account.clone(),
        ledger_config.ethereum.passphrase.clone(),
        ledger_config.ethereum.contract_address.clone(),
        ledger_config.ethereum.chain_id,
    ))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let daemon_config = DaemonConfig::from_env();

    let ledger_config = match Config::load(&daemon_config.ledger_config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, path = %daemon_config.ledger_config_path.display(), "failed to load ledger config");
            std::process::exit(1);
        }
    };

    let anchor = build_anchor_provider(&daemon_config, &ledger_config);

    let subsystem = match LedgerSubsystem::start(&ledger_config, anchor).await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!(error = %e, "failed to start ledger subsystem");
            std::process::exit(1);
        }
    };

    let app = ledger_daemon::build_app(subsystem);

    let listener = match tokio::net::TcpListener::bind(&daemon_config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %daemon_config.bind_addr, error = %e, "failed to bind HTTP server");
            std::process::exit(1);
        }
    };

    tracing::info!(address = %daemon_config.bind_addr, "ledger-daemon listening");

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            tracing::error!(error = %e, "HTTP server runtime error");
        }
    });

    let _ = server.await;
    tracing::info!("ledger-daemon shut down");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
