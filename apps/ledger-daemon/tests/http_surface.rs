//! End-to-end test of the daemon's HTTP surface: a real `axum::serve`
//! listener bound to an ephemeral port, driven with `reqwest`, over a
//! `LedgerSubsystem` backed by a stub anchor. Mirrors the shape of
//! `apps/api`'s `tests/http_evidence.rs` (spawn the real server, drive it
//! with an HTTP client) rather than `oneshot`-ing the router directly.

use anchor_ethereum::EthereumProviderStub;
use ledger_core::config::{Config, EthereumConfig, LedgerDbConfig, LedgerSubsystemConfig};
use ledger_core::LedgerSubsystem;
use std::sync::Arc;

async fn spawn_daemon(capacity: u32) -> (String, tokio::task::JoinHandle<()>) {
    let dir = tempfile::tempdir().unwrap().into_path();
    let config = Config {
        workingdir: dir,
        ledger: LedgerDbConfig { auxiliary_db: "bbc_aux.sqlite3".to_string() },
        ledger_subsystem: LedgerSubsystemConfig {
            max_transactions: capacity,
            max_seconds: 3600,
            subsystem: "ethereum".to_string(),
        },
        ethereum: EthereumConfig {
            account: "0xdead".to_string(),
            passphrase: "hunter2".to_string(),
            contract_address: "0xbeef".to_string(),
            chain_id: 1337,
        },
    };

    let subsystem = LedgerSubsystem::start(&config, Arc::new(EthereumProviderStub::new(100)))
        .await
        .unwrap();
    let app = ledger_daemon::build_app(Arc::new(subsystem));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    (format!("http://{addr}"), handle)
}

#[tokio::test]
async fn health_check_over_real_http() {
    let (base, handle) = spawn_daemon(1000).await;
    let response = reqwest::get(format!("{base}/health")).await.unwrap();
    assert!(response.status().is_success());
    handle.abort();
}

#[tokio::test]
async fn register_pair_then_verify_over_real_http() {
    let (base, handle) = spawn_daemon(2).await;
    let client = reqwest::Client::new();

    let t1 = hex::encode([1u8; 32]);
    let t2 = hex::encode([2u8; 32]);

    for tx_id in [&t1, &t2] {
        let response = client
            .post(format!("{base}/register"))
            .json(&serde_json::json!({ "asset_group_id": "g", "tx_id": tx_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 202);
    }

    // give the single-writer engine task a moment to close the batch and
    // write through to the anchor client.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let response = client
        .post(format!("{base}/verify"))
        .json(&serde_json::json!({ "asset_group_id": "g", "tx_id": t1 }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["found"], true);
    assert_eq!(body["path"][0]["position"], "left");

    handle.abort();
}

#[tokio::test]
async fn disabled_subsystem_returns_not_found_without_enqueuing() {
    let (base, handle) = spawn_daemon(1000).await;
    let client = reqwest::Client::new();

    client.post(format!("{base}/disable")).send().await.unwrap();

    let tx_id = hex::encode([9u8; 32]);
    let response = client
        .post(format!("{base}/verify"))
        .json(&serde_json::json!({ "asset_group_id": "g", "tx_id": tx_id }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["found"], false);

    handle.abort();
}
