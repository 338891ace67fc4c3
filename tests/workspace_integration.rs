//! End-to-end workspace integration tests: exercise `ledger-core`,
//! `anchor-ethereum`, and `ledger-daemon` together the way a deployed
//! subsystem would be driven, rather than unit-testing any one crate in
//! isolation. Mirrors the shape of the teacher's own root-level
//! `tests/workspace_integration.rs` (a crate-spanning lifecycle test) but
//! follows the ledger-anchoring lifecycle: register transactions, let the
//! engine close a batch and anchor it, then verify inclusion both through
//! `LedgerSubsystem` directly and over the daemon's real HTTP surface.

use anchor_ethereum::EthereumProviderStub;
use ledger_core::config::{Config, EthereumConfig, LedgerDbConfig, LedgerSubsystemConfig};
use ledger_core::{Digest, LedgerSubsystem};
use std::sync::Arc;
use std::time::Duration;

fn test_config(workingdir: std::path::PathBuf, capacity: u32) -> Config {
    Config {
        workingdir,
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
    }
}

/// Full lifecycle through the library API: register two transactions,
/// let the single-writer engine close the batch on capacity, and confirm
/// the verifier reconstructs a proof path against the stub-anchored root.
#[tokio::test]
async fn complete_transaction_lifecycle_through_subsystem() {
    let dir = tempfile::tempdir().unwrap().into_path();
    let config = test_config(dir, 2);
    let anchor = Arc::new(EthereumProviderStub::new(42));

    let subsystem = LedgerSubsystem::start(&config, anchor).await.unwrap();

    let t1 = Digest::from([1u8; 32]);
    let t2 = Digest::from([2u8; 32]);
    subsystem.register("group-a", t1);
    subsystem.register("group-a", t2);

    // give the engine task a moment to close the tree and anchor the root
    tokio::time::sleep(Duration::from_millis(50)).await;

    let result = subsystem.verify("group-a", t1).await;
    assert!(result.found);
    let verified = result.spec.unwrap();
    assert_eq!(verified.block, 42);
    assert_eq!(result.path.unwrap()[0].position, ledger_core::model::Position::Left);

    subsystem.join().await;
}

/// A transaction that is never registered has no proof, regardless of
/// how many unrelated batches have closed.
#[tokio::test]
async fn unregistered_transaction_is_never_found() {
    let dir = tempfile::tempdir().unwrap().into_path();
    let config = test_config(dir, 2);
    let anchor = Arc::new(EthereumProviderStub::new(7));
    let subsystem = LedgerSubsystem::start(&config, anchor).await.unwrap();

    subsystem.register("group-a", Digest::from([1u8; 32]));
    subsystem.register("group-a", Digest::from([2u8; 32]));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let result = subsystem.verify("group-a", Digest::from([99u8; 32])).await;
    assert!(!result.found);

    subsystem.join().await;
}

/// Disabling the subsystem stops new registrations from reaching the
/// engine and makes verification report not-found without blocking.
#[tokio::test]
async fn disable_then_enable_round_trips() {
    let dir = tempfile::tempdir().unwrap().into_path();
    let config = test_config(dir, 2);
    let anchor = Arc::new(EthereumProviderStub::new(1));
    let subsystem = LedgerSubsystem::start(&config, anchor).await.unwrap();

    subsystem.disable();
    assert!(!subsystem.is_enabled());

    let tx = Digest::from([5u8; 32]);
    subsystem.register("group-a", tx);
    let result = subsystem.verify("group-a", tx).await;
    assert!(!result.found);

    subsystem.enable();
    assert!(subsystem.is_enabled());

    subsystem.join().await;
}

/// Drive the same lifecycle over the daemon's real HTTP surface: a live
/// `axum::serve` listener, a `reqwest` client, and a stub anchor standing
/// in for the Ethereum chain.
#[tokio::test]
async fn daemon_http_surface_round_trips_across_the_workspace() {
    let dir = tempfile::tempdir().unwrap().into_path();
    let config = test_config(dir, 2);
    let anchor = Arc::new(EthereumProviderStub::new(100));
    let subsystem = LedgerSubsystem::start(&config, anchor).await.unwrap();
    let app = ledger_daemon::build_app(Arc::new(subsystem));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });

    let base = format!("http://{addr}");
    let client = reqwest::Client::new();

    let t1 = hex::encode([11u8; 32]);
    let t2 = hex::encode([12u8; 32]);
    for tx_id in [&t1, &t2] {
        let response = client
            .post(format!("{base}/register"))
            .json(&serde_json::json!({ "asset_group_id": "g", "tx_id": tx_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 202);
    }

    tokio::time::sleep(Duration::from_millis(50)).await;

    let response = client
        .post(format!("{base}/verify"))
        .json(&serde_json::json!({ "asset_group_id": "g", "tx_id": t1 }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["found"], true);
    assert_eq!(body["spec"]["block"], 100);

    server.abort();
}
