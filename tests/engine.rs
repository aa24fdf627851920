//! End-to-end sync passes against a real SQLite store and a stub remote.

use change_queue::{LocalStore, QueueError};
use pdv_sync::testing::StubConnector;
use pdv_sync::SyncEngine;
use std::sync::Arc;
use sync_core::{ColumnValue, Dialect, PassStatus, RemoteSyncConfig, RowSnapshot, SyncOperation};
use tokio_test::assert_ok;

fn config(dialect: Dialect) -> RemoteSyncConfig {
    RemoteSyncConfig {
        enabled: true,
        driver: dialect,
        host: "db.local".to_string(),
        port: dialect.default_port(),
        database: "pdv".to_string(),
        user: "sync".to_string(),
        password: "secret".to_string(),
        ..Default::default()
    }
}

fn engine_with(config: &RemoteSyncConfig) -> (SyncEngine<StubConnector>, StubConnector) {
    let store = Arc::new(LocalStore::open_in_memory().unwrap());
    store.save_sync_config(config).unwrap();
    let stub = StubConnector::new();
    (SyncEngine::with_connector(store, stub.clone()), stub)
}

fn row(pairs: &[(&str, ColumnValue)]) -> RowSnapshot {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn product(id: i64, name: &str) -> RowSnapshot {
    row(&[
        ("id", id.into()),
        ("name", name.into()),
        ("price", 9.99.into()),
        ("active", 1i64.into()),
    ])
}

fn enqueue_products(engine: &SyncEngine<StubConnector>, names: &[&str]) -> Vec<i64> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let record_id = i as i64 + 1;
            engine
                .store()
                .try_enqueue("products", SyncOperation::Update, record_id, &product(record_id, name))
                .unwrap()
        })
        .collect()
}

#[tokio::test]
async fn test_insert_upserts_on_mysql() {
    let (engine, stub) = engine_with(&config(Dialect::MySql));
    engine
        .store()
        .enqueue("products", SyncOperation::Insert, 7, &product(7, "Widget"));

    let result = engine.run_sync().await;
    assert!(result.success);
    assert_eq!(result.synced, 1);
    assert_eq!(result.failed, 0);
    assert_eq!(result.status, Some(PassStatus::Success));

    let executed = stub.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(
        executed[0].sql,
        "INSERT INTO products (id, active, name, price) VALUES (?, ?, ?, ?) \
         ON DUPLICATE KEY UPDATE active = VALUES(active), name = VALUES(name), price = VALUES(price)"
    );
    assert_eq!(
        executed[0].params,
        vec![7i64.into(), 1i64.into(), "Widget".into(), 9.99.into()]
    );

    let passes = engine.store().recent_passes(10).unwrap();
    assert_eq!(passes.len(), 1);
    assert_eq!(passes[0].status, PassStatus::Success);
    assert_eq!(passes[0].items_synced, 1);
    assert_eq!(passes[0].items_failed, 0);
    assert_eq!(engine.store().pending_count().unwrap(), 0);
}

#[tokio::test]
async fn test_disabled_pass_writes_nothing() {
    let (engine, stub) = engine_with(&RemoteSyncConfig {
        enabled: false,
        ..config(Dialect::MySql)
    });
    engine
        .store()
        .enqueue("products", SyncOperation::Insert, 7, &product(7, "Widget"));

    let result = engine.run_sync().await;
    assert!(!result.success);
    assert_eq!(result.synced, 0);
    assert_eq!(result.failed, 0);
    assert_eq!(result.status, None);

    assert_eq!(stub.connects(), 0);
    assert!(engine.store().recent_passes(10).unwrap().is_empty());
    assert_eq!(engine.status(10).unwrap().last_sync_at, None);
    assert_eq!(engine.store().pending_count().unwrap(), 1);
}

#[tokio::test]
async fn test_every_item_failing_is_an_error_pass() {
    let (engine, stub) = engine_with(&config(Dialect::MySql));
    let ids = enqueue_products(&engine, &["A", "B", "C"]);
    stub.fail_all(true);

    let result = engine.run_sync().await;
    assert!(!result.success);
    assert_eq!(result.status, Some(PassStatus::Error));
    assert_eq!(result.synced, 0);
    assert_eq!(result.failed, 3);

    for id in ids {
        let entry = engine.store().entry(id).unwrap().unwrap();
        assert!(!entry.synced);
        assert_eq!(entry.retry_count, 1);
        assert!(entry.last_error.is_some());
    }
    // The connection itself succeeded, so the watermark still moves.
    assert!(engine.status(10).unwrap().last_sync_at.is_some());
}

#[tokio::test]
async fn test_mixed_batch_is_partial() {
    let (engine, stub) = engine_with(&config(Dialect::PostgreSql));
    let ids = enqueue_products(&engine, &["ok-1", "bad-1", "ok-2", "bad-2", "ok-3"]);
    stub.poison("bad-1");
    stub.poison("bad-2");

    let result = engine.run_sync().await;
    assert!(result.success);
    assert_eq!(result.status, Some(PassStatus::Partial));
    assert_eq!(result.synced, 3);
    assert_eq!(result.failed, 2);
    assert_eq!(result.message, "3 synced, 2 failed");

    let pending: Vec<i64> = engine
        .store()
        .pending_batch(10)
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(pending, vec![ids[1], ids[3]]);

    let passes = engine.store().recent_passes(1).unwrap();
    assert_eq!(passes[0].status, PassStatus::Partial);
    assert_eq!(passes[0].items_synced, 3);
    assert_eq!(passes[0].items_failed, 2);
}

#[tokio::test]
async fn test_delete_is_a_soft_delete_on_postgresql() {
    let (engine, stub) = engine_with(&config(Dialect::PostgreSql));
    engine.store().enqueue(
        "products",
        SyncOperation::Delete,
        42,
        &row(&[("id", 42i64.into()), ("active", 0i64.into())]),
    );

    let result = engine.run_sync().await;
    assert_eq!(result.status, Some(PassStatus::Success));

    let executed = stub.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].dialect, Dialect::PostgreSql);
    assert_eq!(executed[0].sql, "UPDATE products SET active = 0 WHERE id = ?");
    assert_eq!(executed[0].params, vec![ColumnValue::Integer(42)]);
}

#[tokio::test]
async fn test_incomplete_config_attempts_nothing() {
    let (engine, stub) = engine_with(&RemoteSyncConfig {
        host: String::new(),
        ..config(Dialect::MySql)
    });
    enqueue_products(&engine, &["A"]);

    let result = engine.run_sync().await;
    assert!(!result.success);
    assert_eq!(result.status, None);
    assert!(result.message.contains("host"), "{}", result.message);
    assert_eq!(stub.connects(), 0);
    assert!(engine.store().recent_passes(10).unwrap().is_empty());
}

#[tokio::test]
async fn test_refused_connection_leaves_queue_untouched() {
    let (engine, stub) = engine_with(&config(Dialect::MySql));
    let ids = enqueue_products(&engine, &["A", "B"]);
    stub.refuse_connections(true);

    let result = engine.run_sync().await;
    assert!(!result.success);
    assert_eq!(result.status, Some(PassStatus::Error));
    assert_eq!((result.synced, result.failed), (0, 0));
    assert!(result.message.starts_with("connection failed"), "{}", result.message);

    let passes = engine.store().recent_passes(10).unwrap();
    assert_eq!(passes.len(), 1);
    assert_eq!(passes[0].status, PassStatus::Error);
    assert_eq!(passes[0].items_synced, 0);
    assert_eq!(passes[0].items_failed, 0);

    assert_eq!(engine.status(10).unwrap().last_sync_at, None);
    for id in ids {
        let entry = engine.store().entry(id).unwrap().unwrap();
        assert!(!entry.synced);
        assert_eq!(entry.retry_count, 0);
    }
}

#[tokio::test]
async fn test_failed_entries_retry_until_applied() {
    let (engine, stub) = engine_with(&config(Dialect::MySql));
    let ids = enqueue_products(&engine, &["A"]);
    stub.fail_all(true);

    engine.run_sync().await;
    engine.run_sync().await;
    let entry = engine.store().entry(ids[0]).unwrap().unwrap();
    assert_eq!(entry.retry_count, 2);
    assert!(!entry.synced);

    stub.fail_all(false);
    let result = engine.run_sync().await;
    assert_eq!(result.status, Some(PassStatus::Success));
    let entry = engine.store().entry(ids[0]).unwrap().unwrap();
    assert!(entry.synced);
    assert!(entry.synced_at.is_some());
    assert_eq!(entry.retry_count, 2);
}

#[tokio::test]
async fn test_malformed_payload_fails_only_its_entry() {
    let (engine, stub) = engine_with(&config(Dialect::MySql));
    let bad_id: i64 = engine
        .store()
        .with_transaction(|tx| {
            tx.execute(
                "INSERT INTO sync_queue (table_name, operation, record_id, data, created_at)
                 VALUES ('products', 'UPDATE', 3, '{\"tags\": [1, 2]}', '2024-01-01T00:00:00+00:00')",
                [],
            )?;
            Ok::<_, QueueError>(tx.last_insert_rowid())
        })
        .unwrap();
    enqueue_products(&engine, &["A"]);

    let result = engine.run_sync().await;
    assert_eq!(result.status, Some(PassStatus::Partial));
    assert_eq!(stub.executed().len(), 1);

    let entry = engine.store().entry(bad_id).unwrap().unwrap();
    assert!(!entry.synced);
    assert_eq!(entry.retry_count, 1);
    assert!(entry
        .last_error
        .as_deref()
        .unwrap_or_default()
        .contains("invalid payload"));
}

#[tokio::test]
async fn test_entries_replay_in_queue_order_within_batch_limit() {
    let (engine, stub) = engine_with(&config(Dialect::MySql));
    let engine = engine.with_batch_limit(2);
    enqueue_products(&engine, &["first", "second", "third"]);

    let result = engine.run_sync().await;
    assert_eq!(result.synced, 2);
    assert_eq!(engine.store().pending_count().unwrap(), 1);

    let names: Vec<ColumnValue> = stub
        .executed()
        .iter()
        .map(|s| s.params[1].clone())
        .collect();
    assert_eq!(names, vec!["first".into(), "second".into()]);

    engine.run_sync().await;
    assert_eq!(engine.store().pending_count().unwrap(), 0);
}

#[tokio::test]
async fn test_connection_closed_after_every_pass() {
    let (engine, stub) = engine_with(&config(Dialect::MySql));
    enqueue_products(&engine, &["A"]);
    engine.run_sync().await;
    stub.fail_all(true);
    enqueue_products(&engine, &["B"]);
    engine.run_sync().await;

    assert_eq!(stub.connects(), 2);
    assert_eq!(stub.closes(), 2);
}

#[tokio::test]
async fn test_test_connection_reports_reachability() {
    let (engine, stub) = engine_with(&RemoteSyncConfig::default());
    let target = config(Dialect::PostgreSql);

    let result = engine.test_connection(&target).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(stub.executed()[0].sql, "SELECT 1");
    assert_eq!(stub.closes(), 1);

    stub.refuse_connections(true);
    let result = engine.test_connection(&target).await;
    assert!(!result.success);
    assert!(result.message.contains("refused"), "{}", result.message);

    let result = engine
        .test_connection(&RemoteSyncConfig {
            user: String::new(),
            ..target
        })
        .await;
    assert!(!result.success);
    assert!(result.message.contains("user"), "{}", result.message);
}

#[tokio::test]
async fn test_init_remote_schema_creates_every_table() {
    let (engine, stub) = engine_with(&RemoteSyncConfig::default());

    let result = engine.init_remote_schema(&config(Dialect::PostgreSql)).await;
    assert!(result.success, "{}", result.message);

    let executed = stub.executed();
    assert_eq!(executed.len(), 9);
    assert!(executed
        .iter()
        .all(|s| s.sql.starts_with("CREATE TABLE IF NOT EXISTS ")));
    assert!(executed.iter().all(|s| s.sql.contains("BIGSERIAL PRIMARY KEY")));
    assert_eq!(stub.closes(), 1);
}

#[tokio::test]
async fn test_init_remote_schema_stops_at_first_failure() {
    let (engine, stub) = engine_with(&RemoteSyncConfig::default());
    stub.fail_all(true);

    let result = engine.init_remote_schema(&config(Dialect::MySql)).await;
    assert!(!result.success);
    assert!(result.message.starts_with("schema creation failed"));
    assert_eq!(stub.closes(), 1);
}

#[tokio::test]
async fn test_status_and_clear_synced() {
    let (engine, stub) = engine_with(&config(Dialect::MySql));
    enqueue_products(&engine, &["A", "B", "C"]);
    stub.poison("C");

    engine.run_sync().await;

    let status = assert_ok!(engine.status(5));
    assert!(status.enabled);
    assert_eq!(status.pending, 1);
    assert!(status.last_sync_at.is_some());
    assert_eq!(status.recent_passes.len(), 1);
    assert_eq!(status.recent_passes[0].status, PassStatus::Partial);

    assert_eq!(assert_ok!(engine.clear_synced()), 2);
    assert_eq!(assert_ok!(engine.clear_synced()), 0);
    assert_eq!(engine.store().pending_count().unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_passes_do_not_double_apply() {
    let (engine, stub) = engine_with(&config(Dialect::MySql));
    enqueue_products(&engine, &["A", "B"]);
    let engine = Arc::new(engine);

    let (first, second) = tokio::join!(engine.run_sync(), engine.run_sync());
    assert_eq!(first.synced + second.synced, 2);
    assert_eq!(stub.executed().len(), 2);
}
