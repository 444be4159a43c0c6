mod common;

use journey_gateway::store::{Filter, PgConfig, PgTableService, SelectQuery, TableService};
use serde_json::{json, Value};
use std::time::Duration;
use testcontainers::clients::Cli;
use tokio_postgres::NoTls;

const SCHEMA: &str = "
    CREATE TABLE goals (
        id BIGSERIAL PRIMARY KEY,
        user_id TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT,
        category TEXT DEFAULT 'other',
        target_date DATE,
        is_completed BOOLEAN DEFAULT FALSE,
        progress INTEGER DEFAULT 0,
        created TEXT
    );
    CREATE TABLE chat_history (
        id BIGSERIAL PRIMARY KEY,
        user_id TEXT NOT NULL,
        message TEXT NOT NULL,
        is_user BOOLEAN NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
    );
";

fn row(value: Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().unwrap()
}

/// Postgres restarts once after initdb, so the first connections may be refused
async fn connect_with_retry(connection_string: &str) -> PgTableService {
    let mut attempts = 0;
    loop {
        let config = PgConfig::from_connection_string(connection_string)
            .expect("Failed to create config from connection string")
            .with_max_pool_size(4);
        match PgTableService::new(config).await {
            Ok(store) => return store,
            Err(e) if attempts < 20 => {
                attempts += 1;
                eprintln!("waiting for postgres: {}", e);
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
            Err(e) => panic!("Failed to create Postgres table service: {}", e),
        }
    }
}

async fn create_schema(connection_string: &str) {
    let (client, connection) = tokio_postgres::connect(connection_string, NoTls)
        .await
        .expect("Failed to connect for schema setup");
    tokio::spawn(connection);
    client
        .batch_execute(SCHEMA)
        .await
        .expect("Failed to create schema");
}

#[tokio::test]
async fn test_postgres_crud_round_trip() {
    // Start Postgres container
    let docker = Cli::default();
    let container = docker.run(common::create_postgres_container());
    let host_port = container.get_host_port_ipv4(common::POSTGRES_PORT);
    let connection_string = common::build_connection_string("127.0.0.1", host_port);

    let store = connect_with_retry(&connection_string).await;
    create_schema(&connection_string).await;

    // Insert applies column defaults and returns the stored row
    let inserted = store
        .insert(
            "goals",
            row(json!({"user_id": "u1", "title": "Walk", "target_date": "2024-09-01"})),
        )
        .await
        .expect("insert failed");
    assert_eq!(inserted["title"], "Walk");
    assert_eq!(inserted["category"], "other");
    assert_eq!(inserted["is_completed"], false);
    assert_eq!(inserted["target_date"], "2024-09-01");
    let id = inserted["id"].to_string();

    store
        .insert("goals", row(json!({"user_id": "u2", "title": "Swim"})))
        .await
        .expect("insert failed");

    // Select filters by owner
    let rows = store
        .select("goals", SelectQuery::new().eq("user_id", "u1"))
        .await
        .expect("select failed");
    assert_eq!(rows.len(), 1);

    // Update scoped to another owner matches nothing
    let updated = store
        .update(
            "goals",
            vec![Filter::eq("id", id.as_str()), Filter::eq("user_id", "u2")],
            row(json!({"progress": 50})),
        )
        .await
        .expect("update failed");
    assert!(updated.is_empty());

    let updated = store
        .update(
            "goals",
            vec![Filter::eq("id", id.as_str()), Filter::eq("user_id", "u1")],
            row(json!({"progress": 50, "is_completed": true})),
        )
        .await
        .expect("update failed");
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0]["progress"], 50);
    assert_eq!(updated[0]["is_completed"], true);

    // Delete scoped to the owner
    store
        .delete(
            "goals",
            vec![Filter::eq("id", id.as_str()), Filter::eq("user_id", "u1")],
        )
        .await
        .expect("delete failed");
    let remaining = store
        .select("goals", SelectQuery::new())
        .await
        .expect("select failed");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["user_id"], "u2");
}

#[tokio::test]
async fn test_postgres_chat_history_ordering() {
    let docker = Cli::default();
    let container = docker.run(common::create_postgres_container());
    let host_port = container.get_host_port_ipv4(common::POSTGRES_PORT);
    let connection_string = common::build_connection_string("127.0.0.1", host_port);

    let store = connect_with_retry(&connection_string).await;
    create_schema(&connection_string).await;

    for (text, is_user) in [("hi", true), ("hello!", false), ("how are you", true)] {
        store
            .insert(
                "chat_history",
                row(json!({"user_id": "u1", "message": text, "is_user": is_user})),
            )
            .await
            .expect("insert failed");
    }

    let history = store
        .select(
            "chat_history",
            SelectQuery::new().eq("user_id", "u1").order_by("timestamp"),
        )
        .await
        .expect("select failed");
    let messages: Vec<_> = history.iter().map(|r| r["message"].clone()).collect();
    assert_eq!(messages, vec![json!("hi"), json!("hello!"), json!("how are you")]);
}

#[tokio::test]
async fn test_postgres_error_surfaces_database_message() {
    let docker = Cli::default();
    let container = docker.run(common::create_postgres_container());
    let host_port = container.get_host_port_ipv4(common::POSTGRES_PORT);
    let connection_string = common::build_connection_string("127.0.0.1", host_port);

    let store = connect_with_retry(&connection_string).await;

    let err = store
        .select("missing_table", SelectQuery::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("missing_table"));
}
