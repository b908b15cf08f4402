//! Integration tests for the HTTP graph backend.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use neo4j_service::config::Neo4jSettings;
use neo4j_service::graph::{GraphClient, GraphError, HttpGraphBackend, Params, TxContext};
use serde_json::json;

mod common;
use common::{neo4j_error, neo4j_result, start_mock_server, MockResponse};

fn client_for(addr: SocketAddr) -> GraphClient {
    let settings = Neo4jSettings {
        url: format!("http://{}", addr),
        user: "neo4j".into(),
        password: "secret".into(),
        database: "neo4j".into(),
    };
    GraphClient::new(Arc::new(HttpGraphBackend::new(&settings).unwrap()))
}

#[tokio::test]
async fn test_autocommit_query_returns_records() {
    let addr = start_mock_server(|request| {
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/db/neo4j/tx/commit");
        assert!(request.header("Authorization").unwrap_or("").starts_with("Basic "));

        let body = request.json();
        assert_eq!(body["statements"][0]["statement"], "MATCH (n) RETURN n.name AS name");
        assert_eq!(body["statements"][0]["parameters"]["limit"], 2);

        MockResponse::json(200, neo4j_result(&["name"], vec![json!(["ada"]), json!(["grace"])]))
    });

    let mut params = Params::new();
    params.insert("limit".into(), json!(2));
    let records = client_for(addr)
        .run("MATCH (n) RETURN n.name AS name", &params)
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["name"], "ada");
    assert_eq!(records[1]["name"], "grace");
}

#[tokio::test]
async fn test_database_error_is_surfaced() {
    let addr = start_mock_server(|_| {
        MockResponse::json(
            200,
            neo4j_error("Neo.ClientError.Statement.SyntaxError", "Invalid input 'MTCH'"),
        )
    });

    let err = client_for(addr).run("MTCH (n)", &Params::new()).await.unwrap_err();
    assert_eq!(
        err,
        GraphError::Database {
            code: "Neo.ClientError.Statement.SyntaxError".into(),
            message: "Invalid input 'MTCH'".into(),
        }
    );
}

#[tokio::test]
async fn test_unreachable_database_is_connection_refused() {
    let err = client_for(common::closed_port())
        .run("RETURN 1", &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::ConnectionRefused(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_explicit_transaction_commit() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let addr = start_mock_server(move |request| {
        log.lock().unwrap().push(format!("{} {}", request.method, request.path));
        match request.path.as_str() {
            "/db/neo4j/tx" => MockResponse::json(201, json!({ "results": [], "errors": [] }))
                .with_header("Location", "/db/neo4j/tx/7"),
            "/db/neo4j/tx/7" => MockResponse::json(200, neo4j_result(&["x"], vec![json!([1])])),
            "/db/neo4j/tx/7/commit" => MockResponse::json(200, json!({ "results": [], "errors": [] })),
            _ => MockResponse::status(404),
        }
    });

    let client = client_for(addr);
    let mut tx = client.begin().await.unwrap();
    assert_eq!(
        tx.context(),
        &TxContext::Explicit {
            location: format!("http://{}/db/neo4j/tx/7", addr)
        }
    );

    let records = tx.run("RETURN 1 AS x", &Params::new()).await.unwrap();
    assert_eq!(records[0]["x"], 1);
    tx.commit().await.unwrap();

    assert!(!tx.is_open());
    assert_eq!(
        tx.run("RETURN 1", &Params::new()).await.unwrap_err(),
        GraphError::TransactionClosed
    );
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            "POST /db/neo4j/tx".to_string(),
            "POST /db/neo4j/tx/7".to_string(),
            "POST /db/neo4j/tx/7/commit".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_explicit_transaction_rollback() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let addr = start_mock_server(move |request| {
        log.lock().unwrap().push(format!("{} {}", request.method, request.path));
        match (request.method.as_str(), request.path.as_str()) {
            ("POST", "/db/neo4j/tx") => MockResponse::json(201, json!({ "results": [], "errors": [] }))
                .with_header("Location", "/db/neo4j/tx/9"),
            ("DELETE", "/db/neo4j/tx/9") => MockResponse::json(200, json!({ "results": [], "errors": [] })),
            _ => MockResponse::status(404),
        }
    });

    let mut tx = client_for(addr).begin().await.unwrap();
    tx.rollback().await.unwrap();

    assert_eq!(tx.rollback().await.unwrap_err(), GraphError::TransactionClosed);
    assert_eq!(seen.lock().unwrap().last().unwrap(), "DELETE /db/neo4j/tx/9");
}
