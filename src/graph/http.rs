//! Graph database backend over the Neo4j transactional HTTP API.
//!
//! # Endpoints
//! ```text
//! POST   {url}/db/{database}/tx/commit   autocommit statement
//! POST   {url}/db/{database}/tx          begin (Location = transaction)
//! POST   {location}                      statement in open transaction
//! POST   {location}/commit               commit
//! DELETE {location}                      rollback
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::config::schema::NEO4J_URL_SCHEMES;
use crate::config::Neo4jSettings;
use crate::graph::runner::{QueryRunner, TxControl};
use crate::graph::types::{GraphError, GraphResult, Params, Record, TxContext};

/// HTTP client for one database.
#[derive(Clone)]
pub struct HttpGraphBackend {
    http: Client,
    base: Url,
    tx_endpoint: String,
    user: String,
    password: String,
}

#[derive(Serialize)]
struct StatementBatch<'a> {
    statements: Vec<Statement<'a>>,
}

#[derive(Serialize)]
struct Statement<'a> {
    statement: &'a str,
    parameters: &'a Params,
}

#[derive(Debug, Default, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<DbError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct DbError {
    code: String,
    message: String,
}

impl HttpGraphBackend {
    const TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(settings: &Neo4jSettings) -> GraphResult<Self> {
        let base: Url = settings
            .url
            .parse()
            .map_err(|e| GraphError::Protocol(format!("invalid database URL '{}': {}", settings.url, e)))?;
        if !NEO4J_URL_SCHEMES.contains(&base.scheme()) {
            return Err(GraphError::Protocol(format!(
                "unsupported scheme '{}' for the HTTP API",
                base.scheme()
            )));
        }

        let http = Client::builder()
            .timeout(Self::TIMEOUT)
            .build()
            .map_err(|e| GraphError::Transport(e.to_string()))?;

        let tx_endpoint = format!(
            "{}/db/{}/tx",
            base.as_str().trim_end_matches('/'),
            settings.database
        );

        Ok(Self {
            http,
            base,
            tx_endpoint,
            user: settings.user.clone(),
            password: settings.password.clone(),
        })
    }

    /// POST a statement batch, returning the `Location` header and decoded body.
    async fn post(
        &self,
        url: &str,
        query: Option<(&str, &Params)>,
    ) -> GraphResult<(Option<String>, TxResponse)> {
        let batch = StatementBatch {
            statements: query
                .map(|(statement, parameters)| Statement { statement, parameters })
                .into_iter()
                .collect(),
        };

        let response = self
            .http
            .post(url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&batch)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(transport_error)?;
        let parsed = decode(status, &body)?;
        Ok((location, parsed))
    }

    fn location_url(&self, tx: &TxContext) -> String {
        match tx {
            TxContext::AutoCommit => format!("{}/commit", self.tx_endpoint),
            TxContext::Explicit { location } => location.clone(),
        }
    }
}

#[async_trait]
impl QueryRunner for HttpGraphBackend {
    async fn run_in_tx(
        &self,
        tx: &TxContext,
        query: &str,
        params: &Params,
    ) -> GraphResult<Vec<Record>> {
        let url = self.location_url(tx);
        let (_, response) = self.post(&url, Some((query, params))).await?;
        let result = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| GraphError::Protocol("response carried no result".to_string()))?;

        Ok(result
            .data
            .into_iter()
            .map(|row| result.columns.iter().cloned().zip(row.row).collect())
            .collect())
    }
}

#[async_trait]
impl TxControl for HttpGraphBackend {
    async fn begin(&self) -> GraphResult<TxContext> {
        let (location, _) = self.post(&self.tx_endpoint, None).await?;
        let location = location
            .ok_or_else(|| GraphError::Protocol("begin response has no Location header".to_string()))?;
        // The server may answer with a relative location.
        let location = self
            .base
            .join(&location)
            .map_err(|e| GraphError::Protocol(format!("invalid transaction location: {}", e)))?;

        tracing::debug!(location = %location, "Transaction opened");
        Ok(TxContext::Explicit {
            location: location.to_string(),
        })
    }

    async fn commit(&self, tx: &TxContext) -> GraphResult<()> {
        let TxContext::Explicit { location } = tx else {
            return Ok(());
        };
        self.post(&format!("{}/commit", location), None).await?;
        Ok(())
    }

    async fn rollback(&self, tx: &TxContext) -> GraphResult<()> {
        let TxContext::Explicit { location } = tx else {
            return Ok(());
        };
        let response = self
            .http
            .request(Method::DELETE, location)
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;
        decode(status, &body)?;
        Ok(())
    }
}

fn transport_error(err: reqwest::Error) -> GraphError {
    if err.is_connect() {
        GraphError::ConnectionRefused(err.to_string())
    } else {
        GraphError::Transport(err.to_string())
    }
}

/// Decode a response body, surfacing database errors before HTTP status.
fn decode(status: StatusCode, body: &[u8]) -> GraphResult<TxResponse> {
    let parsed = if body.is_empty() {
        TxResponse::default()
    } else {
        match serde_json::from_slice::<TxResponse>(body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(GraphError::Protocol(format!("database returned status {}", status)));
            }
            Err(e) => return Err(GraphError::Protocol(format!("malformed response: {}", e))),
        }
    };

    if let Some(err) = parsed.errors.into_iter().next() {
        return Err(GraphError::Database {
            code: err.code,
            message: err.message,
        });
    }
    if !status.is_success() {
        return Err(GraphError::Protocol(format!("database returned status {}", status)));
    }
    Ok(TxResponse {
        results: parsed.results,
        errors: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(url: &str) -> Neo4jSettings {
        Neo4jSettings {
            url: url.to_string(),
            user: "neo4j".into(),
            password: "secret".into(),
            database: "neo4j".into(),
        }
    }

    #[test]
    fn test_endpoint_layout() {
        let backend = HttpGraphBackend::new(&settings("http://db:7474/")).unwrap();
        assert_eq!(backend.tx_endpoint, "http://db:7474/db/neo4j/tx");
        assert_eq!(
            backend.location_url(&TxContext::AutoCommit),
            "http://db:7474/db/neo4j/tx/commit"
        );
    }

    #[test]
    fn test_rejects_bolt_scheme() {
        assert!(matches!(
            HttpGraphBackend::new(&settings("bolt://db:7687")),
            Err(GraphError::Protocol(_))
        ));
    }

    #[test]
    fn test_decode_database_error() {
        let body = br#"{"results":[],"errors":[{"code":"Neo.ClientError.Statement.SyntaxError","message":"bad"}]}"#;
        assert_eq!(
            decode(StatusCode::OK, body).unwrap_err(),
            GraphError::Database {
                code: "Neo.ClientError.Statement.SyntaxError".into(),
                message: "bad".into(),
            }
        );
    }

    #[test]
    fn test_decode_status_without_body() {
        assert!(matches!(
            decode(StatusCode::BAD_GATEWAY, b"<html>"),
            Err(GraphError::Protocol(_))
        ));
    }
}
