//! InfluxQL query execution over the InfluxDB HTTP API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{
    config::InfluxConfig,
    models::{QueryResult, Series},
    DwhExportError, Result,
};

/// Runs a rendered query against a database.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, query: &str, database: &str) -> Result<QueryResult>;
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    #[serde(default)]
    error: Option<String>,
}

impl QueryResponse {
    fn into_result(self) -> Result<QueryResult> {
        if let Some(error) = self.error {
            return Err(DwhExportError::Database(error));
        }

        let mut series = Vec::new();
        for statement in self.results {
            if let Some(error) = statement.error {
                return Err(DwhExportError::Database(error));
            }
            series.extend(statement.series);
        }
        Ok(QueryResult { series })
    }
}

/// Client for the InfluxQL `/query` endpoint (InfluxDB 1.x, and 2.x through its
/// v1 compatibility API where the database maps to a bucket).
#[derive(Debug, Clone)]
pub struct InfluxClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl InfluxClient {
    pub fn new(config: &InfluxConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        let token = Some(config.token.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl QueryExecutor for InfluxClient {
    async fn execute(&self, query: &str, database: &str) -> Result<QueryResult> {
        let url = format!("{}/query", self.base_url);
        debug!(database = %database, "Sending InfluxQL query");

        let mut request = self
            .client
            .get(&url)
            .query(&[("db", database), ("q", query), ("epoch", "ns")]);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Token {}", token));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DwhExportError::Database(format!(
                "InfluxDB returned {}: {}",
                status,
                body.trim()
            )));
        }

        let body: QueryResponse = response.json().await?;
        body.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn parse(value: serde_json::Value) -> Result<QueryResult> {
        serde_json::from_value::<QueryResponse>(value)
            .unwrap()
            .into_result()
    }

    #[test]
    fn test_flattens_series_of_all_statements() {
        let result = parse(json!({
            "results": [
                {
                    "statement_id": 0,
                    "series": [{
                        "name": "cpu",
                        "tags": { "host": "a" },
                        "columns": ["time", "mean"],
                        "values": [[1700000000000000000i64, 0.5]]
                    }]
                },
                {
                    "statement_id": 1,
                    "series": [{ "name": "mem", "columns": ["time", "used"], "values": [] }]
                }
            ]
        }))
        .unwrap();

        assert_eq!(result.series.len(), 2);
        assert_eq!(result.series[0].tag("HOST"), Some("a"));
        assert_eq!(result.series[0].values[0][0], json!(1700000000000000000i64));
        assert!(result.series[1].tags.is_empty());
    }

    #[test]
    fn test_statement_without_series() {
        let result = parse(json!({ "results": [{ "statement_id": 0 }] })).unwrap();
        assert!(result.series.is_empty());
    }

    #[test]
    fn test_statement_error() {
        let err = parse(json!({
            "results": [{ "statement_id": 0, "error": "database not found: nope" }]
        }))
        .unwrap_err();
        assert!(matches!(err, DwhExportError::Database(msg) if msg.contains("database not found")));
    }

    #[test]
    fn test_top_level_error() {
        let err = parse(json!({ "error": "error parsing query" })).unwrap_err();
        assert!(matches!(err, DwhExportError::Database(_)));
    }

    #[test]
    fn test_client_normalizes_config() {
        let client = InfluxClient::new(&InfluxConfig {
            url: "http://influx:8086/".to_string(),
            token: "  ".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        assert_eq!(client.base_url, "http://influx:8086");
        assert!(client.token.is_none());
    }
}
