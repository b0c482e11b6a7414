//! Priority-auction relay client: JSON-RPC `sendBundle` over HTTP,
//! round-robin across endpoints with exponential backoff, and a
//! non-retryable error classifier.

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use base64::{Engine as _, engine::general_purpose};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay rejected bundle: {0}")]
    NonRetryable(String),
    #[error("relay rpc error: {0}")]
    Rpc(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("all relay endpoints failed")]
    Exhausted,
}

/// Errors the relay will keep returning no matter how often we retry.
fn is_non_retryable(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("already processed") || lowered.contains("blockhash not found")
}

pub struct RelayClient {
    endpoints: Vec<String>,
    client: reqwest::Client,
    cursor: AtomicUsize,
    max_retries: usize,
}

impl RelayClient {
    #[must_use]
    pub fn new(endpoints: Vec<String>, max_retries: usize) -> Self {
        Self {
            endpoints,
            client: reqwest::Client::new(),
            cursor: AtomicUsize::new(0),
            max_retries,
        }
    }

    fn next_endpoint(&self) -> &str {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        &self.endpoints[index % self.endpoints.len()]
    }

    /// Submits serialized transactions; returns the relay bundle id.
    /// Retries transient failures round-robin with exponential backoff;
    /// gives up immediately on non-retryable rejections.
    pub async fn send_bundle(&self, transactions: &[Vec<u8>]) -> Result<String, RelayError> {
        let encoded: Vec<String> = transactions
            .iter()
            .map(|tx| general_purpose::STANDARD.encode(tx))
            .collect();

        let mut backoff = Duration::from_millis(50);
        let mut last_error = RelayError::Exhausted;

        for attempt in 0..=self.max_retries {
            let endpoint = self.next_endpoint();
            match self.send_once(endpoint, &encoded).await {
                Ok(bundle_id) => {
                    debug!(endpoint, bundle_id, attempt, "Bundle accepted by relay");
                    return Ok(bundle_id);
                }
                Err(RelayError::NonRetryable(message)) => {
                    return Err(RelayError::NonRetryable(message));
                }
                Err(e) => {
                    warn!(endpoint, attempt, error = %e, "Relay submit failed");
                    last_error = e;
                }
            }

            if attempt < self.max_retries {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }

        Err(last_error)
    }

    async fn send_once(&self, endpoint: &str, encoded: &[String]) -> Result<String, RelayError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "sendBundle",
            "params": [encoded],
        });

        let response: Value = self
            .client
            .post(endpoint)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown relay error")
                .to_owned();
            if is_non_retryable(&message) {
                return Err(RelayError::NonRetryable(message));
            }
            return Err(RelayError::Rpc(message));
        }

        response
            .get("result")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| RelayError::Rpc("missing result".to_owned()))
    }

    /// Polls `getBundleStatuses`; returns the status string per id when
    /// the relay knows the bundle.
    pub async fn get_bundle_statuses(
        &self,
        bundle_ids: &[String],
    ) -> Result<Vec<Option<String>>, RelayError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getBundleStatuses",
            "params": [bundle_ids],
        });

        let endpoint = self.next_endpoint();
        let response: Value = self
            .client
            .post(endpoint)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.get("error") {
            return Err(RelayError::Rpc(
                error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown relay error")
                    .to_owned(),
            ));
        }

        let statuses = response
            .pointer("/result/value")
            .and_then(Value::as_array)
            .ok_or_else(|| RelayError::Rpc("missing result".to_owned()))?;

        Ok(bundle_ids
            .iter()
            .map(|id| {
                statuses.iter().find_map(|status| {
                    (status.get("bundle_id").and_then(Value::as_str) == Some(id)).then(|| {
                        status
                            .get("confirmation_status")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown")
                            .to_owned()
                    })
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Server;

    use super::*;

    fn sample_txs() -> Vec<Vec<u8>> {
        vec![vec![1, 2, 3], vec![4, 5, 6]]
    }

    #[tokio::test]
    async fn test_send_bundle_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"bundle-123"}"#)
            .create_async()
            .await;

        let client = RelayClient::new(vec![server.url()], 0);
        let bundle_id = client.send_bundle(&sample_txs()).await.unwrap();

        assert_eq!(bundle_id, "bundle-123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_bundle_non_retryable_stops_immediately() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"Bundle already processed"}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let client = RelayClient::new(vec![server.url()], 5);
        let result = client.send_bundle(&sample_txs()).await;

        assert!(matches!(result, Err(RelayError::NonRetryable(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_bundle_retries_across_endpoints() {
        let mut failing = Server::new_async().await;
        let fail_mock = failing
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"rate limited"}}"#)
            .create_async()
            .await;

        let mut healthy = Server::new_async().await;
        let ok_mock = healthy
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"bundle-777"}"#)
            .create_async()
            .await;

        let client = RelayClient::new(vec![failing.url(), healthy.url()], 2);
        let bundle_id = client.send_bundle(&sample_txs()).await.unwrap();

        assert_eq!(bundle_id, "bundle-777");
        fail_mock.assert_async().await;
        ok_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_bundle_statuses() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                r#"{"jsonrpc":"2.0","id":1,"result":{"value":[
                    {"bundle_id":"a","confirmation_status":"finalized"}
                ]}}"#,
            )
            .create_async()
            .await;

        let client = RelayClient::new(vec![server.url()], 0);
        let statuses = client
            .get_bundle_statuses(&["a".to_owned(), "b".to_owned()])
            .await
            .unwrap();

        assert_eq!(statuses[0].as_deref(), Some("finalized"));
        assert_eq!(statuses[1], None);
    }
}
