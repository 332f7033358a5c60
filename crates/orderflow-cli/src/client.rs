use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// Order lookup returned by `GET /order/{id}`.
pub struct OrderLookup {
    /// `X-Cache` header value (`HIT` or `MISS`).
    pub cache: Option<String>,
    pub body: Value,
}

/// Receipt returned by `POST /publish`.
#[derive(Debug, Deserialize)]
pub struct PublishReceipt {
    pub topic: String,
    pub offset: u64,
}

pub struct OrderflowClient {
    http: reqwest::Client,
    base_url: String,
}

impl OrderflowClient {
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Returns `None` when the service does not know the order.
    pub async fn get_order(&self, order_uid: &str) -> Result<Option<OrderLookup>> {
        let resp = self
            .http
            .get(self.url(&format!("order/{order_uid}")))
            .send()
            .await
            .context("Failed to connect to server")?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let cache = resp
            .headers()
            .get("x-cache")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("GET failed (HTTP {status}): {body}");
        }
        let body = serde_json::from_str(&body).context("Server returned invalid JSON")?;
        Ok(Some(OrderLookup { cache, body }))
    }

    pub async fn publish(&self, payload: Vec<u8>) -> Result<PublishReceipt> {
        let resp = self
            .http
            .post(self.url("publish"))
            .header("Content-Type", "application/json")
            .body(payload)
            .send()
            .await
            .context("Failed to connect to server")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Publish failed (HTTP {status}): {body}");
        }
        resp.json().await.context("Unexpected publish response")
    }

    pub async fn health(&self) -> Result<(u16, String)> {
        let resp = self
            .http
            .get(self.url("readyz"))
            .send()
            .await
            .context("Failed to connect to server")?;
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Ok((status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = OrderflowClient::new("http://localhost:8081/");
        assert_eq!(client.url("order/A1"), "http://localhost:8081/order/A1");
    }
}
