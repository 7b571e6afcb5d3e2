//! HTTP client for a counter server

use crate::model::Counter;
use crate::model::Increment;
use crate::model::IncrementCounterInput;
use crate::service::CounterService;
use anyhow::bail;
use anyhow::Context;
use async_trait::async_trait;
use dropshot::HttpErrorResponseBody;
use slog::debug;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:12344";

pub struct CounterClient {
    log: slog::Logger,
    base_url: String,
    http: reqwest::Client,
}

impl CounterClient {
    pub fn new(log: slog::Logger, base_url: &str) -> CounterClient {
        CounterClient {
            log,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode(
        &self,
        response: reqwest::Response,
    ) -> anyhow::Result<Counter> {
        let status = response.status();
        if status.is_success() {
            return response.json().await.context("decoding counter");
        }

        let body =
            response.text().await.context("reading error response")?;
        match serde_json::from_str::<HttpErrorResponseBody>(&body) {
            Ok(error) => bail!(
                "server responded with {} (request {}): {}",
                status,
                error.request_id,
                error.message
            ),
            Err(_) => bail!("server responded with {}: {}", status, body),
        }
    }
}

#[async_trait]
impl CounterService for CounterClient {
    async fn get_counter(&self) -> anyhow::Result<Counter> {
        let url = self.url("/counter");
        debug!(&self.log, "fetching counter"; "url" => &url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;
        self.decode(response).await
    }

    async fn increment_counter(
        &self,
        increment: Increment,
    ) -> anyhow::Result<Counter> {
        let url = self.url("/counter/increment");
        debug!(&self.log, "incrementing counter";
            "url" => &url, "increment" => increment.get());
        let response = self
            .http
            .post(&url)
            .json(&IncrementCounterInput::from(increment))
            .send()
            .await
            .with_context(|| format!("POST {}", url))?;
        self.decode(response).await
    }
}
