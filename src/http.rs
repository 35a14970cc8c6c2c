use crate::record::LogRecord;
use crate::sink::CommitSink;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::error::Error;
use std::time::Duration;

/// Configuration for [`HttpCommitSink`].
///
/// The sink POSTs every batch as one JSON document,
/// `{"arcsData": [<arc>, ...]}`, to `url`.
#[derive(Clone, Debug)]
pub struct HttpCommitConfig {
    /// Full endpoint URL, e.g. "https://telemetry.local/arcs"
    pub url: String,
    pub bearer_token: Option<String>,
    /// Upper bound for one commit request.
    pub timeout: Duration,
}

impl HttpCommitConfig {
    pub fn new(url: impl Into<String>) -> Self {
        HttpCommitConfig {
            url: url.into(),
            bearer_token: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Commit endpoint reached over HTTP.
#[derive(Clone)]
pub struct HttpCommitSink {
    client: Client,
    config: HttpCommitConfig,
}

impl HttpCommitSink {
    /// Construct a new sink instance using the provided configuration.
    ///
    /// **Parameters**
    /// - `config`: [`HttpCommitConfig`] describing the endpoint, optional
    ///   bearer token and request timeout.
    ///
    /// **Returns**
    /// - A ready-to-use [`HttpCommitSink`] that can be passed into
    ///   [`crate::logger::ArcLogger::spawn`].
    pub fn new(config: HttpCommitConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, config }
    }

    pub fn config(&self) -> &HttpCommitConfig {
        &self.config
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommitPayload<'a> {
    arcs_data: &'a [LogRecord],
}

#[async_trait]
impl CommitSink for HttpCommitSink {
    async fn commit_arcs(&self, arcs: Vec<LogRecord>) -> Result<(), Box<dyn Error + Send + Sync>> {
        let payload = CommitPayload { arcs_data: &arcs };
        let mut request = self.client.post(&self.config.url).json(&payload);
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(format!("arc commit failed with status {}: {}", status, text).into())
        }
    }
}
