use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;
use tracing::debug;

use super::{to_line_protocol, Point, SettlementSink, SinkError};
use crate::config::InfluxConfig;

/// InfluxDB v2 write API client.
#[derive(Clone)]
pub struct InfluxSink {
    write_url: String,
    org: String,
    bucket: String,
    client: reqwest::Client,
}

impl InfluxSink {
    pub fn new(cfg: &InfluxConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("leg-collector/0.1"));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        let mut auth = HeaderValue::from_str(&format!("Token {}", cfg.token))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .default_headers(headers)
            .build()?;
        Ok(Self {
            write_url: format!("{}/api/v2/write", cfg.url.trim_end_matches('/')),
            org: cfg.org.clone(),
            bucket: cfg.bucket.clone(),
            client,
        })
    }
}

#[async_trait]
impl SettlementSink for InfluxSink {
    async fn write(&self, points: &[Point]) -> Result<(), SinkError> {
        let body = to_line_protocol(points);
        let resp = self
            .client
            .post(&self.write_url)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ns"),
            ])
            .body(body)
            .send()
            .await
            .map_err(|e| SinkError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SinkError::Rejected { status: status.as_u16(), body });
        }
        debug!(points = points.len(), "batch written to influx");
        Ok(())
    }
}
