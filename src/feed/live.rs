//! Network-backed producer against a filtered-stream HTTP API. Setup
//! replaces the server-side rules with one OR-combined keyword rule and
//! then reads the stream line-by-line; every failure maps to a `FeedError`
//! so the façade can degrade instead of crashing.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::LiveCredentials;
use crate::feed::{EventProducer, FeedError};
use crate::model::{Engagement, RawEvent};

const DEFAULT_STREAM_BASE: &str = "https://api.twitter.com/2/tweets/search/stream";

/// Rate-limit signals that trigger the synthetic fallback.
fn is_rate_limit(status: u16) -> bool {
    status == 420 || status == 429
}

pub struct LiveSource {
    client: reqwest::Client,
    bearer_token: String,
    base_url: String,
}

impl LiveSource {
    pub fn new(creds: &LiveCredentials) -> Self {
        // No overall request timeout: the stream is long-lived by design.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            client,
            bearer_token: creds.bearer_token.clone(),
            base_url: DEFAULT_STREAM_BASE.to_string(),
        }
    }

    /// Point at a different endpoint (tests against a local server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn rules_url(&self) -> String {
        format!("{}/rules", self.base_url)
    }

    fn stream_url(&self) -> String {
        format!(
            "{}?tweet.fields=author_id,created_at,public_metrics",
            self.base_url
        )
    }

    fn check_status(status: reqwest::StatusCode, what: &str) -> Result<(), FeedError> {
        let code = status.as_u16();
        if is_rate_limit(code) {
            return Err(FeedError::RateLimited { status: code });
        }
        if !status.is_success() {
            return Err(FeedError::Setup(anyhow!("{what} returned HTTP {code}")));
        }
        Ok(())
    }

    /// Drop existing stream rules and install one OR-combination of the
    /// tracked keywords.
    async fn replace_rules(&self, keywords: &[String]) -> Result<(), FeedError> {
        let resp = self
            .client
            .get(self.rules_url())
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| FeedError::Setup(e.into()))?;
        Self::check_status(resp.status(), "rule listing")?;
        let existing: RulesResponse = resp
            .json()
            .await
            .map_err(|e| FeedError::Setup(e.into()))?;

        let ids: Vec<String> = existing
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.id)
            .collect();
        if !ids.is_empty() {
            let resp = self
                .client
                .post(self.rules_url())
                .bearer_auth(&self.bearer_token)
                .json(&json!({ "delete": { "ids": ids } }))
                .send()
                .await
                .map_err(|e| FeedError::Setup(e.into()))?;
            Self::check_status(resp.status(), "rule deletion")?;
        }

        let rule = keywords.join(" OR ");
        let resp = self
            .client
            .post(self.rules_url())
            .bearer_auth(&self.bearer_token)
            .json(&json!({ "add": [{ "value": rule }] }))
            .send()
            .await
            .map_err(|e| FeedError::Setup(e.into()))?;
        Self::check_status(resp.status(), "rule registration")?;
        info!(rule = %rule, "live stream rules installed");
        Ok(())
    }
}

#[async_trait::async_trait]
impl EventProducer for LiveSource {
    fn name(&self) -> &'static str {
        "live"
    }

    async fn run(
        &self,
        keywords: &[String],
        tx: mpsc::Sender<RawEvent>,
        running: Arc<AtomicBool>,
    ) -> Result<(), FeedError> {
        self.replace_rules(keywords).await?;

        let resp = self
            .client
            .get(self.stream_url())
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| FeedError::Setup(e.into()))?;
        Self::check_status(resp.status(), "stream connect")?;
        info!("live stream connected");

        let mut resp = resp;
        let mut buf: Vec<u8> = Vec::new();
        while running.load(Ordering::Acquire) {
            match resp.chunk().await {
                Ok(Some(chunk)) => {
                    buf.extend_from_slice(&chunk);
                    while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                        let line: Vec<u8> = buf.drain(..=pos).collect();
                        if !running.load(Ordering::Acquire) {
                            return Ok(());
                        }
                        if let Some(ev) = parse_stream_line(&line) {
                            if tx.send(ev).await.is_err() {
                                return Ok(()); // receiver gone
                            }
                        }
                    }
                }
                Ok(None) => return Err(FeedError::Stream(anyhow!("live stream ended"))),
                Err(e) => return Err(FeedError::Stream(e.into())),
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default)]
struct RulesResponse {
    #[serde(default)]
    data: Option<Vec<StreamRule>>,
}

#[derive(Debug, Deserialize)]
struct StreamRule {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StreamPayload {
    data: StreamItem,
}

#[derive(Debug, Deserialize)]
struct StreamItem {
    text: String,
    #[serde(default)]
    author_id: Option<String>,
    #[serde(default)]
    public_metrics: Option<PublicMetrics>,
}

#[derive(Debug, Deserialize, Default)]
struct PublicMetrics {
    #[serde(default)]
    retweet_count: u32,
    #[serde(default)]
    like_count: u32,
}

/// Map one stream line to a `RawEvent`. Keep-alive blanks and unparseable
/// lines are absorbed, not surfaced.
fn parse_stream_line(line: &[u8]) -> Option<RawEvent> {
    let line = std::str::from_utf8(line).ok()?.trim();
    if line.is_empty() {
        return None;
    }
    let payload: StreamPayload = match serde_json::from_str(line) {
        Ok(p) => p,
        Err(err) => {
            debug!(error = %err, "skipping unparseable stream line");
            return None;
        }
    };
    let metrics = payload.data.public_metrics.unwrap_or_default();
    Some(RawEvent {
        text: payload.data.text,
        observed_at: Utc::now(),
        author: payload
            .data
            .author_id
            .unwrap_or_else(|| "unknown".to_string()),
        engagement: Engagement {
            retweets: metrics.retweet_count,
            favorites: metrics.like_count,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_stream_line_with_metrics() {
        let line = br#"{"data":{"text":"hello #AI","author_id":"42","public_metrics":{"retweet_count":3,"like_count":7}}}"#;
        let ev = parse_stream_line(line).unwrap();
        assert_eq!(ev.text, "hello #AI");
        assert_eq!(ev.author, "42");
        assert_eq!(ev.engagement.retweets, 3);
        assert_eq!(ev.engagement.favorites, 7);
    }

    #[test]
    fn missing_metrics_default_to_zero() {
        let line = br#"{"data":{"text":"plain"}}"#;
        let ev = parse_stream_line(line).unwrap();
        assert_eq!(ev.author, "unknown");
        assert_eq!(ev.engagement, Engagement::default());
    }

    #[test]
    fn keepalive_and_garbage_lines_are_absorbed() {
        assert!(parse_stream_line(b"\n").is_none());
        assert!(parse_stream_line(b"not json at all").is_none());
        assert!(parse_stream_line(&[0xff, 0xfe]).is_none());
    }

    #[test]
    fn rate_limit_statuses_map_to_rate_limited() {
        let err =
            LiveSource::check_status(reqwest::StatusCode::from_u16(429).unwrap(), "x").unwrap_err();
        assert!(matches!(err, FeedError::RateLimited { status: 429 }));
        let err =
            LiveSource::check_status(reqwest::StatusCode::from_u16(420).unwrap(), "x").unwrap_err();
        assert!(matches!(err, FeedError::RateLimited { status: 420 }));
    }

    #[test]
    fn other_failures_map_to_setup() {
        let err =
            LiveSource::check_status(reqwest::StatusCode::UNAUTHORIZED, "x").unwrap_err();
        assert!(matches!(err, FeedError::Setup(_)));
    }
}
