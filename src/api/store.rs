//! Event persistence in a Firebase Realtime Database, over its REST API.
//!
//! Events live under `events/{dateKey}/{eventId}`. The live subscription uses
//! the database's server-sent-events stream; every change notification
//! triggers a fresh read of the whole `events` subtree, which then replaces
//! the local cache wholesale.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{fetch_json, join_url};
use crate::config::NetworkConfig;
use crate::datekey::DateKey;
use crate::event::Event;

/// Stored events grouped by day, then by id.
pub type EventCache = BTreeMap<DateKey, BTreeMap<String, Event>>;

/// Firebase sends keep-alives every 30 seconds on an idle stream.
const STREAM_READ_TIMEOUT_SECS: u64 = 90;

#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

/// One server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental `text/event-stream` decoder.
///
/// Bytes may arrive split at arbitrary points, so incomplete lines are kept
/// until their newline shows up.
#[derive(Debug, Default)]
pub struct SseParser {
    buf: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&raw);
            let line = text.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if self.event.is_some() || !self.data.is_empty() {
                    out.push(SseEvent {
                        event: self.event.take().unwrap_or_else(|| "message".to_string()),
                        data: self.data.join("\n"),
                    });
                    self.data.clear();
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => self.event = Some(value.to_string()),
                "data" => self.data.push(value.to_string()),
                _ => {}
            }
        }
        out
    }
}

/// Decode a raw `events` snapshot, dropping entries that do not parse.
pub fn parse_snapshot(snapshot: Value) -> EventCache {
    let mut cache = EventCache::new();
    let Value::Object(days) = snapshot else {
        return cache;
    };

    for (raw_key, bucket) in days {
        let key: DateKey = match raw_key.parse() {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Ignoring events under bad key {:?}: {}", raw_key, e);
                continue;
            }
        };
        let Value::Object(entries) = bucket else {
            continue;
        };
        let mut events = BTreeMap::new();
        for (id, raw_event) in entries {
            match serde_json::from_value::<Event>(raw_event) {
                Ok(mut event) => {
                    if event.id.is_none() {
                        event.id = Some(id.clone());
                    }
                    events.insert(id, event);
                }
                Err(e) => tracing::warn!("Ignoring malformed event {}/{}: {}", raw_key, id, e),
            }
        }
        if !events.is_empty() {
            cache.insert(key, events);
        }
    }
    cache
}

#[derive(Clone, Debug)]
pub struct FirebaseStore {
    client: reqwest::Client,
    stream_client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl FirebaseStore {
    pub fn new(
        base_url: impl Into<String>,
        auth_token: Option<String>,
        network_config: &NetworkConfig,
        user_agent: &str,
    ) -> Result<Self> {
        let client = super::http_client(network_config, user_agent)?;
        // A whole-request timeout would cut the long-lived stream, so only
        // bound connecting and the gap between reads.
        let stream_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(network_config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(STREAM_READ_TIMEOUT_SECS))
            .user_agent(user_agent)
            .build()
            .context("Failed to create streaming HTTP client")?;

        Ok(Self {
            client,
            stream_client,
            base_url: base_url.into(),
            auth_token,
        })
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, &format!("{path}.json"))
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        }
    }

    /// Read the whole `events` subtree.
    pub async fn fetch_all(&self) -> Result<EventCache> {
        let request = self.authed(self.client.get(self.url("events")));
        let snapshot: Value = fetch_json(request, "Firebase").await?;
        Ok(parse_snapshot(snapshot))
    }

    /// Create or overwrite an event under its date.
    ///
    /// Events without an id are first pushed to obtain one, then written
    /// again with the id embedded. Returns the id.
    pub async fn upsert(&self, date: DateKey, event: &mut Event) -> Result<String> {
        let id = match &event.id {
            Some(id) => id.clone(),
            None => {
                let request = self
                    .authed(self.client.post(self.url(&format!("events/{date}"))))
                    .json(&*event);
                let pushed: PushResponse = fetch_json(request, "Firebase").await?;
                event.id = Some(pushed.name.clone());
                pushed.name
            }
        };

        let request = self
            .authed(self.client.put(self.url(&format!("events/{date}/{id}"))))
            .json(&*event);
        let _: Value = fetch_json(request, "Firebase").await?;
        tracing::info!("Saved event {} on {}", id, date);
        Ok(id)
    }

    /// Follow the live stream, sending a full snapshot on every change.
    ///
    /// Returns `Ok(())` when the server ends the stream or the receiver is
    /// dropped, and an error when the stream fails or access is revoked.
    pub async fn subscribe(&self, tx: mpsc::Sender<EventCache>) -> Result<()> {
        let request = self
            .authed(self.stream_client.get(self.url("events")))
            .header(ACCEPT, "text/event-stream");
        let mut response = request
            .send()
            .await
            .context("Failed to open Firebase event stream")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Firebase stream returned error status: {}", status);
        }
        tracing::info!("Subscribed to remote events");

        let mut parser = SseParser::default();
        while let Some(chunk) = response
            .chunk()
            .await
            .context("Firebase event stream failed")?
        {
            for message in parser.feed(&chunk) {
                match message.event.as_str() {
                    "put" | "patch" => {
                        let cache = self.fetch_all().await?;
                        tracing::debug!("Remote change: {} days with events", cache.len());
                        if tx.send(cache).await.is_err() {
                            return Ok(());
                        }
                    }
                    "keep-alive" => {}
                    "cancel" | "auth_revoked" => {
                        anyhow::bail!("Firebase closed the stream ({})", message.event)
                    }
                    other => tracing::debug!("Ignoring stream event {:?}", other),
                }
            }
        }
        Ok(())
    }
}
