use crate::config::UpstreamConfig;
use crate::errors::FetchError;
use crate::models::{DateRange, RawTimeEntry};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct TimeEntriesEnvelope {
    #[serde(default)]
    data: Option<Vec<Value>>,
}

/// Client for the team time-entries endpoint.
///
/// The endpoint answers a whole date range in one response, so a fetch is a
/// single request (plus retries), never a page walk.
#[derive(Clone)]
pub struct TimeEntriesClient {
    http: HttpClient,
    config: UpstreamConfig,
}

impl TimeEntriesClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, FetchError> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub async fn fetch(&self, range: &DateRange) -> Result<Vec<RawTimeEntry>, FetchError> {
        let started = Instant::now();
        let mut attempt: u32 = 0;
        loop {
            match self.fetch_once(range).await {
                Ok(entries) => {
                    info!(
                        start = %range.start_label(),
                        end = %range.end_label(),
                        records = entries.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "fetched time entries"
                    );
                    return Ok(entries);
                }
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_backoff * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "time entries request failed, retrying: {err}"
                    );
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fetch_once(&self, range: &DateRange) -> Result<Vec<RawTimeEntry>, FetchError> {
        let mut query = vec![
            ("start_date", range.start_ms().to_string()),
            ("end_date", range.end_ms().to_string()),
        ];
        if !self.config.assignees.is_empty() {
            query.push(("assignee", self.config.assignee_csv()));
        }

        let response = self
            .http
            .get(self.config.time_entries_url())
            .header(AUTHORIZATION, self.config.api_key.as_str())
            .header(CONTENT_TYPE, "application/json")
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Upstream { status, body });
        }

        let bytes = response.bytes().await?;
        let envelope: TimeEntriesEnvelope = serde_json::from_slice(&bytes)?;
        Ok(into_entries(envelope.data.unwrap_or_default()))
    }
}

fn into_entries(items: Vec<Value>) -> Vec<RawTimeEntry> {
    items
        .into_iter()
        .filter_map(|item| {
            if !item.is_object() {
                debug!("skipping non-object time entry: {item}");
                return None;
            }
            match serde_json::from_value::<RawTimeEntry>(item) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!("skipping unreadable time entry: {err}");
                    None
                }
            }
        })
        .collect()
}
