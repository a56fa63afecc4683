//! Bulk read from the hosted backend's REST interface.
//!
//! The backend exposes each table at `{api_url}/rest/v1/{table}` and
//! authenticates with the anonymous key sent both as `apikey` and as a
//! bearer token. Realtime changes travel over a separate websocket
//! protocol that this store does not speak.

use async_trait::async_trait;
use corruption_watch_case_models::CaseRecord;

use crate::{CaseStore, StoreConfig, StoreError, Subscription};

/// Maximum length of the response body kept in [`StoreError::Status`].
const BODY_PREVIEW_LEN: usize = 500;

/// REST-backed [`CaseStore`].
pub struct RestStore {
    config: StoreConfig,
    client: reqwest::Client,
}

impl RestStore {
    /// Creates a store for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Http`] if the HTTP client cannot be built.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }

    /// URL of the bulk read, newest cases first.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "{}/rest/v1/{}?select=*&order=created_at.desc",
            self.config.api_url.trim_end_matches('/'),
            self.config.table
        )
    }
}

fn preview(body: &str) -> String {
    if body.len() > BODY_PREVIEW_LEN {
        let mut end = BODY_PREVIEW_LEN;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[async_trait]
impl CaseStore for RestStore {
    fn name(&self) -> &str {
        "rest"
    }

    async fn fetch_all(&self) -> Result<Vec<CaseRecord>, StoreError> {
        let url = self.endpoint();
        log::info!("Fetching case records from {url}");

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            log::error!("Case fetch failed with {status}");
            return Err(StoreError::Status {
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        let cases: Vec<CaseRecord> = serde_json::from_str(&body)?;
        log::info!("Fetched {} case record(s)", cases.len());
        Ok(cases)
    }

    async fn subscribe(&self) -> Result<Subscription, StoreError> {
        Err(StoreError::Subscription {
            reason: "REST store has no realtime channel".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_targets_the_case_table() {
        let store = RestStore::new(StoreConfig::new("https://example.test/", "anon")).unwrap();
        assert_eq!(
            store.endpoint(),
            "https://example.test/rest/v1/corruption_cases?select=*&order=created_at.desc"
        );
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let body = "é".repeat(400);
        let cut = preview(&body);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= BODY_PREVIEW_LEN + 3);
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn has_no_live_channel() {
        let store = RestStore::new(StoreConfig::new("https://example.test", "anon")).unwrap();
        assert!(!store.subscribe().await.unwrap_err().is_fetch_error());
    }
}
