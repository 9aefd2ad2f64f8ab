use std::sync::Arc;

use chrono::NaiveDate;
use readcal_core::ProviderError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::error::{classify_status, malformed, parse_retry_after, transport};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("readcal/", env!("CARGO_PKG_VERSION"));

/// JSON-over-HTTP client shared by one adapter, with per-source throttling.
///
/// Every request waits until at least `min_interval` has passed since the
/// previous one, so a single adapter never hammers its source.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    source: &'static str,
    min_interval: Duration,
    last_request: Arc<Mutex<Instant>>,
}

impl HttpClient {
    pub fn new(source: &'static str, min_interval: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(transport)?;

        Ok(Self {
            http,
            source,
            min_interval,
            last_request: Arc::new(Mutex::new(Instant::now() - min_interval)),
        })
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    /// GET `url` with query parameters and decode the JSON body.
    pub async fn get_json<T, Q>(&self, url: &str, query: &Q) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.rate_limit().await;
        log::debug!("{} GET {}", self.source, url);

        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(transport)?;
        self.decode(resp, url).await
    }

    /// POST a JSON body to `url` and decode the JSON response.
    pub async fn post_json<T, B>(&self, url: &str, body: &B) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.rate_limit().await;
        log::debug!("{} POST {}", self.source, url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        self.decode(resp, url).await
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
        url: &str,
    ) -> Result<T, ProviderError> {
        let status = resp.status();
        let retry_after = parse_retry_after(
            resp.headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
        );
        if let Some(err) = classify_status(status, retry_after, url) {
            log::warn!("{} request failed: {}", self.source, err);
            return Err(err);
        }

        let text = resp.text().await.map_err(transport)?;
        serde_json::from_str(&text).map_err(|e| malformed(e, &text))
    }

    /// Wait until at least `min_interval` has passed since the last request.
    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.min_interval {
            tokio::time::sleep(self.min_interval - elapsed).await;
        }
        *last = Instant::now();
    }
}

/// Parse the `YYYY-MM-DD` prefix of an ISO-8601 timestamp.
pub fn parse_date_prefix(raw: &str) -> Option<NaiveDate> {
    let prefix = raw.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}
