use crate::error::{ProviderError, Result};
use crate::provider::HistoryProvider;
use crate::visit::{VisitRecord, VisitedUrl};
use crate::window::TimeWindow;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Talks to a history bridge over JSON.
///
/// - `GET {base}/history/urls?start=<ms>&end=<ms>&max=<n>` answers `[VisitedUrl]`
/// - `GET {base}/history/visits?url=<url>` answers `[VisitRecord]`
pub struct HttpProvider {
    client: Client,
    base_url: Url,
}

impl HttpProvider {
    pub fn new(base_url: Url) -> Result<Self> {
        Self::with_timeout(base_url, 10)
    }

    /// A `timeout_secs` of 0 leaves requests without any client-side timeout.
    pub fn with_timeout(base_url: Url, timeout_secs: u64) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(concat!("trailgraph/", env!("CARGO_PKG_VERSION")))
            .pool_idle_timeout(Duration::from_secs(90));
        if timeout_secs > 0 {
            builder = builder
                .timeout(Duration::from_secs(timeout_secs))
                .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)));
        }
        let client = builder.build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        // Keep any path prefix the bridge is mounted under
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path)
            .map_err(|e| ProviderError::ParseError(format!("Invalid endpoint {}: {}", path, e)))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ProviderError::Unavailable(e.to_string())
                } else {
                    ProviderError::HttpError(e)
                }
            })?
            .error_for_status()?;

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl HistoryProvider for HttpProvider {
    async fn query_visited_urls(
        &self,
        window: TimeWindow,
        max_results: usize,
    ) -> Result<Vec<VisitedUrl>> {
        let url = self.endpoint("history/urls")?;
        self.get_json(
            url,
            &[
                ("start", window.start_millis().to_string()),
                ("end", window.end_millis().to_string()),
                ("max", max_results.to_string()),
            ],
        )
        .await
    }

    async fn query_visits(&self, url: &str) -> Result<Vec<VisitRecord>> {
        let endpoint = self.endpoint("history/visits")?;
        self.get_json(endpoint, &[("url", url.to_string())]).await
    }
}
