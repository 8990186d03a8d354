use crate::error::{ProviderError, Result};
use crate::provider::HistoryProvider;
use crate::visit::{VisitRecord, VisitedUrl};
use crate::window::TimeWindow;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// On-disk shape of a history fixture
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryFixture {
    #[serde(default)]
    pub urls: Vec<VisitedUrl>,
    #[serde(default)]
    pub visits: HashMap<String, Vec<VisitRecord>>,
}

/// History held in memory, either built in code or loaded from a JSON fixture.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    urls: Vec<VisitedUrl>,
    visits: HashMap<String, Vec<VisitRecord>>,
    failing_urls: HashSet<String>,
    unavailable: bool,
    latency: Option<Duration>,
    url_latency: HashMap<String, Duration>,
    url_queries: AtomicUsize,
    visit_queries: AtomicUsize,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: HistoryFixture) -> Self {
        Self {
            urls: fixture.urls,
            visits: fixture.visits,
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ProviderError::Unavailable(format!("Failed to read fixture {}: {}", path.display(), e))
        })?;
        let fixture: HistoryFixture = serde_json::from_str(&content)?;
        Ok(Self::from_fixture(fixture))
    }

    /// Register `url` with its visits. The URL shows up in every window unless
    /// `last_visit_time` is set on a `VisitedUrl` added through `with_visited_url`.
    pub fn with_url(mut self, url: &str, visits: Vec<VisitRecord>) -> Self {
        if !self.urls.iter().any(|u| u.url == url) {
            self.urls.push(VisitedUrl::new(url));
        }
        self.visits.entry(url.to_string()).or_default().extend(visits);
        self
    }

    pub fn with_visited_url(mut self, visited: VisitedUrl, visits: Vec<VisitRecord>) -> Self {
        self.visits
            .entry(visited.url.clone())
            .or_default()
            .extend(visits);
        self.urls.push(visited);
        self
    }

    /// Make the per-URL visit query for `url` fail
    pub fn with_failing_url(mut self, url: &str) -> Self {
        self.failing_urls.insert(url.to_string());
        self
    }

    /// Make the top-level URL query fail
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Delay every query by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Delay only the visit query for `url`, on top of any global latency
    pub fn with_url_latency(mut self, url: &str, latency: Duration) -> Self {
        self.url_latency.insert(url.to_string(), latency);
        self
    }

    pub fn url_query_count(&self) -> usize {
        self.url_queries.load(Ordering::Relaxed)
    }

    pub fn visit_query_count(&self) -> usize {
        self.visit_queries.load(Ordering::Relaxed)
    }

    async fn wait(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl HistoryProvider for MemoryProvider {
    async fn query_visited_urls(
        &self,
        window: TimeWindow,
        max_results: usize,
    ) -> Result<Vec<VisitedUrl>> {
        self.url_queries.fetch_add(1, Ordering::Relaxed);
        self.wait().await;

        if self.unavailable {
            return Err(ProviderError::Unavailable(
                "history provider is not reachable".to_string(),
            ));
        }

        Ok(self
            .urls
            .iter()
            .filter(|u| u.last_visit_time.is_none_or(|t| window.contains_millis(t)))
            .take(max_results)
            .cloned()
            .collect())
    }

    async fn query_visits(&self, url: &str) -> Result<Vec<VisitRecord>> {
        self.visit_queries.fetch_add(1, Ordering::Relaxed);
        self.wait().await;
        if let Some(latency) = self.url_latency.get(url) {
            tokio::time::sleep(*latency).await;
        }

        if self.failing_urls.contains(url) {
            return Err(ProviderError::Other(format!("visit lookup failed for {}", url)));
        }

        Ok(self.visits.get(url).cloned().unwrap_or_default())
    }
}
