// History-to-graph reconstruction

use crate::model::{Edge, Graph, Node};
use crate::notice::{Notice, NoticeCallback};
use chrono::{DateTime, Utc};
use futures::stream::{FuturesOrdered, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use trailgraph_history::{HistoryProvider, ProviderError, TimeWindow, VisitId, VisitRecord};

pub const DEFAULT_DAYS: u32 = 7;
pub const DEFAULT_MAX_RESULTS: usize = 1000;
pub const MAX_DAYS: u32 = 36_500;

/// Tunables for a graph build
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Cap handed to the top-level URL query
    pub max_results: usize,
    /// Per-URL visit queries allowed in flight at once
    pub concurrency: usize,
    /// Applied to every provider query individually
    pub query_timeout: Option<Duration>,
    /// Drop fetched visits whose time falls outside the window
    pub clip_to_window: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            concurrency: 4,
            query_timeout: Some(Duration::from_secs(10)),
            clip_to_window: false,
        }
    }
}

/// Map non-positive day counts onto the default lookback
pub fn normalize_days(days: i64) -> u32 {
    if days <= 0 {
        DEFAULT_DAYS
    } else {
        u32::try_from(days).unwrap_or(MAX_DAYS).min(MAX_DAYS)
    }
}

/// Parse a raw days field the way a browser `parseInt` would: leading
/// whitespace, an optional sign, then digits. Anything unusable becomes
/// the default.
pub fn parse_days(raw: &str) -> u32 {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];
    if digits.is_empty() {
        return DEFAULT_DAYS;
    }

    let value = digits.parse::<i64>().unwrap_or(i64::MAX);
    normalize_days(if negative { -value } else { value })
}

/// Correlate a flat list of visits into nodes and referrer edges.
///
/// Node order is first-seen order. Edges follow node order, then the order in
/// which each node's referrers were seen. Referrers that point at a visit not
/// present in `visits` produce no edge.
pub fn assemble_graph(visits: Vec<VisitRecord>) -> Graph {
    struct PendingNode {
        node: Node,
        referrers: Vec<VisitId>,
    }

    let mut pending: Vec<PendingNode> = Vec::new();
    let mut by_url: HashMap<String, usize> = HashMap::new();
    let mut by_visit: HashMap<VisitId, usize> = HashMap::new();

    for visit in &visits {
        let idx = *by_url.entry(visit.url.clone()).or_insert_with(|| {
            pending.push(PendingNode {
                node: Node {
                    url: visit.url.clone(),
                    visit_ids: Vec::new(),
                },
                referrers: Vec::new(),
            });
            pending.len() - 1
        });

        let entry = &mut pending[idx];
        entry.node.visit_ids.push(visit.visit_id.clone());
        if let Some(referrer) = &visit.referring_visit_id
            && !referrer.as_str().is_empty()
        {
            entry.referrers.push(referrer.clone());
        }
        by_visit.insert(visit.visit_id.clone(), idx);
    }

    let mut edges = Vec::new();
    for target in &pending {
        for referrer in &target.referrers {
            if let Some(&source) = by_visit.get(referrer) {
                edges.push(Edge {
                    source: pending[source].node.url.clone(),
                    target: target.node.url.clone(),
                    visit_id: referrer.clone(),
                });
            }
        }
    }

    let nodes = pending.into_iter().map(|p| p.node).collect();
    Graph {
        nodes,
        edges,
        visits,
    }
}

/// Turns a lookback window into a visit graph using a [`HistoryProvider`].
pub struct GraphBuilder<P> {
    provider: P,
    options: BuildOptions,
    notice_callback: Option<NoticeCallback>,
}

impl<P: HistoryProvider> GraphBuilder<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            options: BuildOptions::default(),
            notice_callback: None,
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_notice_callback(mut self, callback: NoticeCallback) -> Self {
        self.notice_callback = Some(callback);
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Build the graph for the last `days` days. Never fails: a provider
    /// outage yields an empty graph and an error notice.
    pub async fn build_graph(&self, days: u32) -> Graph {
        self.build_graph_at(days, Utc::now()).await
    }

    pub async fn build_graph_at(&self, days: u32, now: DateTime<Utc>) -> Graph {
        match self.try_build_at(days, now).await {
            Ok(graph) => graph,
            Err(e) => {
                error!("History query failed: {}", e);
                if let Some(ref callback) = self.notice_callback {
                    callback(Notice::error(format!("History unavailable: {}", e)));
                }
                Graph::empty()
            }
        }
    }

    pub async fn try_build(&self, days: u32) -> Result<Graph, ProviderError> {
        self.try_build_at(days, Utc::now()).await
    }

    pub async fn try_build_at(
        &self,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Graph, ProviderError> {
        let days = normalize_days(i64::from(days));
        let window = TimeWindow::last_days(days, now);
        info!(
            "Building visit graph for the last {} day(s) (max {} urls)",
            days, self.options.max_results
        );

        let urls = self
            .limited(
                self.provider
                    .query_visited_urls(window, self.options.max_results),
            )
            .await?;
        debug!("{} urls in window", urls.len());

        // FuturesOrdered yields in push order regardless of completion order
        let mut remaining = urls.iter();
        let mut in_flight = FuturesOrdered::new();
        for item in remaining.by_ref().take(self.options.concurrency.max(1)) {
            in_flight.push_back(self.fetch_visits(&item.url));
        }
        let mut batches: Vec<Vec<VisitRecord>> = Vec::with_capacity(urls.len());
        while let Some(batch) = in_flight.next().await {
            batches.push(batch);
            if let Some(item) = remaining.next() {
                in_flight.push_back(self.fetch_visits(&item.url));
            }
        }

        let mut visits: Vec<VisitRecord> = batches.into_iter().flatten().collect();
        if self.options.clip_to_window {
            visits.retain(|v| v.visit_time.is_none_or(|t| window.contains_millis(t)));
        }

        let graph = assemble_graph(visits);
        info!(
            "Visit graph complete: {} nodes, {} edges, {} visits",
            graph.nodes.len(),
            graph.edges.len(),
            graph.visits.len()
        );
        Ok(graph)
    }

    async fn fetch_visits(&self, url: &str) -> Vec<VisitRecord> {
        match self.limited(self.provider.query_visits(url)).await {
            Ok(mut visits) => {
                for visit in &mut visits {
                    visit.url = url.to_string();
                }
                visits
            }
            Err(ProviderError::Timeout(limit)) => {
                warn!("Visit lookup for {} timed out after {:?}, skipping", url, limit);
                Vec::new()
            }
            Err(e) => {
                debug!("Skipping visits for {}: {}", url, e);
                Vec::new()
            }
        }
    }

    async fn limited<T>(
        &self,
        query: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        match self.options.query_timeout {
            Some(limit) => tokio::time::timeout(limit, query)
                .await
                .map_err(|_| ProviderError::Timeout(limit))?,
            None => query.await,
        }
    }
}
