use crate::error::Result;
use crate::visit::{VisitRecord, VisitedUrl};
use crate::window::TimeWindow;
use std::future::Future;
use std::sync::Arc;

/// Source of browsing history.
///
/// Both queries are independent and may fail on their own; callers treat
/// the returned data as partial.
pub trait HistoryProvider: Send + Sync {
    /// Distinct URLs visited inside `window`, capped at `max_results`
    fn query_visited_urls(
        &self,
        window: TimeWindow,
        max_results: usize,
    ) -> impl Future<Output = Result<Vec<VisitedUrl>>> + Send;

    /// Every known visit to `url`, in provider order. Not window-filtered.
    fn query_visits(&self, url: &str) -> impl Future<Output = Result<Vec<VisitRecord>>> + Send;
}

impl<P: HistoryProvider> HistoryProvider for Arc<P> {
    fn query_visited_urls(
        &self,
        window: TimeWindow,
        max_results: usize,
    ) -> impl Future<Output = Result<Vec<VisitedUrl>>> + Send {
        (**self).query_visited_urls(window, max_results)
    }

    fn query_visits(&self, url: &str) -> impl Future<Output = Result<Vec<VisitRecord>>> + Send {
        (**self).query_visits(url)
    }
}
