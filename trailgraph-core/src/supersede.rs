use crate::model::Graph;
use futures::future::{AbortHandle, AbortRegistration, Abortable};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    Completed(Graph),
    /// A newer build started before this one finished
    Superseded,
}

impl BuildOutcome {
    pub fn into_graph(self) -> Option<Graph> {
        match self {
            BuildOutcome::Completed(graph) => Some(graph),
            BuildOutcome::Superseded => None,
        }
    }
}

/// Last-request-wins gate for graph builds.
///
/// Every call to [`LatestOnly::run`] aborts whichever build is still in
/// flight, dropping its outstanding provider queries.
#[derive(Debug, Default)]
pub struct LatestOnly {
    current: Mutex<Option<AbortHandle>>,
    generation: AtomicU64,
}

impl LatestOnly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the newest slot right away, aborting whatever build holds it.
    ///
    /// Order between competing builds is the order of `begin` calls, not the
    /// order their futures first get polled.
    pub fn begin(&self) -> BuildTicket {
        let (handle, registration) = AbortHandle::new_pair();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.replace(handle) {
            previous.abort();
        }
        BuildTicket {
            generation,
            registration,
        }
    }

    pub async fn run<F>(&self, build: F) -> BuildOutcome
    where
        F: Future<Output = Graph>,
    {
        self.begin().run(build).await
    }

    /// Number of builds started through this gate
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

/// A reserved build slot from [`LatestOnly::begin`].
#[derive(Debug)]
pub struct BuildTicket {
    generation: u64,
    registration: AbortRegistration,
}

impl BuildTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn run<F>(self, build: F) -> BuildOutcome
    where
        F: Future<Output = Graph>,
    {
        match Abortable::new(build, self.registration).await {
            Ok(graph) => BuildOutcome::Completed(graph),
            Err(_) => {
                debug!("Build #{} superseded", self.generation);
                BuildOutcome::Superseded
            }
        }
    }
}
