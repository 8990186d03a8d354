// Typed requests between the viewer and the history/tab host

use crate::builder::{GraphBuilder, normalize_days};
use crate::model::Graph;
use crate::supersede::{BuildTicket, LatestOnly};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use tracing::debug;
use trailgraph_history::HistoryProvider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    #[serde(rename = "GET_OPEN_TABS")]
    ListOpenTabs,
    #[serde(rename = "FOCUS_TAB")]
    FocusTab { url: String },
    #[serde(rename = "OPEN_TAB")]
    OpenTab { url: String },
    #[serde(rename = "getHistory")]
    QueryHistory {
        #[serde(default)]
        days: Option<i64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    OpenTabs { urls: Vec<String> },
    Ack { success: bool },
    History(Graph),
}

/// Whatever owns the browser tabs.
pub trait TabHost: Send + Sync {
    fn list_open_tabs(&self) -> Vec<String>;
    /// Bring the first tab showing `url` to the front. False when no tab matches.
    fn focus_tab(&self, url: &str) -> bool;
    fn open_tab(&self, url: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub url: String,
    pub active: bool,
}

/// In-memory tab strip
#[derive(Debug, Default)]
pub struct TabList {
    tabs: Mutex<Vec<Tab>>,
}

impl TabList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_urls(urls: Vec<String>) -> Self {
        let tabs = urls
            .into_iter()
            .map(|url| Tab { url, active: false })
            .collect();
        Self {
            tabs: Mutex::new(tabs),
        }
    }

    pub fn tabs(&self) -> Vec<Tab> {
        self.tabs.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn active_url(&self) -> Option<String> {
        self.tabs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|t| t.active)
            .map(|t| t.url.clone())
    }
}

impl TabHost for TabList {
    fn list_open_tabs(&self) -> Vec<String> {
        self.tabs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|t| t.url.clone())
            .collect()
    }

    fn focus_tab(&self, url: &str) -> bool {
        let mut tabs = self.tabs.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(target) = tabs.iter().position(|t| t.url == url) else {
            debug!("No open tab for {}", url);
            return false;
        };
        for (idx, tab) in tabs.iter_mut().enumerate() {
            tab.active = idx == target;
        }
        true
    }

    fn open_tab(&self, url: &str) -> bool {
        let mut tabs = self.tabs.lock().unwrap_or_else(PoisonError::into_inner);
        for tab in tabs.iter_mut() {
            tab.active = false;
        }
        tabs.push(Tab {
            url: url.to_string(),
            active: true,
        });
        true
    }
}

/// Answers [`Request`]s using a graph builder and a tab host.
pub struct MessageRouter<P, T> {
    builder: GraphBuilder<P>,
    tabs: T,
    gate: LatestOnly,
}

impl<P: HistoryProvider, T: TabHost> MessageRouter<P, T> {
    pub fn new(builder: GraphBuilder<P>, tabs: T) -> Self {
        Self {
            builder,
            tabs,
            gate: LatestOnly::new(),
        }
    }

    pub fn builder(&self) -> &GraphBuilder<P> {
        &self.builder
    }

    pub fn tabs(&self) -> &T {
        &self.tabs
    }

    /// `None` means the request was a history query overtaken by a newer one.
    pub async fn dispatch(&self, request: Request) -> Option<Response> {
        self.respond(self.admit(request)).await
    }

    /// Fix the request's place in line without doing any work yet.
    ///
    /// A history query admitted later always beats one admitted earlier, so
    /// callers that hand requests to separate tasks admit them first, in
    /// arrival order.
    pub fn admit(&self, request: Request) -> Admitted {
        let ticket = match request {
            Request::QueryHistory { .. } => Some(self.gate.begin()),
            _ => None,
        };
        Admitted { request, ticket }
    }

    pub async fn respond(&self, admitted: Admitted) -> Option<Response> {
        let Admitted { request, ticket } = admitted;
        match request {
            Request::ListOpenTabs => Some(Response::OpenTabs {
                urls: self.tabs.list_open_tabs(),
            }),
            Request::FocusTab { url } => Some(Response::Ack {
                success: self.tabs.focus_tab(&url),
            }),
            Request::OpenTab { url } => Some(Response::Ack {
                success: self.tabs.open_tab(&url),
            }),
            Request::QueryHistory { days } => {
                let days = normalize_days(days.unwrap_or(0));
                let ticket = ticket.unwrap_or_else(|| self.gate.begin());
                ticket
                    .run(self.builder.build_graph(days))
                    .await
                    .into_graph()
                    .map(Response::History)
            }
        }
    }
}

/// A request that already holds its slot in the history queue.
#[derive(Debug)]
pub struct Admitted {
    request: Request,
    ticket: Option<BuildTicket>,
}

impl Admitted {
    pub fn request(&self) -> &Request {
        &self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_tags() {
        let request: Request = serde_json::from_str(r#"{"type": "getHistory", "days": 3}"#).unwrap();
        assert_eq!(request, Request::QueryHistory { days: Some(3) });

        let request: Request = serde_json::from_str(r#"{"type": "getHistory"}"#).unwrap();
        assert_eq!(request, Request::QueryHistory { days: None });

        let request: Request = serde_json::from_str(r#"{"type": "GET_OPEN_TABS"}"#).unwrap();
        assert_eq!(request, Request::ListOpenTabs);

        let json = serde_json::to_value(Request::FocusTab {
            url: "https://a.com/".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"type": "FOCUS_TAB", "url": "https://a.com/"}));
    }

    #[test]
    fn test_unknown_request_type_is_rejected() {
        let result: Result<Request, _> = serde_json::from_str(r#"{"type": "DELETE_HISTORY"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_tab_list_focus_and_open() {
        let tabs = TabList::from_urls(vec!["https://a.com/".to_string(), "https://b.com/".to_string()]);

        assert!(tabs.focus_tab("https://b.com/"));
        assert_eq!(tabs.active_url().as_deref(), Some("https://b.com/"));

        assert!(!tabs.focus_tab("https://c.com/"));
        assert_eq!(tabs.active_url().as_deref(), Some("https://b.com/"));

        assert!(tabs.open_tab("https://c.com/"));
        assert_eq!(tabs.active_url().as_deref(), Some("https://c.com/"));
        assert_eq!(tabs.list_open_tabs().len(), 3);
    }
}
