// View state for an interactive graph display

use crate::builder::{DEFAULT_DAYS, MAX_DAYS};
use crate::index::GraphIndex;
use crate::layout::ForceLayout;
use crate::message::{Request, Response};
use crate::model::{Edge, Graph, Node};
use crate::notice::Notice;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

const REHEAT_ALPHA: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    GraphLoaded(Graph),
    OpenTabsLoaded(Vec<String>),
    /// Select a node by URL, or clear the selection
    Select(Option<String>),
    SelectNext,
    SelectPrev,
    ToggleLayout,
    Tick,
    /// Focus or open the selected node's page
    Activate,
    Reload,
    AdjustDays(i64),
    Notice(Notice),
    Ack(bool),
}

impl From<Response> for SessionEvent {
    fn from(response: Response) -> Self {
        match response {
            Response::OpenTabs { urls } => SessionEvent::OpenTabsLoaded(urls),
            Response::Ack { success } => SessionEvent::Ack(success),
            Response::History(graph) => SessionEvent::GraphLoaded(graph),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    Send(Request),
}

/// Tab URLs compare equal with or without one trailing slash
pub fn normalize_tab_url(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// Everything the viewer draws, and the requests its input produces.
#[derive(Debug)]
pub struct RenderSession {
    graph: Arc<Graph>,
    index: GraphIndex,
    /// normalized url -> url as the tab host reported it
    open_tabs: HashMap<String, String>,
    selected: Option<usize>,
    layout: ForceLayout,
    layout_running: bool,
    notice: Option<Notice>,
    days: u32,
    loading: bool,
}

impl Default for RenderSession {
    fn default() -> Self {
        Self::new(DEFAULT_DAYS)
    }
}

impl RenderSession {
    pub fn new(days: u32) -> Self {
        Self {
            graph: Arc::new(Graph::empty()),
            index: GraphIndex::default(),
            open_tabs: HashMap::new(),
            selected: None,
            layout: ForceLayout::new(0, Vec::new()),
            layout_running: true,
            notice: None,
            days: days.clamp(1, MAX_DAYS),
            loading: false,
        }
    }

    /// Requests to issue when the view first opens
    pub fn start(&mut self) -> Vec<SessionEffect> {
        self.handle(SessionEvent::Reload)
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionEffect> {
        match event {
            SessionEvent::GraphLoaded(graph) => {
                debug!("Session received graph with {} nodes", graph.nodes.len());
                self.index = GraphIndex::new(&graph);
                self.layout = ForceLayout::from_index(&self.index);
                self.graph = Arc::new(graph);
                self.selected = None;
                self.layout_running = true;
                self.loading = false;
                vec![SessionEffect::Send(Request::ListOpenTabs)]
            }
            SessionEvent::OpenTabsLoaded(urls) => {
                self.open_tabs = urls
                    .into_iter()
                    .map(|url| (normalize_tab_url(&url).to_string(), url))
                    .collect();
                Vec::new()
            }
            SessionEvent::Select(url) => {
                self.selected = url.and_then(|u| self.index.position(&u));
                Vec::new()
            }
            SessionEvent::SelectNext => {
                let count = self.graph.nodes.len();
                if count > 0 {
                    self.selected = Some(self.selected.map_or(0, |i| (i + 1) % count));
                }
                Vec::new()
            }
            SessionEvent::SelectPrev => {
                let count = self.graph.nodes.len();
                if count > 0 {
                    self.selected = Some(self.selected.map_or(count - 1, |i| (i + count - 1) % count));
                }
                Vec::new()
            }
            SessionEvent::ToggleLayout => {
                self.layout_running = !self.layout_running;
                if self.layout_running {
                    self.layout.reheat(REHEAT_ALPHA);
                }
                Vec::new()
            }
            SessionEvent::Tick => {
                if self.layout_running {
                    self.layout.tick();
                }
                Vec::new()
            }
            SessionEvent::Activate => self.activate(),
            SessionEvent::Reload => {
                self.loading = true;
                self.notice = None;
                vec![SessionEffect::Send(Request::QueryHistory {
                    days: Some(i64::from(self.days)),
                })]
            }
            SessionEvent::AdjustDays(delta) => {
                let days = (i64::from(self.days) + delta).clamp(1, i64::from(MAX_DAYS));
                if days == i64::from(self.days) {
                    return Vec::new();
                }
                self.days = days as u32;
                self.handle(SessionEvent::Reload)
            }
            SessionEvent::Notice(notice) => {
                self.notice = Some(notice);
                Vec::new()
            }
            SessionEvent::Ack(success) => {
                if success {
                    vec![SessionEffect::Send(Request::ListOpenTabs)]
                } else {
                    self.notice = Some(Notice::warn("Could not switch to that page"));
                    Vec::new()
                }
            }
        }
    }

    fn activate(&self) -> Vec<SessionEffect> {
        let Some(node) = self.selected_node() else {
            return Vec::new();
        };
        let request = match self.open_tabs.get(normalize_tab_url(&node.url)) {
            Some(tab_url) => Request::FocusTab {
                url: tab_url.clone(),
            },
            None => Request::OpenTab {
                url: node.url.clone(),
            },
        };
        vec![SessionEffect::Send(request)]
    }

    pub fn graph(&self) -> Arc<Graph> {
        Arc::clone(&self.graph)
    }

    pub fn index(&self) -> &GraphIndex {
        &self.index
    }

    pub fn layout(&self) -> &ForceLayout {
        &self.layout
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn layout_running(&self) -> bool {
        self.layout_running
    }

    pub fn layout_indicator(&self) -> &'static str {
        if self.layout_running {
            "Layout Active"
        } else {
            "Layout Disabled"
        }
    }

    pub fn selected_position(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.selected.and_then(|i| self.graph.nodes.get(i))
    }

    pub fn selected_url(&self) -> Option<&str> {
        self.selected_node().map(|n| n.url.as_str())
    }

    pub fn selected_edges(&self) -> Vec<&Edge> {
        match self.selected_url() {
            Some(url) => self.graph.edges_touching(url).collect(),
            None => Vec::new(),
        }
    }

    pub fn is_open(&self, url: &str) -> bool {
        self.open_tabs.contains_key(normalize_tab_url(url))
    }

    /// The selected node and everything one edge away from it
    pub fn is_highlighted_node(&self, url: &str) -> bool {
        match self.selected_url() {
            Some(selected) => selected == url || self.index.is_neighbor(selected, url),
            None => false,
        }
    }

    pub fn is_highlighted_edge(&self, edge: &Edge) -> bool {
        self.selected_url()
            .is_some_and(|selected| edge.source == selected || edge.target == selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::assemble_graph;
    use trailgraph_history::VisitRecord;

    fn loaded() -> RenderSession {
        let mut session = RenderSession::new(7);
        session.handle(SessionEvent::GraphLoaded(assemble_graph(vec![
            VisitRecord::new(1, "https://a.com/"),
            VisitRecord::new(2, "https://b.com/").with_referrer(1),
            VisitRecord::new(3, "https://c.com/"),
        ])));
        session
    }

    #[test]
    fn test_normalize_tab_url_strips_one_slash() {
        assert_eq!(normalize_tab_url("https://a.com/"), "https://a.com");
        assert_eq!(normalize_tab_url("https://a.com"), "https://a.com");
        assert_eq!(normalize_tab_url("https://a.com//"), "https://a.com/");
    }

    #[test]
    fn test_selection_wraps() {
        let mut session = loaded();

        session.handle(SessionEvent::SelectPrev);
        assert_eq!(session.selected_url(), Some("https://c.com/"));
        session.handle(SessionEvent::SelectNext);
        assert_eq!(session.selected_url(), Some("https://a.com/"));

        session.handle(SessionEvent::Select(Some("https://missing.com/".to_string())));
        assert_eq!(session.selected_url(), None);
    }

    #[test]
    fn test_toggle_layout_indicator() {
        let mut session = loaded();
        assert_eq!(session.layout_indicator(), "Layout Active");

        session.handle(SessionEvent::ToggleLayout);
        assert_eq!(session.layout_indicator(), "Layout Disabled");

        session.handle(SessionEvent::ToggleLayout);
        assert!(session.layout_running());
        assert!((session.layout().alpha() - REHEAT_ALPHA).abs() < f64::EPSILON);
    }

    #[test]
    fn test_paused_layout_does_not_move() {
        let mut session = loaded();
        session.handle(SessionEvent::ToggleLayout);
        let before = session.layout().positions().to_vec();

        session.handle(SessionEvent::Tick);
        assert_eq!(session.layout().positions(), before.as_slice());
    }

    #[test]
    fn test_adjust_days_clamps_and_reloads() {
        let mut session = RenderSession::new(1);
        assert!(session.handle(SessionEvent::AdjustDays(-1)).is_empty());

        let effects = session.handle(SessionEvent::AdjustDays(2));
        assert_eq!(session.days(), 3);
        assert_eq!(
            effects,
            vec![SessionEffect::Send(Request::QueryHistory { days: Some(3) })]
        );
        assert!(session.is_loading());
    }
}
