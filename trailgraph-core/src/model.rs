use serde::{Deserialize, Serialize};
use trailgraph_history::{VisitId, VisitRecord};

/// One distinct URL in the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub url: String,
    /// Every visit observed for this URL, in discovery order
    pub visit_ids: Vec<VisitId>,
}

/// One navigation from `source` to `target`, anchored to the referring visit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub visit_id: VisitId,
}

/// Snapshot handed to the presentation layer. Rebuilt from scratch on every query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub visits: Vec<VisitRecord>,
}

impl Graph {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.visits.is_empty()
    }

    pub fn node(&self, url: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.url == url)
    }

    pub fn node_position(&self, url: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.url == url)
    }

    /// Edges leaving or entering `url`
    pub fn edges_touching<'a>(&'a self, url: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.source == url || e.target == url)
    }

    /// The last `limit` visits, newest-fetched first
    pub fn recent_visits(&self, limit: usize) -> Vec<&VisitRecord> {
        self.visits.iter().rev().take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Graph {
        Graph {
            nodes: vec![
                Node {
                    url: "https://a.com/".to_string(),
                    visit_ids: vec![VisitId::from(1)],
                },
                Node {
                    url: "https://b.com/".to_string(),
                    visit_ids: vec![VisitId::from(2)],
                },
            ],
            edges: vec![Edge {
                source: "https://a.com/".to_string(),
                target: "https://b.com/".to_string(),
                visit_id: VisitId::from(1),
            }],
            visits: vec![
                VisitRecord::new(1, "https://a.com/"),
                VisitRecord::new(2, "https://b.com/").with_referrer(1),
            ],
        }
    }

    #[test]
    fn test_empty_graph_serializes_all_fields() {
        let json = serde_json::to_value(Graph::empty()).unwrap();
        assert_eq!(json, serde_json::json!({"nodes": [], "edges": [], "visits": []}));
    }

    #[test]
    fn test_graph_wire_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["nodes"][0]["visitIds"], serde_json::json!(["1"]));
        assert_eq!(json["edges"][0]["visitId"], "1");
        assert_eq!(json["visits"][1]["referringVisitId"], "1");
    }

    #[test]
    fn test_lookup_helpers() {
        let graph = sample();
        assert_eq!(graph.node_position("https://b.com/"), Some(1));
        assert!(graph.node("https://c.com/").is_none());
        assert_eq!(graph.edges_touching("https://a.com/").count(), 1);

        let recent = graph.recent_visits(10);
        assert_eq!(recent[0].visit_id, VisitId::from(2));
        assert_eq!(recent.len(), 2);
    }
}
