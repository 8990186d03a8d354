use crate::model::Graph;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use trailgraph_history::VisitId;

/// Directed adjacency view over a [`Graph`], keyed by URL.
///
/// Node indices match positions in `Graph::nodes`, so the two can be used
/// side by side without translating.
#[derive(Debug, Clone, Default)]
pub struct GraphIndex {
    inner: DiGraph<String, VisitId>,
    by_url: HashMap<String, NodeIndex>,
}

impl GraphIndex {
    pub fn new(graph: &Graph) -> Self {
        let mut inner = DiGraph::with_capacity(graph.nodes.len(), graph.edges.len());
        let mut by_url = HashMap::with_capacity(graph.nodes.len());

        for node in &graph.nodes {
            let idx = inner.add_node(node.url.clone());
            by_url.insert(node.url.clone(), idx);
        }
        for edge in &graph.edges {
            if let (Some(&source), Some(&target)) = (by_url.get(&edge.source), by_url.get(&edge.target)) {
                inner.add_edge(source, target, edge.visit_id.clone());
            }
        }

        Self { inner, by_url }
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.by_url.contains_key(url)
    }

    pub fn position(&self, url: &str) -> Option<usize> {
        self.by_url.get(url).map(|idx| idx.index())
    }

    pub fn url_at(&self, position: usize) -> Option<&str> {
        self.inner
            .node_weight(NodeIndex::new(position))
            .map(String::as_str)
    }

    /// URLs linked to `url` in either direction, deduplicated, in index order
    pub fn neighbors(&self, url: &str) -> Vec<&str> {
        let Some(&idx) = self.by_url.get(url) else {
            return Vec::new();
        };
        let mut found: Vec<NodeIndex> = self.inner.neighbors_undirected(idx).collect();
        found.sort();
        found.dedup();
        found
            .into_iter()
            .map(|n| self.inner[n].as_str())
            .collect()
    }

    pub fn is_neighbor(&self, url: &str, other: &str) -> bool {
        match (self.by_url.get(url), self.by_url.get(other)) {
            (Some(&a), Some(&b)) => {
                self.inner.find_edge(a, b).is_some() || self.inner.find_edge(b, a).is_some()
            }
            _ => false,
        }
    }

    /// Edge endpoints as node positions, in edge order
    pub fn edge_positions(&self) -> Vec<(usize, usize)> {
        self.inner
            .raw_edges()
            .iter()
            .map(|e| (e.source().index(), e.target().index()))
            .collect()
    }

    pub fn out_degree(&self, url: &str) -> usize {
        self.degree(url, Direction::Outgoing)
    }

    pub fn in_degree(&self, url: &str) -> usize {
        self.degree(url, Direction::Incoming)
    }

    fn degree(&self, url: &str, direction: Direction) -> usize {
        self.by_url
            .get(url)
            .map(|&idx| self.inner.edges_directed(idx, direction).count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::assemble_graph;
    use trailgraph_history::VisitRecord;

    fn sample() -> Graph {
        assemble_graph(vec![
            VisitRecord::new(1, "a.com"),
            VisitRecord::new(2, "b.com").with_referrer(1),
            VisitRecord::new(3, "c.com").with_referrer(1),
            VisitRecord::new(4, "b.com").with_referrer(1),
            VisitRecord::new(5, "a.com").with_referrer(3),
        ])
    }

    #[test]
    fn test_positions_match_node_order() {
        let graph = sample();
        let index = GraphIndex::new(&graph);

        for (pos, node) in graph.nodes.iter().enumerate() {
            assert_eq!(index.position(&node.url), Some(pos));
            assert_eq!(index.url_at(pos), Some(node.url.as_str()));
        }
        assert_eq!(index.edge_count(), graph.edges.len());
    }

    #[test]
    fn test_degrees_count_multi_edges() {
        let index = GraphIndex::new(&sample());

        assert_eq!(index.out_degree("a.com"), 3);
        assert_eq!(index.in_degree("b.com"), 2);
        assert_eq!(index.in_degree("a.com"), 1);
        assert_eq!(index.out_degree("missing.com"), 0);
    }

    #[test]
    fn test_neighbors_in_both_directions() {
        let index = GraphIndex::new(&sample());

        assert_eq!(index.neighbors("a.com"), vec!["b.com", "c.com"]);
        assert_eq!(index.neighbors("c.com"), vec!["a.com"]);
        assert!(index.is_neighbor("c.com", "a.com"));
        assert!(!index.is_neighbor("b.com", "c.com"));
        assert!(index.neighbors("missing.com").is_empty());
    }
}
