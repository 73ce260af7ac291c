//! Coupling & Centrality Analyzer
//!
//! Coupling is the share of other files a node is connected to:
//! `(in_degree + out_degree) / (node_count - 1)` over distinct neighbours.
//! Centrality ranks nodes by how many distinct files reference them.

use petgraph::Direction;
use serde::Serialize;

use super::graph::DependencyGraph;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeMetrics {
    pub path: String,
    pub in_degree: usize,
    pub out_degree: usize,
    pub in_weight: u32,
    pub out_weight: u32,
    pub coupling: f64,
    /// Normalised in-degree, `in_degree / (node_count - 1)`
    pub centrality: f64,
}

/// Metrics for every node, held in centrality order
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphMetrics {
    ranking: Vec<NodeMetrics>,
}

impl GraphMetrics {
    pub fn analyze(graph: &DependencyGraph) -> Self {
        let others = graph.node_count().saturating_sub(1);
        let normalize = |value: usize| {
            if others == 0 {
                0.0
            } else {
                value as f64 / others as f64
            }
        };

        let mut ranking: Vec<NodeMetrics> = graph
            .nodes()
            .into_iter()
            .map(|path| {
                let in_degree = graph.dependents(path).len();
                let out_degree = graph.dependencies(path).len();
                NodeMetrics {
                    path: path.to_string(),
                    in_degree,
                    out_degree,
                    in_weight: graph.total_weight(path, Direction::Incoming),
                    out_weight: graph.total_weight(path, Direction::Outgoing),
                    coupling: normalize(in_degree + out_degree),
                    centrality: normalize(in_degree),
                }
            })
            .collect();

        ranking.sort_by(|a, b| {
            b.in_degree
                .cmp(&a.in_degree)
                .then(b.in_weight.cmp(&a.in_weight))
                .then(b.out_degree.cmp(&a.out_degree))
                .then_with(|| a.path.cmp(&b.path))
        });

        Self { ranking }
    }

    /// All nodes, most central first
    pub fn ranking(&self) -> &[NodeMetrics] {
        &self.ranking
    }

    pub fn get_central_elements(&self, top_n: usize) -> &[NodeMetrics] {
        &self.ranking[..top_n.min(self.ranking.len())]
    }

    pub fn get(&self, path: &str) -> Option<&NodeMetrics> {
        self.ranking.iter().find(|m| m.path == path)
    }

    pub fn coupling(&self, path: &str) -> Option<f64> {
        self.get(path).map(|m| m.coupling)
    }

    pub fn average_coupling(&self) -> f64 {
        if self.ranking.is_empty() {
            return 0.0;
        }
        self.ranking.iter().map(|m| m.coupling).sum::<f64>() / self.ranking.len() as f64
    }

    pub fn is_empty(&self) -> bool {
        self.ranking.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::graph::EdgeKind;
    use proptest::prelude::*;

    fn star() -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for leaf in ["a.py", "b.py", "c.py"] {
            graph.add_reference(leaf, "core.py", EdgeKind::Import);
        }
        graph.add_reference("a.py", "core.py", EdgeKind::Call);
        graph.add_reference("a.py", "b.py", EdgeKind::Call);
        graph
    }

    #[test]
    fn test_coupling() {
        let metrics = GraphMetrics::analyze(&star());
        assert_eq!(metrics.coupling("core.py"), Some(1.0));
        assert!((metrics.coupling("a.py").unwrap() - 2.0 / 3.0).abs() < 1e-9);
        assert!((metrics.coupling("c.py").unwrap() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(metrics.coupling("missing.py"), None);
    }

    #[test]
    fn test_central_elements_order() {
        let metrics = GraphMetrics::analyze(&star());
        let top: Vec<&str> = metrics
            .get_central_elements(2)
            .iter()
            .map(|m| m.path.as_str())
            .collect();
        assert_eq!(top, vec!["core.py", "b.py"]);
        assert_eq!(metrics.get_central_elements(10).len(), 4);
        assert_eq!(metrics.get("core.py").unwrap().in_weight, 4);
    }

    #[test]
    fn test_ties_break_by_identifier() {
        let mut graph = DependencyGraph::new();
        graph.add_node("z.py");
        graph.add_node("m.py");
        graph.add_node("a.py");
        let metrics = GraphMetrics::analyze(&graph);
        let order: Vec<&str> = metrics.ranking().iter().map(|m| m.path.as_str()).collect();
        assert_eq!(order, vec!["a.py", "m.py", "z.py"]);
    }

    #[test]
    fn test_single_node_graph() {
        let mut graph = DependencyGraph::new();
        graph.add_node("only.py");
        let metrics = GraphMetrics::analyze(&graph);
        assert_eq!(metrics.coupling("only.py"), Some(0.0));
        assert_eq!(metrics.average_coupling(), 0.0);
        assert!(GraphMetrics::analyze(&DependencyGraph::new()).is_empty());
    }

    proptest! {
        #[test]
        fn coupling_is_bounded(edges in prop::collection::vec((0usize..8, 0usize..8), 0..40)) {
            let mut graph = DependencyGraph::new();
            for (from, to) in &edges {
                graph.add_reference(&format!("f{from}"), &format!("f{to}"), EdgeKind::Call);
            }
            let metrics = GraphMetrics::analyze(&graph);
            for node in metrics.ranking() {
                // in and out neighbours are each at most n - 1
                prop_assert!(node.coupling >= 0.0 && node.coupling <= 2.0);
                prop_assert!(node.centrality >= 0.0 && node.centrality <= 1.0);
            }
        }

        #[test]
        fn ranking_is_deterministic(edges in prop::collection::vec((0usize..6, 0usize..6), 0..20)) {
            let build = |reverse: bool| {
                let mut graph = DependencyGraph::new();
                let mut ordered = edges.clone();
                if reverse {
                    ordered.reverse();
                }
                for (from, to) in &ordered {
                    graph.add_reference(&format!("f{from}"), &format!("f{to}"), EdgeKind::Import);
                }
                GraphMetrics::analyze(&graph)
                    .ranking()
                    .iter()
                    .map(|m| m.path.clone())
                    .collect::<Vec<_>>()
            };
            prop_assert_eq!(build(false), build(true));
        }
    }
}
