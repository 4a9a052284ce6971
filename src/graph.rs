use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::HashMap;
use tracing::debug;

use crate::aggregation::Edge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Keyword,
    Restaurant,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    pub side: Side,
    pub name: String,
}

/// Keyword and restaurant nodes joined by undirected, unweighted edges.
#[derive(Debug, Default)]
pub struct BipartiteGraph {
    pub graph: UnGraph<Node, ()>,
}

impl BipartiteGraph {
    /// Keyword nodes are added before restaurant nodes, each in edge order.
    pub fn from_edges(edges: &[Edge]) -> Self {
        let mut graph = UnGraph::<Node, ()>::default();
        let mut nodes: HashMap<Node, NodeIndex> = HashMap::new();

        let mut add = |graph: &mut UnGraph<Node, ()>, side: Side, name: &str| {
            let node = Node {
                side,
                name: name.to_string(),
            };
            *nodes
                .entry(node.clone())
                .or_insert_with(|| graph.add_node(node))
        };

        let keywords: Vec<NodeIndex> = edges
            .iter()
            .map(|e| add(&mut graph, Side::Keyword, &e.keyword))
            .collect();
        let restaurants: Vec<NodeIndex> = edges
            .iter()
            .map(|e| add(&mut graph, Side::Restaurant, &e.restaurant))
            .collect();

        for (&a, &b) in keywords.iter().zip(&restaurants) {
            graph.update_edge(a, b, ());
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built bipartite graph"
        );

        BipartiteGraph { graph }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn nodes_on(&self, side: Side) -> impl Iterator<Item = (NodeIndex, &Node)> + '_ {
        self.graph
            .node_indices()
            .map(move |i| (i, &self.graph[i]))
            .filter(move |(_, node)| node.side == side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges() -> Vec<Edge> {
        vec![
            Edge::new("sushi", "Restaurant 1"),
            Edge::new("pizza", "Restaurant 1"),
            Edge::new("sushi", "Restaurant 2"),
            Edge::new("sushi", "Restaurant 1"),
        ]
    }

    #[test]
    fn test_from_edges_counts() {
        let g = BipartiteGraph::from_edges(&edges());
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.nodes_on(Side::Keyword).count(), 2);
        assert_eq!(g.nodes_on(Side::Restaurant).count(), 2);
    }

    #[test]
    fn test_edges_cross_sides() {
        let g = BipartiteGraph::from_edges(&edges());
        for edge in g.graph.edge_indices() {
            let (a, b) = g.graph.edge_endpoints(edge).unwrap();
            assert_ne!(g.graph[a].side, g.graph[b].side);
        }
    }

    #[test]
    fn test_sides_stay_disjoint_on_equal_names() {
        let g = BipartiteGraph::from_edges(&[Edge::new("Restaurant 1", "Restaurant 1")]);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn test_keywords_come_first() {
        let g = BipartiteGraph::from_edges(&edges());
        let names: Vec<_> = g.graph.node_weights().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["sushi", "pizza", "Restaurant 1", "Restaurant 2"]);
    }

    #[test]
    fn test_empty() {
        let g = BipartiteGraph::from_edges(&[]);
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.edge_count(), 0);
    }
}
