//! MCTS node types for the search table.
//!
//! A node belongs to one position and holds one edge per legal move. Edge
//! values are stored from the perspective of the player to move at the node.

/// Statistics for one legal move out of a node.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge<A> {
    pub action: A,

    /// Flat action index, used for ordering and policy output.
    pub index: usize,

    /// Number of simulations that took this move.
    pub visits: u32,

    /// Sum of backed-up values (for computing Q-value).
    pub value_sum: f32,

    /// Prior probability from the estimator, masked to legal moves.
    pub prior: f32,
}

impl<A> Edge<A> {
    pub fn new(action: A, index: usize, prior: f32) -> Self {
        Self {
            action,
            index,
            visits: 0,
            value_sum: 0.0,
            prior,
        }
    }

    /// Mean value (Q-value) for this move.
    ///
    /// Returns 0.0 if the move has never been taken.
    pub fn mean_value(&self) -> f32 {
        if self.visits == 0 {
            0.0
        } else {
            self.value_sum / self.visits as f32
        }
    }
}

/// A node in the search table.
#[derive(Clone, Debug)]
pub struct Node<A> {
    /// Edges in ascending action-index order.
    pub edges: Vec<Edge<A>>,

    /// Number of simulations that passed through this node.
    pub total_visits: u32,

    /// Whether the node has priors (edges generated).
    pub expanded: bool,
}

impl<A> Node<A> {
    /// Create an expanded node from `(action, index, prior)` triples.
    pub fn expanded(priors: impl IntoIterator<Item = (A, usize, f32)>) -> Self {
        let mut edges: Vec<Edge<A>> = priors
            .into_iter()
            .map(|(action, index, prior)| Edge::new(action, index, prior))
            .collect();
        edges.sort_by_key(|e| e.index);
        Self {
            edges,
            total_visits: 0,
            expanded: true,
        }
    }

    /// Records one backed-up `value` through edge `slot`.
    pub fn record(&mut self, slot: usize, value: f32) {
        let edge = &mut self.edges[slot];
        edge.visits += 1;
        edge.value_sum += value;
        self.total_visits += 1;
    }

    /// Visit-weighted mean of edge values, or 0.0 before any visit.
    pub fn mean_value(&self) -> f32 {
        let visits: u32 = self.edges.iter().map(|e| e.visits).sum();
        if visits == 0 {
            0.0
        } else {
            self.edges.iter().map(|e| e.value_sum).sum::<f32>() / visits as f32
        }
    }
}

impl<A> Default for Node<A> {
    fn default() -> Self {
        Self {
            edges: Vec::new(),
            total_visits: 0,
            expanded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_mean_value() {
        let mut edge = Edge::new('a', 0, 0.5);

        // Unvisited edge has Q = 0
        assert_eq!(edge.mean_value(), 0.0);

        edge.visits = 2;
        edge.value_sum = 1.5;
        assert!((edge.mean_value() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_expanded_sorts_edges() {
        let node = Node::expanded([('c', 7, 0.2), ('a', 1, 0.5), ('b', 4, 0.3)]);
        assert!(node.expanded);
        let order: Vec<usize> = node.edges.iter().map(|e| e.index).collect();
        assert_eq!(order, vec![1, 4, 7]);
    }

    #[test]
    fn test_record_updates_edge_and_total() {
        let mut node = Node::expanded([('a', 0, 0.5), ('b', 1, 0.5)]);
        node.record(1, 1.0);
        node.record(1, -0.5);
        node.record(0, 0.25);
        assert_eq!(node.total_visits, 3);
        assert_eq!(node.edges[1].visits, 2);
        assert!((node.edges[1].mean_value() - 0.25).abs() < 1e-6);
        assert!((node.mean_value() - 0.75 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_default_is_unexpanded() {
        let node: Node<u8> = Node::default();
        assert!(!node.expanded);
        assert!(node.edges.is_empty());
    }
}
