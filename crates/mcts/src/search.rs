//! Monte Carlo Tree Search implementation.
//!
//! Implements PUCT search over a transposition table. Each simulation walks
//! down from the root, expands at most one new position by querying the
//! estimator, and backs the value up the path with alternating sign.

use crate::{
    config::MctsConfig,
    evaluator::evaluate,
    node::{Edge, Node},
    tree::NodeTable,
    SearchError,
};
use rand::Rng;
use rand_distr::{Dirichlet, Distribution};
use std::marker::PhantomData;
use tracing::{debug, trace};
use uzero_core::{Estimator, Game, Policy};

/// Root statistics for one legal move.
#[derive(Clone, Debug, PartialEq)]
pub struct MoveStats<A> {
    pub action: A,
    pub index: usize,
    pub visits: u32,
    /// Stored estimator prior (never includes root noise).
    pub prior: f32,
    /// Q-value from the root mover's perspective.
    pub mean_value: f32,
}

/// Result of an MCTS search.
#[derive(Clone, Debug)]
pub struct SearchResult<A> {
    /// Per legal move, ascending by action index.
    pub moves: Vec<MoveStats<A>>,

    /// Visit shares over the full action space. Zero for illegal moves,
    /// uniform over legal moves when the root has no visits.
    pub policy: Policy,

    /// Most visited move; ties go to the lowest action index.
    /// For temperature-based selection, use `select_action()` instead.
    pub best_action: A,

    /// Value estimate at root (from perspective of player to move).
    pub root_value: f32,

    /// Number of simulations run by this call.
    pub simulations: usize,
}

impl<A: Copy> SearchResult<A> {
    /// Select an action using temperature-based sampling.
    ///
    /// Samples proportionally to `policy^(1/temperature)`; temperatures at or
    /// near zero return the highest-probability move with ties broken by
    /// lowest index.
    pub fn select_action<R: Rng + ?Sized>(&self, temperature: f32, rng: &mut R) -> A {
        let index = self.policy.sample(temperature, rng);
        self.action_at(index).unwrap_or(self.best_action)
    }

    /// The legal move with action index `index`, if any.
    pub fn action_at(&self, index: usize) -> Option<A> {
        self.moves
            .iter()
            .find(|m| m.index == index)
            .map(|m| m.action)
    }

    pub fn visit_counts(&self) -> Vec<(A, u32)> {
        self.moves.iter().map(|m| (m.action, m.visits)).collect()
    }

    pub fn total_visits(&self) -> u32 {
        self.moves.iter().map(|m| m.visits).sum()
    }
}

/// Monte Carlo Tree Search with PUCT selection.
///
/// Generic over:
/// - `G`: The game being played
/// - `E`: The estimator (borrowed, so many searches can share one)
/// - `R`: The random number generator
///
/// The node table persists across calls so statistics carry over as a game
/// advances. One `Mcts` must serve exactly one game at a time.
pub struct Mcts<'a, G: Game, E: Estimator + ?Sized, R: Rng> {
    config: MctsConfig,
    estimator: &'a E,
    rng: R,
    table: NodeTable<G::Key, G::Action>,
    _game: PhantomData<G>,
}

impl<'a, G, E, R> Mcts<'a, G, E, R>
where
    G: Game,
    E: Estimator + ?Sized,
    R: Rng,
{
    /// Create a new MCTS instance with an empty node table.
    pub fn new(config: MctsConfig, estimator: &'a E, rng: R) -> Self {
        Self {
            config,
            estimator,
            rng,
            table: NodeTable::new(),
            _game: PhantomData,
        }
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// The random source used for root noise; callers may share it for move sampling.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Number of positions in the node table.
    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    /// Drop all stored statistics.
    pub fn reset(&mut self) {
        self.table.clear();
    }

    /// Run `num_simulations` simulations from `state`.
    ///
    /// With zero simulations the root is not expanded and the policy is
    /// uniform over legal moves.
    ///
    /// # Errors
    /// [`SearchError::TerminalPosition`] for a finished game; any estimator or
    /// rules failure during the search is propagated unchanged.
    pub fn search(
        &mut self,
        game: &G,
        state: &G::State,
        num_simulations: usize,
    ) -> Result<SearchResult<G::Action>, SearchError> {
        self.config.validate()?;
        if game.is_terminal(state) {
            return Err(SearchError::TerminalPosition);
        }

        let key = game.position_key(state);
        if num_simulations == 0 {
            return self.uniform_result(game, state, &key);
        }

        // Expand root
        if self.table.expanded(&key).is_none() {
            let evaluation = evaluate(game, self.estimator, state)?;
            self.table.insert(key.clone(), Node::expanded(evaluation.priors));
        }

        // Noised priors used only for selection at the root during this call
        let root_priors = self.noised_root_priors(&key)?;

        for _ in 0..num_simulations {
            self.simulate(game, state, root_priors.as_deref())?;
        }

        let result = self.extract_results(game, &key, num_simulations)?;
        trace!(
            simulations = num_simulations,
            table = self.table.len(),
            root_value = result.root_value,
            best = ?result.best_action,
            "search complete"
        );
        Ok(result)
    }

    /// Run a single simulation and return its value for the side to move at `state`.
    fn simulate(
        &mut self,
        game: &G,
        state: &G::State,
        root_priors: Option<&[f32]>,
    ) -> Result<f32, SearchError> {
        // Terminal: exact result for the side to move
        if game.is_terminal(state) {
            return Ok(game.result(state, game.to_move(state))?);
        }

        let key = game.position_key(state);
        let c_puct = self.config.c_puct;
        let selected = self.table.expanded(&key).map(|node| {
            let slot = select_edge(node, root_priors, c_puct);
            (slot, node.edges.get(slot).map(|e| e.action))
        });

        // Leaf: expand and return the estimator's value without recursing
        let Some((slot, action)) = selected else {
            let evaluation = evaluate(game, self.estimator, state)?;
            self.table.insert(key, Node::expanded(evaluation.priors));
            return Ok(evaluation.value);
        };
        let action = action.ok_or(SearchError::NoLegalMoves)?;

        let child = game.apply(state, action)?;
        // A good position for the child's mover is a bad one for ours
        let value = -self.simulate(game, &child, None)?;

        self.table
            .get_mut(&key)
            .ok_or(SearchError::MissingNode)?
            .record(slot, value);
        Ok(value)
    }

    /// Root priors blended with Dirichlet noise, or `None` when noise is off
    /// or there is only one legal move.
    fn noised_root_priors(&mut self, key: &G::Key) -> Result<Option<Vec<f32>>, SearchError> {
        if !self.config.noise_enabled() {
            return Ok(None);
        }
        let Some(root) = self.table.expanded(key) else {
            return Ok(None);
        };

        // Dirichlet requires at least 2 elements
        let num_edges = root.edges.len();
        if num_edges < 2 {
            return Ok(None);
        }

        let alpha = vec![self.config.dirichlet_alpha; num_edges];
        let dirichlet = Dirichlet::new(&alpha)
            .map_err(|e| SearchError::InvalidConfig(format!("dirichlet noise: {e}")))?;
        let noise: Vec<f32> = dirichlet.sample(&mut self.rng);
        if noise.iter().any(|n| !n.is_finite()) {
            debug!("discarding non-finite dirichlet sample");
            return Ok(None);
        }

        let eps = self.config.exploration_fraction;
        Ok(Some(
            root.edges
                .iter()
                .zip(noise)
                .map(|(edge, n)| (1.0 - eps) * edge.prior + eps * n)
                .collect(),
        ))
    }

    fn uniform_result(
        &self,
        game: &G,
        state: &G::State,
        key: &G::Key,
    ) -> Result<SearchResult<G::Action>, SearchError> {
        let mut legal: Vec<(G::Action, usize)> = game
            .legal_actions(state)
            .into_iter()
            .map(|a| (a, game.action_to_index(a)))
            .collect();
        legal.sort_by_key(|&(_, index)| index);

        let indices: Vec<usize> = legal.iter().map(|&(_, i)| i).collect();
        let policy = Policy::uniform_over(&indices, game.num_actions())?;
        let best_action = legal.first().map(|&(a, _)| a).ok_or(SearchError::NoLegalMoves)?;

        let stored = self.table.expanded(key);
        let share = 1.0 / legal.len() as f32;
        let moves = legal
            .into_iter()
            .map(|(action, index)| MoveStats {
                action,
                index,
                visits: 0,
                prior: stored
                    .and_then(|n| n.edges.iter().find(|e| e.index == index))
                    .map_or(share, |e| e.prior),
                mean_value: 0.0,
            })
            .collect();

        Ok(SearchResult {
            moves,
            policy,
            best_action,
            root_value: stored.map_or(0.0, Node::mean_value),
            simulations: 0,
        })
    }

    /// Extract search results from the root node.
    fn extract_results(
        &self,
        game: &G,
        key: &G::Key,
        simulations: usize,
    ) -> Result<SearchResult<G::Action>, SearchError> {
        let root = self.table.expanded(key).ok_or(SearchError::MissingNode)?;

        let mut best: Option<&Edge<G::Action>> = None;
        for edge in &root.edges {
            if best.map_or(true, |b| edge.visits > b.visits) {
                best = Some(edge);
            }
        }
        let best_action = best.map(|e| e.action).ok_or(SearchError::NoLegalMoves)?;

        // Policy from normalized visit counts
        let total_visits: u32 = root.edges.iter().map(|e| e.visits).sum();
        let policy = if total_visits > 0 {
            let mut probs = vec![0.0; game.num_actions()];
            for edge in &root.edges {
                if let Some(p) = probs.get_mut(edge.index) {
                    *p = edge.visits as f32 / total_visits as f32;
                }
            }
            Policy::new(probs)?
        } else {
            let indices: Vec<usize> = root.edges.iter().map(|e| e.index).collect();
            Policy::uniform_over(&indices, game.num_actions())?
        };

        let moves = root
            .edges
            .iter()
            .map(|e| MoveStats {
                action: e.action,
                index: e.index,
                visits: e.visits,
                prior: e.prior,
                mean_value: e.mean_value(),
            })
            .collect();

        Ok(SearchResult {
            moves,
            policy,
            best_action,
            root_value: root.mean_value(),
            simulations,
        })
    }
}

/// Select the edge with the highest PUCT score.
///
/// score(a) = Q(a) + c_puct * P(a) * sqrt(N_parent) / (1 + N(a))
///
/// Unvisited edges score +inf, so every move is tried once before any move
/// is tried twice. Edges are scanned in ascending index order and only a
/// strictly better score replaces the incumbent, so ties go to the lowest
/// index.
fn select_edge<A>(node: &Node<A>, priors: Option<&[f32]>, c_puct: f32) -> usize {
    let sqrt_parent = (node.total_visits as f32).sqrt();

    let mut best = 0;
    let mut best_score = f32::NEG_INFINITY;
    for (slot, edge) in node.edges.iter().enumerate() {
        let score = if edge.visits == 0 {
            f32::INFINITY
        } else {
            let prior = priors
                .and_then(|p| p.get(slot).copied())
                .unwrap_or(edge.prior);
            edge.mean_value() + c_puct * prior * sqrt_parent / (1.0 + edge.visits as f32)
        };

        if score > best_score {
            best_score = score;
            best = slot;
        }
    }
    best
}
