//! Property-based tests for the search.
//!
//! Covered invariants:
//! - Policy sums to 1.0 and is zero on illegal moves
//! - Zero simulations give a uniform policy
//! - Every root move is tried once before any move is tried twice
//! - Estimator failures abort the search
//! - Root noise never leaks into stored priors
//! - Determinism for a fixed seed

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use approx::assert_relative_eq;
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uzero_board::{Move, Position, Status, UltimateTicTacToe, NUM_MOVES, OBSERVATION_SIZE};
use uzero_core::{Estimator, EstimatorError, Game, Prediction, TrainStats, TrainingExample};
use uzero_mcts::{Mcts, MctsConfig, SearchError};

const POLICY_SUM_TOLERANCE: f32 = 1e-4;

// =============================================================================
// Test estimators
// =============================================================================

/// Uniform policy over all 81 indices and a fixed value.
struct FixedEstimator {
    value: f32,
    policy: Vec<f32>,
    calls: AtomicUsize,
}

impl FixedEstimator {
    fn uniform() -> Self {
        Self::with_policy(vec![1.0 / NUM_MOVES as f32; NUM_MOVES])
    }

    /// All mass on one index.
    fn peaked(index: usize) -> Self {
        let mut policy = vec![0.0; NUM_MOVES];
        policy[index] = 1.0;
        Self::with_policy(policy)
    }

    fn with_policy(policy: Vec<f32>) -> Self {
        Self {
            value: 0.0,
            policy,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Estimator for FixedEstimator {
    fn predict(&self, observation: &[f32]) -> Result<Prediction, EstimatorError> {
        if observation.len() != OBSERVATION_SIZE {
            return Err(EstimatorError::Shape {
                what: "observation".to_string(),
                expected: OBSERVATION_SIZE,
                found: observation.len(),
            });
        }
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(Prediction {
            value: self.value,
            policy: self.policy.clone(),
        })
    }

    fn train(&mut self, batch: &[TrainingExample]) -> Result<TrainStats, EstimatorError> {
        Ok(TrainStats {
            batch_size: batch.len(),
            ..Default::default()
        })
    }

    fn save(&self, _path: &Path) -> Result<(), EstimatorError> {
        Ok(())
    }

    fn load(&mut self, _path: &Path) -> Result<(), EstimatorError> {
        Ok(())
    }
}

/// Always fails to predict.
struct BrokenEstimator;

impl Estimator for BrokenEstimator {
    fn predict(&self, _observation: &[f32]) -> Result<Prediction, EstimatorError> {
        Err(EstimatorError::NonFinite("value"))
    }

    fn train(&mut self, _batch: &[TrainingExample]) -> Result<TrainStats, EstimatorError> {
        Ok(TrainStats::default())
    }

    fn save(&self, _path: &Path) -> Result<(), EstimatorError> {
        Ok(())
    }

    fn load(&mut self, _path: &Path) -> Result<(), EstimatorError> {
        Ok(())
    }
}

// =============================================================================
// Strategies and helpers
// =============================================================================

fn arb_seed() -> impl Strategy<Value = u64> {
    any::<u64>()
}

fn arb_simulations() -> impl Strategy<Value = usize> {
    1usize..96
}

/// Random non-terminal position reached by random play.
fn arb_position() -> impl Strategy<Value = Position> {
    (0usize..60, arb_seed()).prop_map(|(plies, seed)| random_position(plies, seed))
}

fn random_position(plies: usize, seed: u64) -> Position {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut pos = Position::new();
    for _ in 0..plies {
        let moves = pos.legal_moves();
        let next = pos.apply(moves[rng.gen_range(0..moves.len())]).unwrap();
        if next.is_terminal() {
            break;
        }
        pos = next;
    }
    pos
}

fn mcts(estimator: &FixedEstimator, seed: u64) -> Mcts<'_, UltimateTicTacToe, FixedEstimator, ChaCha8Rng> {
    Mcts::new(MctsConfig::default(), estimator, ChaCha8Rng::seed_from_u64(seed))
}

/// A position where the side to move can end the game at once, and the
/// winning moves.
fn position_with_winning_move(seed: u64) -> (Position, Vec<Move>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    loop {
        let mut pos = Position::new();
        while !pos.is_terminal() {
            let moves = pos.legal_moves();
            let mover = pos.side_to_move();
            let winning: Vec<Move> = moves
                .iter()
                .copied()
                .filter(|&m| pos.apply(m).map(|p| p.status()) == Ok(Status::Won(mover)))
                .collect();
            if !winning.is_empty() && winning.len() < moves.len() {
                return (pos, winning);
            }
            pos = pos.apply(moves[rng.gen_range(0..moves.len())]).unwrap();
        }
    }
}

// =============================================================================
// Policy invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Visit policy sums to one, is zero off the legal set, and counts every simulation.
    #[test]
    fn prop_policy_is_distribution_over_legal_moves(
        seed in arb_seed(),
        simulations in arb_simulations(),
        pos in arb_position()
    ) {
        let game = UltimateTicTacToe;
        let estimator = FixedEstimator::uniform();
        let result = mcts(&estimator, seed).search(&game, &pos, simulations).unwrap();

        prop_assert!((result.policy.sum() - 1.0).abs() < POLICY_SUM_TOLERANCE);
        let mask = game.legal_mask(&pos);
        for (index, &p) in result.policy.iter().enumerate() {
            if !mask[index] {
                prop_assert_eq!(p, 0.0);
            }
        }
        prop_assert_eq!(result.moves.len(), pos.legal_moves().len());
        prop_assert_eq!(result.total_visits() as usize, simulations);
        prop_assert!((-1.0..=1.0).contains(&result.root_value));
    }

    /// The first L simulations visit each of the L root moves exactly once.
    #[test]
    fn prop_unvisited_moves_come_first(seed in arb_seed(), pos in arb_position()) {
        let game = UltimateTicTacToe;
        let estimator = FixedEstimator::uniform();
        let legal = pos.legal_moves().len();

        let partial = mcts(&estimator, seed).search(&game, &pos, legal - 1).unwrap();
        prop_assert!(partial.moves.iter().all(|m| m.visits <= 1));

        let full = mcts(&estimator, seed).search(&game, &pos, legal).unwrap();
        prop_assert!(full.moves.iter().all(|m| m.visits == 1));
    }

    /// Zero simulations: uniform over legal moves, nothing expanded.
    #[test]
    fn prop_zero_simulations_uniform(pos in arb_position()) {
        let game = UltimateTicTacToe;
        let estimator = FixedEstimator::uniform();
        let mut search = mcts(&estimator, 0);
        let result = search.search(&game, &pos, 0).unwrap();

        let legal = pos.legal_moves();
        for mv in &legal {
            prop_assert!((result.policy[mv.index()] - 1.0 / legal.len() as f32).abs() < 1e-6);
        }
        prop_assert_eq!(result.best_action, legal[0]);
        prop_assert_eq!(search.table_len(), 0);
        prop_assert_eq!(estimator.calls(), 0);
    }

    /// Greedy selection returns the most visited move.
    #[test]
    fn prop_greedy_selection_is_best_action(seed in arb_seed(), pos in arb_position()) {
        let game = UltimateTicTacToe;
        let estimator = FixedEstimator::uniform();
        let result = mcts(&estimator, seed).search(&game, &pos, 40).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        prop_assert_eq!(result.select_action(0.0, &mut rng), result.best_action);

        let max_visits = result.moves.iter().map(|m| m.visits).max().unwrap();
        let first_max = result.moves.iter().find(|m| m.visits == max_visits).unwrap();
        prop_assert_eq!(result.best_action, first_max.action);
    }

    /// At most one estimator call per simulation plus the root expansion.
    #[test]
    fn prop_one_expansion_per_simulation(
        seed in arb_seed(),
        simulations in arb_simulations(),
        pos in arb_position()
    ) {
        let game = UltimateTicTacToe;
        let estimator = FixedEstimator::uniform();
        let mut search = mcts(&estimator, seed);
        search.search(&game, &pos, simulations).unwrap();
        prop_assert!(estimator.calls() <= simulations + 1);
        prop_assert!(search.table_len() <= estimator.calls());
    }
}

// =============================================================================
// Determinism
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Same seed, same visit counts (noise included).
    #[test]
    fn prop_deterministic(seed in arb_seed(), pos in arb_position()) {
        let game = UltimateTicTacToe;
        let estimator = FixedEstimator::uniform();
        let a = mcts(&estimator, seed).search(&game, &pos, 64).unwrap();
        let b = mcts(&estimator, seed).search(&game, &pos, 64).unwrap();
        prop_assert_eq!(a.visit_counts(), b.visit_counts());
        prop_assert_eq!(a.best_action, b.best_action);
    }
}

// =============================================================================
// Failure semantics
// =============================================================================

#[test]
fn terminal_root_is_rejected() {
    let game = UltimateTicTacToe;
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut pos = Position::new();
    while !pos.is_terminal() {
        let moves = pos.legal_moves();
        pos = pos.apply(moves[rng.gen_range(0..moves.len())]).unwrap();
    }

    let estimator = FixedEstimator::uniform();
    let err = mcts(&estimator, 1).search(&game, &pos, 10).unwrap_err();
    assert!(matches!(err, SearchError::TerminalPosition));
}

#[test]
fn estimator_failure_propagates() {
    let game = UltimateTicTacToe;
    let estimator = BrokenEstimator;
    let mut search = Mcts::new(
        MctsConfig::default(),
        &estimator,
        ChaCha8Rng::seed_from_u64(1),
    );
    let err = search.search(&game, &game.initial_state(), 10).unwrap_err();
    assert!(matches!(
        err,
        SearchError::Estimator(EstimatorError::NonFinite(_))
    ));
    assert_eq!(search.table_len(), 0);
}

#[test]
fn wrong_policy_length_is_rejected() {
    let game = UltimateTicTacToe;
    let estimator = FixedEstimator::with_policy(vec![0.5, 0.5]);
    let err = mcts(&estimator, 1)
        .search(&game, &game.initial_state(), 4)
        .unwrap_err();
    assert!(matches!(
        err,
        SearchError::Estimator(EstimatorError::Shape { expected: 81, found: 2, .. })
    ));
}

#[test]
fn invalid_config_is_rejected() {
    let game = UltimateTicTacToe;
    let estimator = FixedEstimator::uniform();
    let config = MctsConfig::default().with_c_puct(f32::NAN);
    let mut search = Mcts::new(config, &estimator, ChaCha8Rng::seed_from_u64(1));
    assert!(matches!(
        search.search(&game, &game.initial_state(), 4),
        Err(SearchError::InvalidConfig(_))
    ));
}

// =============================================================================
// Priors and noise
// =============================================================================

#[test]
fn priors_fall_back_to_uniform_when_legal_mass_is_zero() {
    let game = UltimateTicTacToe;
    // Required sub-board 8 after this move; index 0 is illegal.
    let pos = Position::new().apply(Move::new(1, 1, 2, 2).unwrap()).unwrap();
    let estimator = FixedEstimator::peaked(0);
    let mut search = Mcts::new(
        MctsConfig::for_evaluation(),
        &estimator,
        ChaCha8Rng::seed_from_u64(3),
    );
    let result = search.search(&game, &pos, 9).unwrap();
    for stats in &result.moves {
        assert_relative_eq!(stats.prior, 1.0 / 9.0, epsilon = 1e-6);
        assert_eq!(stats.visits, 1);
    }
}

#[test]
fn root_noise_does_not_touch_stored_priors() {
    let game = UltimateTicTacToe;
    let state = game.initial_state();
    let estimator = FixedEstimator::peaked(40);
    let mut search = mcts(&estimator, 9);

    for _ in 0..3 {
        let result = search.search(&game, &state, 120).unwrap();
        for stats in &result.moves {
            let expected = if stats.index == 40 { 1.0 } else { 0.0 };
            assert_eq!(stats.prior, expected);
        }
    }
}

#[test]
fn noise_spreads_visits_beyond_a_peaked_prior() {
    let game = UltimateTicTacToe;
    let state = game.initial_state();
    let estimator = FixedEstimator::peaked(40);

    let mut quiet = Mcts::new(
        MctsConfig::for_evaluation(),
        &estimator,
        ChaCha8Rng::seed_from_u64(4),
    );
    let mut noisy = mcts(&estimator, 4);
    let quiet_result = quiet.search(&game, &state, 400).unwrap();
    let noisy_result = noisy.search(&game, &state, 400).unwrap();

    let visits_to = |r: &uzero_mcts::SearchResult<Move>| {
        r.moves.iter().find(|m| m.index == 40).map(|m| m.visits).unwrap()
    };
    assert_eq!(quiet_result.best_action.index(), 40);
    assert!(visits_to(&noisy_result) < visits_to(&quiet_result));
}

// =============================================================================
// Search quality and table reuse
// =============================================================================

#[test]
fn finds_the_game_winning_move() {
    let game = UltimateTicTacToe;
    let estimator = FixedEstimator::uniform();
    for seed in [1, 2, 3] {
        let (pos, winning) = position_with_winning_move(seed);
        let mut search = Mcts::new(
            MctsConfig::for_evaluation(),
            &estimator,
            ChaCha8Rng::seed_from_u64(seed),
        );
        let result = search.search(&game, &pos, 400).unwrap();
        assert!(
            winning.contains(&result.best_action),
            "picked {} instead of one of {:?}",
            result.best_action,
            winning
        );
        assert!(result.root_value > 0.0);
    }
}

#[test]
fn table_is_reused_across_moves_and_reset_clears_it() {
    let game = UltimateTicTacToe;
    let estimator = FixedEstimator::uniform();
    let mut search = mcts(&estimator, 11);

    let root = game.initial_state();
    let first = search.search(&game, &root, 200).unwrap();
    let after_first = search.table_len();
    assert!(after_first > 1);

    let child = game.apply(&root, first.best_action).unwrap();
    let calls_before = estimator.calls();
    search.search(&game, &child, 1).unwrap();
    // The child was already expanded, so one simulation needs at most one new leaf.
    assert!(estimator.calls() - calls_before <= 1);

    search.reset();
    assert_eq!(search.table_len(), 0);
}
