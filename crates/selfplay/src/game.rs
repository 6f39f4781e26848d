//! Playing one self-play game and labelling its positions.

use crate::{SelfPlayError, TrainingConfig};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;
use uzero_core::{Estimator, Game, GameError, TrainingExample};
use uzero_mcts::Mcts;

/// A position seen during play, waiting for the final result.
#[derive(Clone, Debug)]
struct PendingMove<P> {
    mover: P,
    observation: Vec<f32>,
    policy: Vec<f32>,
    legal_mask: Vec<bool>,
}

/// A finished self-play game.
#[derive(Clone, Debug)]
pub struct GameRecord<A> {
    /// Moves in the order they were played.
    pub moves: Vec<A>,

    /// One example per position, in play order.
    pub examples: Vec<TrainingExample>,

    /// Result for the side that moved first: +1, -1 or 0.
    pub first_mover_result: f32,
}

impl<A> GameRecord<A> {
    pub fn plies(&self) -> usize {
        self.moves.len()
    }

    pub fn is_decisive(&self) -> bool {
        self.first_mover_result != 0.0
    }
}

/// Plays one game of self-play with a fresh search tree seeded by `seed`.
///
/// Each move runs `config.simulations_per_move` simulations with root noise
/// and samples the played move at the scheduled temperature. The tree is
/// kept between moves of the same game.
///
/// # Errors
/// Any search or rules failure aborts the game.
pub fn play_game<G, E>(
    game: &G,
    estimator: &E,
    config: &TrainingConfig,
    seed: u64,
) -> Result<GameRecord<G::Action>, SelfPlayError>
where
    G: Game,
    E: Estimator + ?Sized,
{
    let rng = ChaCha8Rng::seed_from_u64(seed);
    let mut mcts = Mcts::new(config.mcts_config(), estimator, rng);

    let mut state = game.initial_state();
    let mut pending = Vec::new();
    let mut moves = Vec::new();

    while !game.is_terminal(&state) {
        let result = mcts.search(game, &state, config.simulations_per_move)?;
        let temperature = config.temperature(moves.len());
        let action = result.select_action(temperature, mcts.rng_mut());

        pending.push(PendingMove {
            mover: game.to_move(&state),
            observation: game.encode(&state),
            policy: result.policy.into_inner(),
            legal_mask: game.legal_mask(&state),
        });

        state = game.apply(&state, action)?;
        moves.push(action);
    }

    let first_mover = game.to_move(&game.initial_state());
    let first_mover_result = game.result(&state, first_mover)?;
    let examples = label_trajectory(game, &state, pending)?;

    debug!(
        seed,
        plies = moves.len(),
        result = first_mover_result,
        table = mcts.table_len(),
        "self-play game finished"
    );

    Ok(GameRecord {
        moves,
        examples,
        first_mover_result,
    })
}

/// Turns recorded positions into examples valued from each mover's side.
fn label_trajectory<G: Game>(
    game: &G,
    final_state: &G::State,
    pending: Vec<PendingMove<G::Player>>,
) -> Result<Vec<TrainingExample>, GameError> {
    pending
        .into_iter()
        .map(|step| {
            Ok(TrainingExample {
                value: game.result(final_state, step.mover)?,
                observation: step.observation,
                policy: step.policy,
                legal_mask: step.legal_mask,
            })
        })
        .collect()
}
