//! Gameplay queries against a trained estimator.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uzero_core::{Estimator, Game};
use uzero_mcts::{Mcts, MctsConfig, SearchError, SearchResult};

/// Runs one noise-free search from `state` and returns the full statistics.
pub fn analyze<G, E>(
    game: &G,
    estimator: &E,
    state: &G::State,
    simulations: usize,
) -> Result<SearchResult<G::Action>, SearchError>
where
    G: Game,
    E: Estimator + ?Sized,
{
    // Root noise is off, so the seed never influences the result.
    let mut mcts = Mcts::new(MctsConfig::for_evaluation(), estimator, ChaCha8Rng::seed_from_u64(0));
    mcts.search(game, state, simulations)
}

/// The most-visited legal move after `simulations` simulations.
///
/// Deterministic: no root noise, ties go to the lowest action index.
pub fn get_best_move<G, E>(
    game: &G,
    estimator: &E,
    state: &G::State,
    simulations: usize,
) -> Result<G::Action, SearchError>
where
    G: Game,
    E: Estimator + ?Sized,
{
    analyze(game, estimator, state, simulations).map(|result| result.best_action)
}

/// Raw estimator value for the side to move, without search.
///
/// A finished game returns its exact result instead.
pub fn evaluate_position<G, E>(game: &G, estimator: &E, state: &G::State) -> Result<f32, SearchError>
where
    G: Game,
    E: Estimator + ?Sized,
{
    if game.is_terminal(state) {
        return Ok(game.result(state, game.to_move(state))?);
    }
    let prediction = estimator.predict(&game.encode(state))?;
    Ok(prediction.value)
}
