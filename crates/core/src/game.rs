use crate::GameError;
use std::fmt::Debug;
use std::hash::Hash;

/// A deterministic, two-player, perfect-information game.
///
/// States are immutable values: [`Game::apply`] returns a new state and never
/// touches its input. Search and training code only talks to a game through
/// this trait plus the flat action indexing used for estimator I/O.
pub trait Game: Clone + Send + Sync {
    /// Full game state.
    type State: Clone + Debug + Send + Sync;

    /// A single move.
    type Action: Clone + Copy + Debug + Send + Sync + Eq + Hash;

    /// Side identifier.
    type Player: Clone + Copy + Debug + Send + Sync + Eq;

    /// Canonical, collision-free key for a state (used as a transposition key).
    type Key: Clone + Debug + Send + Sync + Eq + Hash;

    /// Returns the initial game state.
    fn initial_state(&self) -> Self::State;

    /// Returns all legal actions from the given state, in a deterministic
    /// order. Empty iff the state is terminal.
    fn legal_actions(&self, state: &Self::State) -> Vec<Self::Action>;

    /// Applies an action, returning a new state.
    ///
    /// # Errors
    /// Returns [`GameError::IllegalMove`] if the action is not legal.
    fn apply(&self, state: &Self::State, action: Self::Action) -> Result<Self::State, GameError>;

    /// Returns true if the game has ended.
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// The side to move in `state`.
    fn to_move(&self, state: &Self::State) -> Self::Player;

    /// Final result from `perspective`'s point of view: `1.0` win,
    /// `-1.0` loss, `0.0` draw.
    ///
    /// # Errors
    /// Returns [`GameError::NotTerminal`] for a game still in progress.
    fn result(&self, state: &Self::State, perspective: Self::Player) -> Result<f32, GameError>;

    /// Canonical key for `state`. Equal states give equal keys and distinct
    /// states give distinct keys.
    fn position_key(&self, state: &Self::State) -> Self::Key;

    /// Encodes a state into the flat tensor consumed by estimators.
    fn encode(&self, state: &Self::State) -> Vec<f32>;

    /// Length of every vector returned by [`Game::encode`].
    fn observation_size(&self) -> usize;

    /// Maps an action to a flat index for the policy vector.
    fn action_to_index(&self, action: Self::Action) -> usize;

    /// Maps a flat index back to an action, returning None if invalid.
    fn index_to_action(&self, index: usize) -> Option<Self::Action>;

    /// Total number of possible action indices (size of policy vector).
    fn num_actions(&self) -> usize;

    /// Legality mask over the full action space.
    fn legal_mask(&self, state: &Self::State) -> Vec<bool> {
        let mut mask = vec![false; self.num_actions()];
        for action in self.legal_actions(state) {
            mask[self.action_to_index(action)] = true;
        }
        mask
    }
}
