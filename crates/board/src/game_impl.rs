//! Implementation of the core Game trait for Ultimate Tic-Tac-Toe.

use uzero_core::{Game, GameError};

use crate::observation::{self, OBSERVATION_SIZE};
use crate::{Move, Player, Position, PositionKey, NUM_MOVES};

/// Ultimate Tic-Tac-Toe rules.
#[derive(Clone, Copy, Debug, Default)]
pub struct UltimateTicTacToe;

impl Game for UltimateTicTacToe {
    type State = Position;
    type Action = Move;
    type Player = Player;
    type Key = PositionKey;

    fn initial_state(&self) -> Position {
        Position::new()
    }

    fn legal_actions(&self, state: &Position) -> Vec<Move> {
        state.legal_moves()
    }

    fn apply(&self, state: &Position, action: Move) -> Result<Position, GameError> {
        state.apply(action)
    }

    fn is_terminal(&self, state: &Position) -> bool {
        state.is_terminal()
    }

    fn to_move(&self, state: &Position) -> Player {
        state.side_to_move()
    }

    fn result(&self, state: &Position, perspective: Player) -> Result<f32, GameError> {
        state.result(perspective)
    }

    fn position_key(&self, state: &Position) -> PositionKey {
        state.key()
    }

    fn encode(&self, state: &Position) -> Vec<f32> {
        observation::encode(state)
    }

    fn observation_size(&self) -> usize {
        OBSERVATION_SIZE
    }

    fn action_to_index(&self, action: Move) -> usize {
        observation::encode_move(action)
    }

    fn index_to_action(&self, index: usize) -> Option<Move> {
        observation::decode_move(index)
    }

    fn num_actions(&self) -> usize {
        NUM_MOVES
    }
}
