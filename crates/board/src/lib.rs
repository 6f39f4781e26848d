//! Ultimate Zero Board - Ultimate Tic-Tac-Toe rules and position encoding
//!
//! The board is a 3×3 grid of 3×3 sub-boards. Positions are immutable
//! values: every move produces a new [`Position`]. Moves map bijectively
//! onto the flat indices `0..81` used for estimator input and output.

mod game_impl;
mod key;
mod moves;
mod observation;
mod player;
mod position;
mod sub_board;

pub use game_impl::UltimateTicTacToe;
pub use key::PositionKey;
pub use moves::{Move, ParseMoveError, NUM_MOVES};
pub use observation::{decode_move, encode, encode_move, planes, NUM_PLANES, OBSERVATION_SIZE};
pub use player::{Player, Status, LINES};
pub use position::Position;
pub use sub_board::SubBoard;
