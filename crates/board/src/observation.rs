//! Observation encoding for estimator input.
//!
//! Converts a position to an 8-plane 9×9 feature representation, always from
//! the point of view of the side to move.

use crate::{Move, Player, Position, Status};

/// Number of planes in the observation tensor.
pub const NUM_PLANES: usize = 8;

/// Squares per plane (9×9 grid).
const PLANE_SIZE: usize = 81;

/// Total number of floats in the observation (8 planes × 81 squares).
pub const OBSERVATION_SIZE: usize = NUM_PLANES * PLANE_SIZE;

/// Plane indices for the observation tensor.
pub mod planes {
    pub const MOVER_MARKS: usize = 0;
    pub const OPPONENT_MARKS: usize = 1;
    /// All ones when X is to move.
    pub const SIDE_TO_MOVE: usize = 2;
    /// Every square of each sub-board the side to move may play in.
    pub const LEGAL_BOARD: usize = 3;
    pub const BOARD_WON_BY_MOVER: usize = 4;
    pub const BOARD_WON_BY_OPPONENT: usize = 5;
    pub const BOARD_DRAWN: usize = 6;
    pub const BIAS: usize = 7;
}

/// Square of `mv` on the 9×9 grid, row-major with row `sub_row·3 + cell_row`.
#[inline]
fn grid_square(mv: Move) -> usize {
    let row = (mv.sub_row() * 3 + mv.cell_row()) as usize;
    let col = (mv.sub_col() * 3 + mv.cell_col()) as usize;
    row * 9 + col
}

/// Encode a position into an 8-plane observation tensor.
///
/// The output is a flat `Vec<f32>` with 648 elements, laid out plane by plane:
/// `[plane_0_sq_0, ..., plane_0_sq_80, plane_1_sq_0, ...]`.
pub fn encode(pos: &Position) -> Vec<f32> {
    let mut obs = vec![0.0f32; OBSERVATION_SIZE];
    let mover = pos.side_to_move();

    for mv in Move::all() {
        let sq = grid_square(mv);
        match pos.cell(mv) {
            Some(p) if p == mover => obs[planes::MOVER_MARKS * PLANE_SIZE + sq] = 1.0,
            Some(_) => obs[planes::OPPONENT_MARKS * PLANE_SIZE + sq] = 1.0,
            None => {}
        }

        let sub = mv.sub_board();
        if pos.is_playable_board(sub) {
            obs[planes::LEGAL_BOARD * PLANE_SIZE + sq] = 1.0;
        }

        let status_plane = match pos.sub_board(sub).status() {
            Status::Active => None,
            Status::Won(p) if p == mover => Some(planes::BOARD_WON_BY_MOVER),
            Status::Won(_) => Some(planes::BOARD_WON_BY_OPPONENT),
            Status::Drawn => Some(planes::BOARD_DRAWN),
        };
        if let Some(plane) = status_plane {
            obs[plane * PLANE_SIZE + sq] = 1.0;
        }
    }

    if mover == Player::X {
        fill_plane(&mut obs, planes::SIDE_TO_MOVE, 1.0);
    }
    fill_plane(&mut obs, planes::BIAS, 1.0);

    obs
}

/// Flat action index of `mv`.
#[inline]
pub fn encode_move(mv: Move) -> usize {
    mv.index()
}

/// Inverse of [`encode_move`]; `None` outside `0..81`.
#[inline]
pub fn decode_move(index: usize) -> Option<Move> {
    Move::from_index(index)
}

#[inline]
fn fill_plane(obs: &mut [f32], plane: usize, value: f32) {
    let base = plane * PLANE_SIZE;
    obs[base..base + PLANE_SIZE].fill(value);
}
