//! Lossless position keys.
//!
//! Each of the 81 cells takes two bits (empty, X, O), indexed by move index.
//! Cells `0..64` fill `lo`; cells `64..81` fill the low 34 bits of `hi`,
//! followed by one bit for the side to move and four bits for the required
//! sub-board (`0` = unconstrained, `1..=9` = board index + 1). Sub-board and
//! game statuses are functions of the cells, so the key identifies the
//! position exactly.

use std::fmt;

use crate::{Move, Player, Position};

const TO_MOVE_SHIFT: u32 = 34;
const REQUIRED_SHIFT: u32 = 35;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionKey {
    lo: u128,
    hi: u64,
}

impl PositionKey {
    pub(crate) fn new(pos: &Position) -> Self {
        let mut lo = 0u128;
        let mut hi = 0u64;

        for mv in Move::all() {
            let bits = match pos.cell(mv) {
                None => 0,
                Some(Player::X) => 1,
                Some(Player::O) => 2,
            };
            let i = mv.index();
            if i < 64 {
                lo |= (bits as u128) << (2 * i);
            } else {
                hi |= (bits as u64) << (2 * (i - 64));
            }
        }

        hi |= (pos.side_to_move().index() as u64) << TO_MOVE_SHIFT;
        let required = pos.required_board().map_or(0, |b| b as u64 + 1);
        hi |= required << REQUIRED_SHIFT;

        PositionKey { lo, hi }
    }
}

impl fmt::Debug for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PositionKey({:010x}{:032x})", self.hi, self.lo)
    }
}
