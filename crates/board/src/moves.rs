//! Move encoding as a single flat index.
//!
//! A move is the quadruple `(sub_row, sub_col, cell_row, cell_col)`, each in
//! `0..3`, stored as `sub_row·27 + sub_col·9 + cell_row·3 + cell_col`.
//! That index is also the move's slot in estimator policy vectors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Size of the action space.
pub const NUM_MOVES: usize = 81;

/// A placement: which sub-board, and which cell inside it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Move(u8);

impl Move {
    /// Create a move from its four coordinates, each in `0..3`.
    pub const fn new(sub_row: u8, sub_col: u8, cell_row: u8, cell_col: u8) -> Option<Self> {
        if sub_row < 3 && sub_col < 3 && cell_row < 3 && cell_col < 3 {
            Some(Move(sub_row * 27 + sub_col * 9 + cell_row * 3 + cell_col))
        } else {
            None
        }
    }

    /// Create a move from a sub-board index and a cell index, each in `0..9`.
    pub const fn from_parts(sub_board: usize, cell: usize) -> Option<Self> {
        if sub_board < 9 && cell < 9 {
            Some(Move((sub_board * 9 + cell) as u8))
        } else {
            None
        }
    }

    /// Create a move from its flat index in `0..81`.
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < NUM_MOVES {
            Some(Move(index as u8))
        } else {
            None
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn sub_row(self) -> u8 {
        self.0 / 27
    }

    #[inline]
    pub const fn sub_col(self) -> u8 {
        (self.0 / 9) % 3
    }

    #[inline]
    pub const fn cell_row(self) -> u8 {
        (self.0 % 9) / 3
    }

    #[inline]
    pub const fn cell_col(self) -> u8 {
        self.0 % 3
    }

    /// Sub-board index `sub_row·3 + sub_col`.
    #[inline]
    pub const fn sub_board(self) -> usize {
        (self.0 / 9) as usize
    }

    /// Cell index `cell_row·3 + cell_col` within the sub-board.
    #[inline]
    pub const fn cell(self) -> usize {
        (self.0 % 9) as usize
    }

    /// All 81 moves in index order.
    pub fn all() -> impl Iterator<Item = Move> {
        (0..NUM_MOVES as u8).map(Move)
    }
}

impl TryFrom<u8> for Move {
    type Error = ParseMoveError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Move::from_index(index as usize).ok_or(ParseMoveError::OutOfRange)
    }
}

impl From<Move> for u8 {
    fn from(mv: Move) -> u8 {
        mv.0
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move({}: {})", self.0, self)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{},{})",
            self.sub_row(),
            self.sub_col(),
            self.cell_row(),
            self.cell_col()
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseMoveError {
    #[error("expected a move index or four comma-separated coordinates")]
    Format,

    #[error("move coordinate or index out of range")]
    OutOfRange,
}

impl FromStr for Move {
    type Err = ParseMoveError;

    /// Accepts either a flat index (`"36"`) or four coordinates with or
    /// without parentheses (`"1,1,0,0"`, `"(1,1,0,0)"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('(').trim_end_matches(')');
        let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();

        match parts.as_slice() {
            [index] => {
                let index: usize = index.parse().map_err(|_| ParseMoveError::Format)?;
                Move::from_index(index).ok_or(ParseMoveError::OutOfRange)
            }
            [a, b, c, d] => {
                let mut coords = [0u8; 4];
                for (slot, part) in coords.iter_mut().zip([a, b, c, d]) {
                    *slot = part.parse().map_err(|_| ParseMoveError::Format)?;
                }
                Move::new(coords[0], coords[1], coords[2], coords[3])
                    .ok_or(ParseMoveError::OutOfRange)
            }
            _ => Err(ParseMoveError::Format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_index() {
        let mv = Move::new(1, 2, 0, 1).unwrap();
        assert_eq!(mv.index(), 27 + 18 + 1);
        assert_eq!(mv.sub_board(), 5);
        assert_eq!(mv.cell(), 1);
        assert_eq!(Move::new(2, 2, 2, 2).unwrap().index(), 80);
    }

    #[test]
    fn test_out_of_range() {
        assert!(Move::new(3, 0, 0, 0).is_none());
        assert!(Move::from_index(81).is_none());
        assert!(Move::from_parts(9, 0).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(Move::new(1, 1, 0, 0).unwrap().to_string(), "(1,1,0,0)");
    }

    #[test]
    fn test_parse() {
        let expected = Move::new(1, 1, 0, 0).unwrap();
        assert_eq!("1,1,0,0".parse::<Move>(), Ok(expected));
        assert_eq!(" (1, 1, 0, 0) ".parse::<Move>(), Ok(expected));
        assert_eq!("36".parse::<Move>(), Ok(expected));
        assert_eq!("81".parse::<Move>(), Err(ParseMoveError::OutOfRange));
        assert_eq!("1,1,0".parse::<Move>(), Err(ParseMoveError::Format));
        assert_eq!("a,b,c,d".parse::<Move>(), Err(ParseMoveError::Format));
    }
}
