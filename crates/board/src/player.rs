use serde::{Deserialize, Serialize};
use std::fmt;

/// The eight winning lines of a 3×3 grid: rows, columns, then diagonals.
pub const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// A side. X always moves first.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum Player {
    X = 0,
    O = 1,
}

impl Player {
    /// Returns the other side
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }

    /// Returns the index (0 for X, 1 for O)
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn symbol(self) -> char {
        match self {
            Player::X => 'X',
            Player::O => 'O',
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Status of a sub-board or of the whole game.
///
/// Once a status leaves `Active` it never changes again.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Status {
    Active,
    Won(Player),
    Drawn,
}

impl Status {
    #[inline]
    pub const fn is_active(self) -> bool {
        matches!(self, Status::Active)
    }

    #[inline]
    pub const fn winner(self) -> Option<Player> {
        match self {
            Status::Won(p) => Some(p),
            _ => None,
        }
    }

    /// Status of a 3×3 grid of owners.
    ///
    /// The first line (in [`LINES`] order) held by one player wins. Without a
    /// line the grid is drawn once every slot is `closed`, otherwise active.
    pub(crate) fn evaluate(owners: &[Option<Player>; 9], closed: impl Fn(usize) -> bool) -> Self {
        let winner = LINES.iter().find_map(|&[a, b, c]| match owners[a] {
            Some(p) if owners[b] == Some(p) && owners[c] == Some(p) => Some(p),
            _ => None,
        });

        match winner {
            Some(p) => Status::Won(p),
            None if (0..9).all(closed) => Status::Drawn,
            None => Status::Active,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Active => write!(f, "in progress"),
            Status::Won(p) => write!(f, "{p} wins"),
            Status::Drawn => write!(f, "draw"),
        }
    }
}
