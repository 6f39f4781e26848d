//! Game state and the single state-transition operation.

use std::fmt;

use uzero_core::{GameError, IllegalMoveReason};

use crate::{Move, Player, PositionKey, Status, SubBoard};

/// A complete Ultimate Tic-Tac-Toe position.
///
/// Invariants:
/// - `status` is the line check applied to the sub-board statuses.
/// - `required`, when present, names an active sub-board and the game is active.
/// - A terminal position accepts no further moves.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Position {
    boards: [SubBoard; 9],
    status: Status,
    to_move: Player,
    required: Option<u8>,
    ply: u8,
}

impl Position {
    /// The empty board with X to move and no sub-board constraint.
    pub const fn new() -> Self {
        Position {
            boards: [SubBoard::EMPTY; 9],
            status: Status::Active,
            to_move: Player::X,
            required: None,
            ply: 0,
        }
    }

    /// Plays `moves` in order from the empty board.
    pub fn from_moves(moves: &[Move]) -> Result<Self, GameError> {
        moves
            .iter()
            .try_fold(Position::new(), |pos, &mv| pos.apply(mv))
    }

    #[inline]
    pub fn side_to_move(&self) -> Player {
        self.to_move
    }

    /// Meta-status of the whole game.
    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Sub-board the next move must be played in, if constrained.
    #[inline]
    pub fn required_board(&self) -> Option<usize> {
        self.required.map(usize::from)
    }

    /// Number of moves played so far.
    #[inline]
    pub fn ply(&self) -> usize {
        self.ply as usize
    }

    #[inline]
    pub fn sub_board(&self, index: usize) -> &SubBoard {
        &self.boards[index]
    }

    #[inline]
    pub fn sub_boards(&self) -> &[SubBoard; 9] {
        &self.boards
    }

    /// Owner of the cell addressed by `mv`.
    #[inline]
    pub fn cell(&self, mv: Move) -> Option<Player> {
        self.boards[mv.sub_board()].cell(mv.cell())
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        !self.status.is_active()
    }

    /// Whether the side to move may play in sub-board `index`.
    pub fn is_playable_board(&self, index: usize) -> bool {
        self.status.is_active()
            && self.boards[index].is_active()
            && self.required.map_or(true, |r| usize::from(r) == index)
    }

    /// Legal moves in ascending index order. Empty once the game is over.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::with_capacity(81);
        for sub in (0..9).filter(|&b| self.is_playable_board(b)) {
            moves.extend(
                self.boards[sub]
                    .empty_cells()
                    .filter_map(|cell| Move::from_parts(sub, cell)),
            );
        }
        moves
    }

    /// Checks `mv` against the rules without applying it.
    pub fn check_move(&self, mv: Move) -> Result<(), GameError> {
        let reason = if self.is_terminal() {
            Some(IllegalMoveReason::GameOver)
        } else if self.required.is_some_and(|r| usize::from(r) != mv.sub_board()) {
            Some(IllegalMoveReason::WrongSubBoard)
        } else if !self.boards[mv.sub_board()].is_active() {
            Some(IllegalMoveReason::SubBoardClosed)
        } else if self.cell(mv).is_some() {
            Some(IllegalMoveReason::CellOccupied)
        } else {
            None
        };

        match reason {
            Some(reason) => Err(GameError::IllegalMove {
                action: mv.to_string(),
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Returns the position after the side to move plays `mv`.
    ///
    /// # Errors
    /// [`GameError::IllegalMove`] if the game is over, another sub-board is
    /// required, the target sub-board is closed, or the cell is taken.
    pub fn apply(&self, mv: Move) -> Result<Position, GameError> {
        self.check_move(mv)?;

        let mut next = *self;
        next.boards[mv.sub_board()].place(mv.cell(), self.to_move);

        let owners = next.boards.map(|b| b.status().winner());
        let boards = next.boards;
        next.status = Status::evaluate(&owners, |i| !boards[i].is_active());

        // The cell just played names the next sub-board, unless that board
        // (or the game) is closed.
        let target = mv.cell();
        next.required = (next.status.is_active() && next.boards[target].is_active())
            .then_some(target as u8);

        next.to_move = self.to_move.opposite();
        next.ply = self.ply + 1;
        Ok(next)
    }

    /// Result for `perspective`: `1.0` win, `-1.0` loss, `0.0` draw.
    ///
    /// # Errors
    /// [`GameError::NotTerminal`] while the game is in progress.
    pub fn result(&self, perspective: Player) -> Result<f32, GameError> {
        match self.status {
            Status::Active => Err(GameError::NotTerminal),
            Status::Drawn => Ok(0.0),
            Status::Won(p) if p == perspective => Ok(1.0),
            Status::Won(_) => Ok(-1.0),
        }
    }

    /// Lossless key over cells, side to move and required sub-board.
    pub fn key(&self) -> PositionKey {
        PositionKey::new(self)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..9 {
            if row > 0 && row % 3 == 0 {
                writeln!(f, "------+-------+------")?;
            }
            for col in 0..9 {
                if col > 0 && col % 3 == 0 {
                    write!(f, "| ")?;
                }
                let sub = (row / 3) * 3 + col / 3;
                let cell = (row % 3) * 3 + col % 3;
                let symbol = match self.boards[sub].cell(cell) {
                    Some(p) => p.symbol(),
                    None if self.is_playable_board(sub) => '.',
                    None => ' ',
                };
                write!(f, "{symbol}")?;
                if col < 8 {
                    write!(f, " ")?;
                }
            }
            writeln!(f)?;
        }
        match self.status {
            Status::Active => write!(f, "{} to move", self.to_move),
            status => write!(f, "{status}"),
        }
    }
}
