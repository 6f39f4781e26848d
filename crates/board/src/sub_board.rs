use crate::{Player, Status};

/// One 3×3 sub-board: nine cells plus a cached status.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SubBoard {
    cells: [Option<Player>; 9],
    status: Status,
}

impl SubBoard {
    pub const EMPTY: SubBoard = SubBoard {
        cells: [None; 9],
        status: Status::Active,
    };

    #[inline]
    pub fn cell(&self, cell: usize) -> Option<Player> {
        self.cells[cell]
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Indices of empty cells in ascending order.
    pub fn empty_cells(&self) -> impl Iterator<Item = usize> + '_ {
        (0..9).filter(|&i| self.cells[i].is_none())
    }

    /// Marks `cell` for `player` and recomputes the status.
    ///
    /// Callers must have checked the board is active and the cell empty.
    pub(crate) fn place(&mut self, cell: usize, player: Player) {
        debug_assert!(self.is_active() && self.cells[cell].is_none());
        self.cells[cell] = Some(player);
        let cells = self.cells;
        self.status = Status::evaluate(&cells, |i| cells[i].is_some());
    }
}

impl Default for SubBoard {
    fn default() -> Self {
        Self::EMPTY
    }
}
