//! Side-to-move tracking relative to the search root.

/// Which perspective the current node's `player` bitboard belongs to.
///
/// The board itself always stores the mover in `player`; the search keeps
/// this flag so the incremental evaluation state, which is maintained for
/// both perspectives, knows which one is to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SideToMove {
    Player,
    Opponent,
}

impl SideToMove {
    #[inline(always)]
    pub fn switch(self) -> SideToMove {
        match self {
            SideToMove::Player => SideToMove::Opponent,
            SideToMove::Opponent => SideToMove::Player,
        }
    }
}
