//! Per-group (ren) bookkeeping.

use std::collections::BTreeSet;

use crate::color::{Color, EMPTY};

/// One 4-connected group of same-colored stones.
///
/// Groups are stored in a board-parallel array and addressed by a
/// representative position (one of the group's stones). Ordered sets keep
/// "first liberty" iteration deterministic, which the ladder search relies
/// on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Stone color, or `EMPTY` for an unused slot.
    pub color: Color,
    /// Positions of the group's stones.
    pub stones: BTreeSet<i32>,
    /// Empty positions orthogonally adjacent to the group.
    pub liberties: BTreeSet<i32>,
    /// Seed positions of adjacent confirmed territory regions.
    pub areas: BTreeSet<i32>,
    /// True while the group is caught in a confirmed ladder.
    pub shicho: bool,
    /// True once life is confirmed by two or more adjacent confirmed regions.
    pub fixed: bool,
}

impl Group {
    pub fn new() -> Self {
        Self {
            color: EMPTY,
            stones: BTreeSet::new(),
            liberties: BTreeSet::new(),
            areas: BTreeSet::new(),
            shicho: false,
            fixed: false,
        }
    }

    /// Returns the slot to its unused state.
    pub fn reset(&mut self) {
        self.color = EMPTY;
        self.stones.clear();
        self.liberties.clear();
        self.areas.clear();
        self.shicho = false;
        self.fixed = false;
    }
}

impl Default for Group {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::BLACK;

    #[test]
    fn reset_clears_everything() {
        let mut group = Group::new();
        group.color = BLACK;
        group.stones.insert(25);
        group.liberties.insert(26);
        group.shicho = true;
        group.fixed = true;

        group.reset();
        assert_eq!(group, Group::new());
    }
}
