//! The board: stone placement, group merging, capture, ko, and the compact
//! state round-trip.
//!
//! Internally the grid is `(width + 2) x (height + 2)`; the outer ring is
//! owned by a sentinel group (id 0, color `EDGE`) holding a fake off-board
//! liberty so it can never be captured. A position index is a flattened
//! padded coordinate. `group_ids[p]` is `-1` for an empty cell, `0` for the
//! border, or the representative position of the group occupying `p`.

use std::fmt;

use thiserror::Error;

use crate::color::{opposite, Color, BLACK, EMPTY, WHITE};
use crate::group::Group;
use crate::history::History;
use crate::pattern::Pattern;

/// Errors from decoding a serialized board state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("state blob has {actual} words, expected {expected}")]
    BadLength { expected: usize, actual: usize },
}

#[derive(Debug, Clone)]
pub struct Board {
    /// Padded width (logical width + 2).
    pub(crate) width: i32,
    /// Padded height (logical height + 2).
    pub(crate) height: i32,
    /// Padded cell count.
    pub(crate) length: i32,
    pub(crate) group_ids: Vec<i32>,
    pub(crate) groups: Vec<Group>,
    /// Per color (0 = black, 1 = white): region seed index per cell, -1 none.
    pub(crate) area_ids: [Vec<i32>; 2],
    /// Per color: region-confirmed flag, read at the region's seed index.
    pub(crate) area_flags: [Vec<bool>; 2],
    pub(crate) ko_index: i32,
    pub(crate) ko_color: Color,
    pub(crate) histories: [History; 2],
    pub(crate) pattern: Pattern,
    pub(crate) area_updated: bool,
    pub(crate) shicho_updated: bool,
}

impl Board {
    pub fn new(width: i32, height: i32) -> Self {
        let padded_w = width + 2;
        let padded_h = height + 2;
        let length = padded_w * padded_h;

        let mut board = Self {
            width: padded_w,
            height: padded_h,
            length,
            group_ids: vec![-1; length as usize],
            groups: vec![Group::new(); length as usize],
            area_ids: [vec![-1; length as usize], vec![-1; length as usize]],
            area_flags: [vec![false; length as usize], vec![false; length as usize]],
            ko_index: -1,
            ko_color: EMPTY,
            histories: [History::new(), History::new()],
            pattern: Pattern::new(width, height),
            area_updated: false,
            shicho_updated: false,
        };

        // Border sentinel: group 0 owns every outer-ring cell and keeps one
        // off-board liberty so it is never treated as capturable.
        board.groups[0].color = crate::color::EDGE;
        board.groups[0].liberties.insert(-1);

        for x in 0..padded_w {
            board.group_ids[x as usize] = 0;
            board.group_ids[(padded_w * (padded_h - 1) + x) as usize] = 0;
        }
        for y in 1..padded_h - 1 {
            board.group_ids[(padded_w * y) as usize] = 0;
            board.group_ids[(padded_w * y + padded_w - 1) as usize] = 0;
        }

        board
    }

    /// Logical board width.
    pub fn width(&self) -> i32 {
        self.width - 2
    }

    /// Logical board height.
    pub fn height(&self) -> i32 {
        self.height - 2
    }

    /// Resets the board to its initial empty state.
    pub fn clear(&mut self) {
        for y in 0..self.height - 2 {
            for x in 0..self.width - 2 {
                let index = self.index(x, y) as usize;
                self.group_ids[index] = -1;
                self.groups[index].reset();
            }
        }
        self.ko_index = -1;
        self.ko_color = EMPTY;
        self.histories[0].clear();
        self.histories[1].clear();
        self.pattern.clear();
        self.area_updated = false;
        self.shicho_updated = false;
    }

    /// Plays a stone and returns the number of captured stones, or `-1` when
    /// the move is illegal. Off-board coordinates are a pass: ko is cleared
    /// and 0 is returned.
    pub fn play(&mut self, x: i32, y: i32, color: Color) -> i32 {
        if !self.is_valid_position(x, y) {
            self.ko_index = -1;
            self.ko_color = EMPTY;
            return 0;
        }

        let index = self.index(x, y);
        let op_color = opposite(color);

        if !self.enabled_at(index, color, false) {
            return -1;
        }

        self.put(index, color);

        let mut removed = 0;
        for a in self.arounds() {
            let target = index + a;
            let group_id = self.group_ids[target as usize];
            if group_id == -1 {
                continue;
            }
            if self.groups[group_id as usize].color == color
                && group_id != self.group_ids[index as usize]
            {
                self.merge_groups(index, target);
            } else if self.groups[group_id as usize].color == op_color
                && self.groups[group_id as usize].liberties.is_empty()
            {
                removed += self.groups[group_id as usize].stones.len() as i32;
                self.remove_group(target);
                self.ko_index = target;
            }
        }

        // Ko arises only from a single-stone capture by a lone stone that
        // itself ends with a single liberty.
        let group_id = self.group_ids[index as usize] as usize;
        let stone_count = self.groups[group_id].stones.len();
        let liberty_count = self.groups[group_id].liberties.len();

        if removed != 1 || stone_count > 1 || liberty_count > 1 {
            self.ko_index = -1;
            self.ko_color = EMPTY;
        } else {
            self.ko_color = op_color;
        }

        if color == BLACK {
            self.histories[0].add(index);
        } else if color == WHITE {
            self.histories[1].add(index);
        }

        self.area_updated = false;
        self.shicho_updated = false;

        removed
    }

    /// Coordinates at which `color` is currently ko-banned, or `(-1, -1)`.
    pub fn ko(&self, color: Color) -> (i32, i32) {
        if self.ko_index != -1 && color == self.ko_color {
            (self.pos_x(self.ko_index), self.pos_y(self.ko_index))
        } else {
            (-1, -1)
        }
    }

    /// The most recent moves of `color`, oldest first, passes and empty
    /// slots filtered out.
    pub fn recent_moves(&self, color: Color) -> Vec<(i32, i32)> {
        let history = if color == BLACK {
            &self.histories[0]
        } else {
            &self.histories[1]
        };
        history
            .get()
            .iter()
            .map(|&index| (self.pos_x(index), self.pos_y(index)))
            .filter(|&(x, y)| self.is_valid_position(x, y))
            .collect()
    }

    /// Color of the stone at `(x, y)`, or `EMPTY`.
    pub fn color_at(&self, x: i32, y: i32) -> Color {
        self.color_of(self.index(x, y))
    }

    /// Row-major cell colors, each multiplied by `color` so the caller's own
    /// stones read as `BLACK`.
    pub fn colors(&self, color: Color) -> Vec<Color> {
        let (w, h) = (self.width(), self.height());
        let mut out = Vec::with_capacity((w * h) as usize);
        for y in 0..h {
            for x in 0..w {
                out.push(self.color_at(x, y) * color);
            }
        }
        out
    }

    /// Number of stones in the group at `(x, y)`, or 0 for an empty cell.
    pub fn group_size(&self, x: i32, y: i32) -> usize {
        match self.group_ids[self.index(x, y) as usize] {
            -1 => 0,
            id => self.groups[id as usize].stones.len(),
        }
    }

    /// Number of liberties of the group at `(x, y)`, or 0 for an empty cell.
    pub fn group_liberties(&self, x: i32, y: i32) -> usize {
        match self.group_ids[self.index(x, y) as usize] {
            -1 => 0,
            id => self.groups[id as usize].liberties.len(),
        }
    }

    /// True iff playing `(x, y)` with `color` is legal. With `check_seki`
    /// set, moves classified as seki are also rejected.
    pub fn is_enabled(&self, x: i32, y: i32, color: Color, check_seki: bool) -> bool {
        self.enabled_at(self.index(x, y), color, check_seki)
    }

    /// Row-major legality map for `color`.
    pub fn enabled_map(&self, color: Color, check_seki: bool) -> Vec<bool> {
        let (w, h) = (self.width(), self.height());
        let mut out = Vec::with_capacity((w * h) as usize);
        for y in 0..h {
            for x in 0..w {
                out.push(self.enabled_at(self.index(x, y), color, check_seki));
            }
        }
        out
    }

    /// Compact, deterministic encoding of the full board state: the packed
    /// stone words, one ko word, and one history word per color (three
    /// 10-bit fields, oldest in the low bits, values stored +1 so 0 means
    /// absent).
    pub fn state(&self) -> Vec<u32> {
        let mut state: Vec<u32> = self.pattern.values().to_vec();

        state.push((((self.ko_index + 1) as u32) << 2) | (self.ko_color + 1) as u32);

        for history in &self.histories {
            let moves = history.get();
            let mut word = 0u32;
            for (i, &m) in moves.iter().enumerate() {
                word |= ((m + 1) as u32 & 0x3FF) << (10 * i);
            }
            state.push(word);
        }

        state
    }

    /// Restores a state produced by [`Board::state`].
    pub fn load_state(&mut self, state: &[u32]) -> Result<(), StateError> {
        let (w, h) = (self.width(), self.height());
        let pattern_words = ((w * h - 1) / 16 + 1) as usize;
        let expected = pattern_words + 3;
        if state.len() != expected {
            return Err(StateError::BadLength {
                expected,
                actual: state.len(),
            });
        }

        self.clear();

        // Replaying placements row-major reconstructs every reachable
        // position: a partial group's liberties are a superset of its final
        // ones, so no replayed stone is ever captured.
        for y in 0..h {
            for x in 0..w {
                let pos = y * w + x;
                let value = (state[(pos / 16) as usize] >> ((pos % 16) * 2)) & 3;
                if value == 1 {
                    self.play(x, y, BLACK);
                } else if value == 2 {
                    self.play(x, y, WHITE);
                }
            }
        }

        let ko_word = state[state.len() - 3];
        self.ko_index = ((ko_word >> 2) & 0x3FFFF) as i32 - 1;
        self.ko_color = (ko_word & 3) as i32 - 1;

        for (c, &word) in state[state.len() - 2..].iter().enumerate() {
            self.histories[c].clear();
            for i in 0..3 {
                let value = ((word >> (10 * i)) & 0x3FF) as i32 - 1;
                if value != -1 {
                    self.histories[c].add(value);
                }
            }
        }

        self.area_updated = false;
        self.shicho_updated = false;
        Ok(())
    }

    /// Replaces this board's state with `other`'s. O(length); the hot path
    /// of ladder reading.
    pub fn copy_from(&mut self, other: &Board) {
        self.group_ids.copy_from_slice(&other.group_ids);
        self.groups.clone_from_slice(&other.groups);
        self.ko_index = other.ko_index;
        self.ko_color = other.ko_color;
        self.histories = other.histories.clone();
        self.pattern.copy_from(&other.pattern);
        self.area_updated = false;
        self.shicho_updated = false;
    }

    // ---- internals ----------------------------------------------------

    #[inline]
    pub(crate) fn arounds(&self) -> [i32; 4] {
        [-1, -self.width, 1, self.width]
    }

    #[inline]
    pub(crate) fn is_valid_position(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width - 2 && y >= 0 && y < self.height - 2
    }

    #[inline]
    pub(crate) fn index(&self, x: i32, y: i32) -> i32 {
        (y + 1) * self.width + (x + 1)
    }

    #[inline]
    pub(crate) fn pos_x(&self, index: i32) -> i32 {
        index.rem_euclid(self.width) - 1
    }

    #[inline]
    pub(crate) fn pos_y(&self, index: i32) -> i32 {
        index.div_euclid(self.width) - 1
    }

    #[inline]
    pub(crate) fn color_of(&self, index: i32) -> Color {
        match self.group_ids[index as usize] {
            -1 => EMPTY,
            id => self.groups[id as usize].color,
        }
    }

    /// Places a stone as a fresh single-stone group and fixes up adjacent
    /// liberty sets. No merging or capturing.
    fn put(&mut self, index: i32, color: Color) {
        self.pattern.put(self.pos_x(index), self.pos_y(index), color);

        self.group_ids[index as usize] = index;
        let slot = index as usize;
        self.groups[slot].color = color;
        self.groups[slot].stones.insert(index);

        for a in self.arounds() {
            let target = index + a;
            let group_id = self.group_ids[target as usize];
            if group_id == -1 {
                self.groups[slot].liberties.insert(target);
            } else {
                self.groups[group_id as usize].liberties.remove(&index);
            }
        }
    }

    /// Merges the group at `src_index` into the group at `dst_index` and
    /// rewrites the absorbed stones' ids.
    fn merge_groups(&mut self, src_index: i32, dst_index: i32) {
        let src_id = self.group_ids[src_index as usize];
        let dst_id = self.group_ids[dst_index as usize];

        let src = std::mem::take(&mut self.groups[src_id as usize]);
        let dst = &mut self.groups[dst_id as usize];
        dst.stones.extend(src.stones.iter().copied());
        dst.liberties.extend(src.liberties.iter().copied());

        for &pos in &src.stones {
            self.group_ids[pos as usize] = dst_id;
        }
    }

    /// Removes a captured group, returning each vacated cell as a liberty to
    /// its surviving neighbors.
    fn remove_group(&mut self, index: i32) {
        let group_id = self.group_ids[index as usize];
        let group = std::mem::take(&mut self.groups[group_id as usize]);

        for &pos in &group.stones {
            self.group_ids[pos as usize] = -1;
        }
        for &pos in &group.stones {
            self.pattern
                .remove(self.pos_x(pos), self.pos_y(pos), group.color);
            for a in self.arounds() {
                let target_id = self.group_ids[(pos + a) as usize];
                if target_id != -1 {
                    self.groups[target_id as usize].liberties.insert(pos);
                }
            }
        }
    }

    pub(crate) fn enabled_at(&self, index: i32, color: Color, check_seki: bool) -> bool {
        if self.group_ids[index as usize] != -1 {
            return false;
        }
        if index == self.ko_index && color == self.ko_color {
            return false;
        }
        if check_seki && self.is_seki_at(index, color) {
            return false;
        }

        let op_color = opposite(color);
        for a in self.arounds() {
            let target = index + a;
            let group_id = self.group_ids[target as usize];
            if group_id == -1 {
                return true;
            }
            let group = &self.groups[group_id as usize];
            if group.color == color && group.liberties.len() > 1 {
                return true;
            }
            if group.color == op_color && group.liberties.len() == 1 {
                return true;
            }
        }
        false
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = (self.width(), self.height());
        write!(f, "   ")?;
        for x in 0..w {
            write!(f, "{x:2}")?;
        }
        writeln!(f)?;
        writeln!(f, "  +{}-+", "--".repeat(w as usize))?;
        for y in 0..h {
            write!(f, "{y:2}|")?;
            for x in 0..w {
                let index = self.index(x, y);
                let cell = if index == self.ko_index {
                    " K"
                } else {
                    match self.color_at(x, y) {
                        BLACK => " X",
                        WHITE => " O",
                        _ => " .",
                    }
                };
                write!(f, "{cell}")?;
            }
            writeln!(f, " |")?;
        }
        writeln!(f, "  +{}-+", "--".repeat(w as usize))
    }
}
