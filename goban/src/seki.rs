//! Seki and nakade classification.
//!
//! A move is seki-classified when filling it would start a capturing race
//! the mover cannot win: every adjacent enemy group keeps two liberties, the
//! mover's merged group ends cramped, and the shape that would be left
//! behind fails (or is too big for) the nakade vital-point test. Legality
//! checks with `check_seki` reject such moves outright.

use std::collections::BTreeSet;

use crate::board::Board;
use crate::color::{opposite, Color};

/// Side of the scratch grid used by the nakade test.
const NAKADE_GRID: i32 = 5;

impl Board {
    /// True iff playing `index` with `color` is classified as seki.
    pub(crate) fn is_seki_at(&self, index: i32, color: Color) -> bool {
        let op_color = opposite(color);

        // A capturable enemy group next to the move means the race is
        // winnable, so the move is not seki.
        for a in self.arounds() {
            let group_id = self.group_ids[(index + a) as usize];
            if group_id != -1 {
                let group = &self.groups[group_id as usize];
                if group.color == op_color && group.liberties.len() == 1 {
                    return false;
                }
            }
        }

        // Seki needs at least one friendly neighbor to merge with.
        let mut group_set: BTreeSet<i32> = BTreeSet::new();
        for a in self.arounds() {
            let group_id = self.group_ids[(index + a) as usize];
            if group_id != -1 && self.groups[group_id as usize].color == color {
                group_set.insert(group_id);
            }
        }
        if group_set.is_empty() {
            return false;
        }

        // Combined liberty set of the merged group; nine or more liberties
        // is too open to be seki.
        let mut spaces: BTreeSet<i32> = BTreeSet::new();
        for a in self.arounds() {
            if self.group_ids[(index + a) as usize] == -1 {
                spaces.insert(index + a);
            }
        }
        for &group_id in &group_set {
            spaces.extend(self.groups[group_id as usize].liberties.iter().copied());
            if spaces.len() >= 9 {
                return false;
            }
        }
        spaces.remove(&index);

        match spaces.len() {
            0 => false,
            1 => {
                let space = *spaces.iter().next().expect("one liberty");
                self.is_seki_group(index, color, &group_set, space)
            }
            _ => self.is_seki_area(index, color, &group_set, &spaces),
        }
    }

    /// Seki test when the merged group would keep a single liberty.
    fn is_seki_group(
        &self,
        index: i32,
        color: Color,
        group_set: &BTreeSet<i32>,
        space_index: i32,
    ) -> bool {
        let op_color = opposite(color);

        // Enemy groups around the move and its last liberty; any other empty
        // cell nearby means the position is still open.
        let mut op_groups: BTreeSet<i32> = BTreeSet::new();
        for a in self.arounds() {
            for target in [index + a, space_index + a] {
                let group_id = self.group_ids[target as usize];
                if target != index && target != space_index && group_id == -1 {
                    return false;
                }
                if group_id != -1 && self.groups[group_id as usize].color == op_color {
                    op_groups.insert(group_id);
                }
            }
        }
        if op_groups.is_empty() {
            return false;
        }
        for &group_id in &op_groups {
            if self.groups[group_id as usize].liberties.len() != 2 {
                return false;
            }
        }

        // Seven or more own stones can never be reduced to a dead shape.
        let mut positions: BTreeSet<i32> = BTreeSet::new();
        positions.insert(index);
        for &group_id in group_set {
            positions.extend(self.groups[group_id as usize].stones.iter().copied());
            if positions.len() >= 7 {
                return true;
            }
        }
        if positions.len() >= 4 && !self.is_nakade(&positions) {
            return true;
        }

        // If the enemy keeps an outside liberty the race is frozen: seki.
        let mut op_spaces: BTreeSet<i32> = BTreeSet::new();
        for &group_id in &op_groups {
            op_spaces.extend(self.groups[group_id as usize].liberties.iter().copied());
        }
        op_spaces.remove(&index);
        op_spaces.remove(&space_index);
        !op_spaces.is_empty()
    }

    /// Seki test when the merged group would keep several liberties forming
    /// a small shared region.
    fn is_seki_area(
        &self,
        index: i32,
        color: Color,
        group_set: &BTreeSet<i32>,
        spaces: &BTreeSet<i32>,
    ) -> bool {
        let op_color = opposite(color);

        // Flood the region reachable from the liberties through empty and
        // enemy cells; the move cell joins through its neighbors.
        let mut positions: BTreeSet<i32> = BTreeSet::new();
        let mut adjacent: BTreeSet<i32> = BTreeSet::new();
        let mut stack: Vec<i32> = Vec::new();
        for &space in spaces {
            stack.push(space);
            positions.insert(space);
        }

        while let Some(pos) = stack.pop() {
            for a in self.arounds() {
                let target = pos + a;
                let group_id = self.group_ids[target as usize];
                if (group_id == -1 || self.groups[group_id as usize].color == op_color)
                    && !positions.contains(&target)
                {
                    stack.push(target);
                    positions.insert(target);
                }
                if group_id != -1 && self.groups[group_id as usize].color == color {
                    adjacent.insert(group_id);
                }
            }
            if positions.len() >= 9 {
                return false;
            }
        }

        // The region may touch only the groups the move connects to.
        if &adjacent != group_set {
            return false;
        }

        // Before the move: if the whole region is one area and removing any
        // single empty cell leaves a nakade, the fight is a nakade, not seki.
        if self.is_single_area(&positions, color, -1) {
            for &pos in &positions {
                if self.group_ids[pos as usize] != -1 {
                    continue;
                }
                let mut reduced = positions.clone();
                reduced.remove(&pos);
                if self.is_nakade(&reduced) {
                    return false;
                }
            }
        }

        // After the move: the remaining region must still be a single area,
        // and some one-cell reduction of it must be a nakade.
        let mut after: BTreeSet<i32> = positions.clone();
        after.remove(&index);
        if !self.is_single_area(&after, color, index) {
            return false;
        }
        for &pos in &after {
            if self.group_ids[pos as usize] != -1 {
                continue;
            }
            let mut reduced = after.clone();
            reduced.remove(&pos);
            if self.is_nakade(&reduced) {
                return true;
            }
        }
        false
    }

    /// True iff `positions` forms a nakade: a shape small enough to fit a
    /// 4x4 bounding box with a vital point connected to every other stone
    /// orthogonally, plus at most one diagonal (a corner diagonal when the
    /// shape sits in a true board corner).
    pub(crate) fn is_nakade(&self, positions: &BTreeSet<i32>) -> bool {
        if positions.is_empty() || positions.len() >= 7 {
            return false;
        }

        let mut start_x = self.width - 2;
        let mut start_y = self.height - 2;
        let mut end_x = 0;
        let mut end_y = 0;
        for &pos in positions {
            let (x, y) = (self.pos_x(pos), self.pos_y(pos));
            start_x = start_x.min(x);
            start_y = start_y.min(y);
            end_x = end_x.max(x);
            end_y = end_y.max(y);
        }
        if end_x - start_x > 3 || end_y - start_y > 3 {
            return false;
        }

        // Re-draw the shape on a bordered scratch grid.
        let mut cells = [0i32; (NAKADE_GRID * NAKADE_GRID) as usize];
        let mut corner = [0i32; (NAKADE_GRID * NAKADE_GRID) as usize];
        for &pos in positions {
            let (src_x, src_y) = (self.pos_x(pos), self.pos_y(pos));
            let slot = ((src_y - start_y + 1) * NAKADE_GRID + (src_x - start_x + 1)) as usize;
            cells[slot] = 1;
            if (src_x == 0 || src_x == self.width - 3) && (src_y == 0 || src_y == self.height - 3)
            {
                corner[slot] = 1;
            }
        }

        let arounds = [1, -1, NAKADE_GRID, -NAKADE_GRID];
        let horizontals = [1, -1, 1, -1];
        let verticals = [NAKADE_GRID, NAKADE_GRID, -NAKADE_GRID, -NAKADE_GRID];

        for y in 1..NAKADE_GRID - 1 {
            for x in 1..NAKADE_GRID - 1 {
                let p = y * NAKADE_GRID + x;
                if cells[p as usize] != 1 {
                    continue;
                }

                let mut direct = 0;
                for a in arounds {
                    direct += cells[(p + a) as usize];
                }

                let mut skew = 0;
                let mut corner_links = 0;
                for i in 0..4 {
                    let v = verticals[i];
                    let h = horizontals[i];
                    if cells[(p + v + h) as usize] != 1 {
                        continue;
                    }
                    if corner_links == 0 && corner[(p + v) as usize] == 1 && cells[(p + v) as usize] == 1
                    {
                        corner_links = 1;
                    } else if corner_links == 0
                        && corner[(p + h) as usize] == 1
                        && cells[(p + h) as usize] == 1
                    {
                        corner_links = 1;
                    } else if skew == 0
                        && cells[(p + v) as usize] == 1
                        && cells[(p + h) as usize] == 1
                    {
                        skew = 1;
                    }
                }

                if direct + skew + corner_links >= positions.len() as i32 - 1 {
                    return true;
                }
            }
        }
        false
    }

    /// True iff every position in `positions` lies in one region reachable
    /// through empty or enemy cells, skipping `excluded_index`.
    fn is_single_area(
        &self,
        positions: &BTreeSet<i32>,
        color: Color,
        excluded_index: i32,
    ) -> bool {
        let op_color = opposite(color);
        let first = match positions.iter().next() {
            Some(&pos) => pos,
            None => return true,
        };

        let mut reached: BTreeSet<i32> = BTreeSet::new();
        let mut stack = vec![first];
        reached.insert(first);
        while let Some(pos) = stack.pop() {
            for a in self.arounds() {
                let target = pos + a;
                let group_id = self.group_ids[target as usize];
                if (group_id == -1 || self.groups[group_id as usize].color == op_color)
                    && target != excluded_index
                    && !reached.contains(&target)
                {
                    stack.push(target);
                    reached.insert(target);
                }
            }
        }

        positions.iter().all(|pos| reached.contains(pos))
    }
}
