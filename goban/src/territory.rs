//! Lazy territory analysis and final-ownership maps.
//!
//! A *region* is a maximal flood of empty-or-opponent cells. A region is
//! confirmed for a color when every cell of the region touches exactly the
//! same set of that color's groups as the region's seed does, and a group is
//! alive (`fixed`) only while it borders at least two confirmed regions.
//! Demotions propagate until a fixpoint: losing a region can cost a group its
//! life, which in turn demotes the group's other regions.

use std::collections::BTreeSet;

use crate::board::Board;
use crate::color::{opposite, Color, BLACK, EMPTY, WHITE};
use crate::Rule;

impl Board {
    /// Recomputes region and life information for both colors if a mutation
    /// invalidated it.
    pub(crate) fn update_area(&mut self) {
        if self.area_updated {
            return;
        }

        for c in 0..2 {
            let color = if c == 0 { BLACK } else { WHITE };
            let op_color = opposite(color);

            let mut group_set: BTreeSet<i32> = BTreeSet::new();
            for index in 0..self.length {
                let group_id = self.group_ids[index as usize];
                if group_id != -1 && self.groups[group_id as usize].color == color {
                    group_set.insert(group_id);
                }
            }
            for &group_id in &group_set {
                self.groups[group_id as usize].areas.clear();
                self.groups[group_id as usize].fixed = true;
            }

            self.area_ids[c].iter_mut().for_each(|v| *v = -1);
            self.area_flags[c].iter_mut().for_each(|v| *v = false);

            let mut checks = vec![false; self.length as usize];

            for index in 0..self.length {
                if checks[index as usize] {
                    continue;
                }
                let cell_color = self.color_of(index);
                if cell_color != EMPTY && cell_color != op_color {
                    continue;
                }

                // Friendly groups touching the seed; the whole region must
                // agree with this set to be confirmed.
                let mut connected: BTreeSet<i32> = BTreeSet::new();
                for a in self.arounds() {
                    if self.color_of(index + a) == color {
                        connected.insert(self.group_ids[(index + a) as usize]);
                    }
                }

                self.area_flags[c][index as usize] = true;
                let mut stack = vec![index];
                while let Some(pos) = stack.pop() {
                    if checks[pos as usize] {
                        continue;
                    }
                    checks[pos as usize] = true;
                    self.area_ids[c][pos as usize] = index;

                    let mut around: BTreeSet<i32> = BTreeSet::new();
                    for a in self.arounds() {
                        let target_id = self.group_ids[(pos + a) as usize];
                        if target_id != -1 && self.groups[target_id as usize].color == color {
                            around.insert(target_id);
                        }
                    }
                    if around.is_empty() {
                        self.area_flags[c][pos as usize] = false;
                    }
                    if around != connected {
                        self.area_flags[c][index as usize] = false;
                    }

                    for a in self.arounds() {
                        let target_color = self.color_of(pos + a);
                        if target_color == EMPTY || target_color == op_color {
                            stack.push(pos + a);
                        }
                    }
                }

                if self.area_flags[c][index as usize] {
                    for &group_id in &connected {
                        self.groups[group_id as usize].areas.insert(index);
                    }
                }
            }

            // Demote until stable: a group needs two confirmed regions to
            // live, and a dying group drags its regions down with it.
            let mut updated = true;
            while updated {
                updated = false;
                for &group_id in &group_set {
                    if !self.groups[group_id as usize].fixed {
                        continue;
                    }
                    let areas: Vec<i32> =
                        self.groups[group_id as usize].areas.iter().copied().collect();
                    let fixed_count = areas
                        .iter()
                        .filter(|&&a| self.area_flags[c][a as usize])
                        .count();
                    if fixed_count >= 2 {
                        continue;
                    }
                    self.groups[group_id as usize].fixed = false;
                    for &area_id in &areas {
                        if self.area_flags[c][area_id as usize] {
                            self.area_flags[c][area_id as usize] = false;
                            updated = true;
                        }
                    }
                }
            }
        }

        self.area_updated = true;
    }

    /// Row-major map of confirmed territory. A cell reads as `BLACK * color`
    /// when it is black territory or a stone of a living black group, the
    /// mirror for white, `EMPTY` otherwise.
    pub fn territories(&mut self, color: Color) -> Vec<Color> {
        self.update_area();

        let (w, h) = (self.width(), self.height());
        let mut out = Vec::with_capacity((w * h) as usize);
        for y in 0..h {
            for x in 0..w {
                let index = self.index(x, y) as usize;
                let group_id = self.group_ids[index];
                let value = if group_id != -1 && self.groups[group_id as usize].fixed {
                    self.groups[group_id as usize].color * color
                } else if self.area_ids[0][index] != -1
                    && self.area_flags[0][self.area_ids[0][index] as usize]
                {
                    BLACK * color
                } else if self.area_ids[1][index] != -1
                    && self.area_flags[1][self.area_ids[1][index] as usize]
                {
                    WHITE * color
                } else {
                    EMPTY
                };
                out.push(value);
            }
        }
        out
    }

    /// Row-major map of final ownership under `rule`. Starts from confirmed
    /// territory, assigns remaining stones to their own color, and (except
    /// under the Japanese rule) fills empty regions bounded by a single
    /// color.
    pub fn owners(&mut self, color: Color, rule: Rule) -> Vec<Color> {
        let mut owners = self.territories(color);

        let (w, h) = (self.width(), self.height());
        for y in 0..h {
            for x in 0..w {
                let cell = (y * w + x) as usize;
                if owners[cell] == EMPTY {
                    owners[cell] = self.color_at(x, y) * color;
                }
            }
        }

        if rule == Rule::Japanese {
            return owners;
        }

        let mut areas = vec![EMPTY; self.length as usize];
        let mut checks = vec![false; self.length as usize];

        for y in 0..h {
            for x in 0..w {
                let index = self.index(x, y);
                if checks[index as usize] || self.color_at(x, y) != EMPTY {
                    continue;
                }

                let mut positions = Vec::new();
                let mut colors: BTreeSet<Color> = BTreeSet::new();
                let mut stack = vec![index];
                while let Some(pos) = stack.pop() {
                    if checks[pos as usize] {
                        continue;
                    }
                    checks[pos as usize] = true;
                    positions.push(pos);
                    for a in self.arounds() {
                        let target = pos + a;
                        match self.color_of(target) {
                            EMPTY => stack.push(target),
                            c if c == BLACK || c == WHITE => {
                                colors.insert(c);
                            }
                            _ => {}
                        }
                    }
                }

                if colors.len() == 1 {
                    let owner = *colors.iter().next().expect("non-empty set");
                    for pos in positions {
                        areas[pos as usize] = owner;
                    }
                }
            }
        }

        for y in 0..h {
            for x in 0..w {
                let cell = (y * w + x) as usize;
                if owners[cell] == EMPTY {
                    owners[cell] = areas[self.index(x, y) as usize] * color;
                }
            }
        }
        owners
    }
}
