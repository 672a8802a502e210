//! Ladder (shicho) reading.
//!
//! A group is in a ladder when it has exactly one liberty and a depth-first
//! search over board copies proves the capture is forced: the defender's
//! only escape either is illegal, or leaves the group back at one liberty.
//! Two liberties after the escape hand the move back to the chaser, who gets
//! to try both; three or more mean the group is out.

use crate::board::Board;
use crate::color::{opposite, BLACK, WHITE};

impl Board {
    /// True iff the group at `(x, y)` is caught in a confirmed ladder.
    pub fn is_shicho(&mut self, x: i32, y: i32) -> bool {
        self.update_shicho();
        match self.group_ids[self.index(x, y) as usize] {
            -1 => false,
            id => self.groups[id as usize].shicho,
        }
    }

    /// Refreshes every group's ladder flag if a mutation invalidated it.
    pub(crate) fn update_shicho(&mut self) {
        if self.shicho_updated {
            return;
        }

        for index in 0..self.length {
            // One stone of every group sits at its representative index.
            if self.group_ids[index as usize] != index {
                continue;
            }
            let color = self.groups[index as usize].color;
            if color != BLACK && color != WHITE {
                continue;
            }
            let shicho = self.is_shicho_group(index);
            self.groups[index as usize].shicho = shicho;
        }

        self.shicho_updated = true;
    }

    /// Runs the ladder DFS for the group represented by `index`.
    fn is_shicho_group(&self, index: i32) -> bool {
        if self.groups[index as usize].liberties.len() != 1 {
            return false;
        }

        // Each stack entry is a full board snapshot; depth is bounded by the
        // length of the ladder.
        let mut stack: Vec<Board> = vec![self.clone()];

        while let Some(board) = stack.pop() {
            let group_id = board.group_ids[index as usize];
            if group_id == -1 {
                continue;
            }
            let color = board.groups[group_id as usize].color;
            let op_color = opposite(color);

            // A capturable chaser group next to the defender breaks the
            // ladder on this branch: the defender counter-captures.
            let mut counter_capture = false;
            'stones: for &pos in &board.groups[group_id as usize].stones {
                for a in board.arounds() {
                    let target_id = board.group_ids[(pos + a) as usize];
                    if target_id != -1 {
                        let target = &board.groups[target_id as usize];
                        if target.color == op_color && target.liberties.len() == 1 {
                            counter_capture = true;
                            break 'stones;
                        }
                    }
                }
            }
            if counter_capture {
                continue;
            }

            let escape = match board.groups[group_id as usize].liberties.iter().next() {
                Some(&pos) => pos,
                None => continue,
            };

            let mut escaped = board.clone();
            if escaped.play(escaped.pos_x(escape), escaped.pos_y(escape), color) < 0 {
                return true;
            }

            let escaped_id = escaped.group_ids[index as usize];
            let liberties: Vec<i32> = escaped.groups[escaped_id as usize]
                .liberties
                .iter()
                .copied()
                .collect();
            match liberties.len() {
                1 => return true,
                2 => {
                    for liberty in liberties {
                        let mut chased = escaped.clone();
                        chased.play(chased.pos_x(liberty), chased.pos_y(liberty), op_color);
                        stack.push(chased);
                    }
                }
                _ => continue,
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_ladder_is_caught() {
        let mut board = Board::new(9, 9);
        // White in the corner, black blocks the only side exit: the chase
        // runs up the edge and white never gets past two liberties.
        board.play(0, 0, WHITE);
        board.play(1, 0, BLACK);
        assert!(board.is_shicho(0, 0));
    }

    #[test]
    fn helper_stone_breaks_the_ladder() {
        let mut board = Board::new(9, 9);
        board.play(0, 0, WHITE);
        board.play(0, 2, WHITE);
        board.play(1, 0, BLACK);
        // Escaping connects to the helper and jumps to three liberties.
        assert!(!board.is_shicho(0, 0));
    }

    #[test]
    fn capturable_chaser_breaks_the_ladder() {
        let mut board = Board::new(9, 9);
        board.play(0, 0, WHITE);
        board.play(1, 0, BLACK);
        // (1,1) puts the chasing stone itself in atari: white counter-captures.
        board.play(1, 1, WHITE);
        assert_eq!(board.group_liberties(1, 0), 1);
        assert!(!board.is_shicho(0, 0));
    }

    #[test]
    fn group_with_two_liberties_is_not_a_ladder() {
        let mut board = Board::new(9, 9);
        board.play(3, 3, WHITE);
        board.play(3, 2, BLACK);
        board.play(2, 3, BLACK);
        assert!(!board.is_shicho(3, 3));
    }

    #[test]
    fn empty_cell_is_not_a_ladder() {
        let mut board = Board::new(9, 9);
        assert!(!board.is_shicho(4, 4));
    }

    #[test]
    fn flag_recomputes_after_mutation() {
        let mut board = Board::new(9, 9);
        board.play(0, 0, WHITE);
        board.play(1, 0, BLACK);
        assert!(board.is_shicho(0, 0));
        // The defender escapes to two liberties; the flag must follow.
        board.play(0, 1, WHITE);
        assert_eq!(board.group_liberties(0, 0), 2);
        assert!(!board.is_shicho(0, 0));
    }
}
