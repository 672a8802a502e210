//! Input feature planes for the neural network.
//!
//! The board is centered on a fixed `MODEL_SIZE` grid. Planes, in feature
//! units of `MODEL_SIZE * MODEL_SIZE`, all relative to the side to move:
//!
//! | plane  | meaning                                         |
//! |--------|-------------------------------------------------|
//! | 0      | empty cells                                     |
//! | 1      | own stones                                      |
//! | 2      | own stones in a ladder                          |
//! | 3..10  | own stones by liberty count (clamped to 8)      |
//! | 11..13 | own last three moves, most recent first         |
//! | 14     | opponent stones                                 |
//! | 15     | opponent stones in a ladder                     |
//! | 16..23 | opponent stones by liberty count                |
//! | 24..26 | opponent last three moves                       |
//! | 27..30 | rings at distance 1..4 from the edge            |
//! | 31     | ko position for the side to move                |
//! | 32     | mask: 1 on the real board, 0 on padding         |
//!
//! A scalar tail follows the planes: side to move (two one-hots), scaled
//! komi, superko flag, ko-occurred flag, and two rule one-hots.

use crate::board::Board;
use crate::color::{Color, BLACK, WHITE};
use crate::Rule;

/// Side of the fixed model grid.
pub const MODEL_SIZE: usize = 19;
/// Number of board feature planes (the mask plane comes on top).
pub const MODEL_FEATURES: usize = 32;
/// Number of scalar inputs after the planes.
pub const MODEL_INFOS: usize = 7;
/// Number of per-cell prediction planes in the model output.
pub const MODEL_PREDICTIONS: usize = 6;
/// Number of scalar outputs after the prediction planes.
pub const MODEL_VALUES: usize = 3;

/// Total input tensor length per position.
pub const MODEL_INPUT_SIZE: usize =
    (MODEL_FEATURES + 1) * MODEL_SIZE * MODEL_SIZE + MODEL_INFOS;
/// Total output tensor length per position.
pub const MODEL_OUTPUT_SIZE: usize = MODEL_PREDICTIONS * MODEL_SIZE * MODEL_SIZE + MODEL_VALUES;

impl Board {
    /// Encodes the position as the model's input tensor for `color` to move.
    pub fn inputs(&mut self, color: Color, komi: f32, rule: Rule, superko: bool) -> Vec<f32> {
        let plane = MODEL_SIZE * MODEL_SIZE;
        let (w, h) = (self.width(), self.height());
        let offset_x = (MODEL_SIZE as i32 - w) / 2;
        let offset_y = (MODEL_SIZE as i32 - h) / 2;

        self.update_shicho();

        let mut inputs = vec![0.0f32; MODEL_INPUT_SIZE];

        for y in 0..h {
            for x in 0..w {
                let group_id = self.group_ids[self.index(x, y) as usize];
                let cell = ((offset_y + y) * MODEL_SIZE as i32 + (offset_x + x)) as usize;

                inputs[plane * MODEL_FEATURES + cell] = 1.0;

                if group_id == -1 {
                    inputs[cell] = 1.0;
                    continue;
                }

                let group = &self.groups[group_id as usize];
                let shicho = if group.shicho { 1.0 } else { 0.0 };
                let liberties = group.liberties.len().min(8);

                if group.color * color == BLACK {
                    inputs[plane + cell] = 1.0;
                    inputs[plane * 2 + cell] = shicho;
                    inputs[plane * (2 + liberties) + cell] = 1.0;
                } else if group.color * color == WHITE {
                    inputs[plane * 14 + cell] = 1.0;
                    inputs[plane * 15 + cell] = shicho;
                    inputs[plane * (15 + liberties) + cell] = 1.0;
                }
            }
        }

        // Move history, most recent first; plane sets swap with the mover.
        let own = if color == BLACK { 0 } else { 1 };
        for (base, histories) in [(11usize, own), (24usize, 1 - own)] {
            let mut moves = self.histories[histories].get();
            moves.reverse();
            for (i, &index) in moves.iter().enumerate() {
                if index > 0 {
                    let x = self.pos_x(index);
                    let y = self.pos_y(index);
                    let cell =
                        ((offset_y + y) * MODEL_SIZE as i32 + (offset_x + x)) as usize;
                    inputs[plane * (base + i) + cell] = 1.0;
                }
            }
        }

        // Rings one to four lines from the edge.
        for ring in 0..4 {
            let begin_x = offset_x + ring;
            let end_x = offset_x + w - ring;
            let begin_y = offset_y + ring;
            let end_y = offset_y + h - ring;
            let base = plane * (27 + ring as usize);

            for y in begin_y..end_y {
                inputs[base + (y * MODEL_SIZE as i32 + begin_x) as usize] = 1.0;
                inputs[base + (y * MODEL_SIZE as i32 + end_x - 1) as usize] = 1.0;
            }
            for x in begin_x..end_x {
                inputs[base + (begin_y * MODEL_SIZE as i32 + x) as usize] = 1.0;
                inputs[base + ((end_y - 1) * MODEL_SIZE as i32 + x) as usize] = 1.0;
            }
        }

        let ko_active = self.ko_color == color && self.ko_index > 0;
        if ko_active {
            let x = self.pos_x(self.ko_index);
            let y = self.pos_y(self.ko_index);
            let cell = ((offset_y + y) * MODEL_SIZE as i32 + (offset_x + x)) as usize;
            inputs[plane * 31 + cell] = 1.0;
        }

        let info = (MODEL_FEATURES + 1) * plane;
        if color == BLACK {
            inputs[info] = 1.0;
        } else {
            inputs[info + 1] = 1.0;
        }
        inputs[info + 2] = komi * color as f32 / 13.0;
        if superko {
            inputs[info + 3] = 1.0;
        }
        if ko_active {
            inputs[info + 4] = 1.0;
        }
        if rule != Rule::Japanese {
            inputs[info + 5] = 1.0;
        } else {
            inputs[info + 6] = 1.0;
        }

        inputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLANE: usize = MODEL_SIZE * MODEL_SIZE;

    fn cell(w: i32, h: i32, x: i32, y: i32) -> usize {
        let offset_x = (MODEL_SIZE as i32 - w) / 2;
        let offset_y = (MODEL_SIZE as i32 - h) / 2;
        (((offset_y + y) * MODEL_SIZE as i32) + offset_x + x) as usize
    }

    #[test]
    fn empty_and_stone_planes() {
        let mut board = Board::new(9, 9);
        board.play(3, 3, BLACK);
        board.play(5, 5, WHITE);

        let inputs = board.inputs(BLACK, 7.5, Rule::Chinese, false);
        // Own stone at (3,3), opponent stone at (5,5).
        assert_eq!(inputs[PLANE + cell(9, 9, 3, 3)], 1.0);
        assert_eq!(inputs[PLANE * 14 + cell(9, 9, 5, 5)], 1.0);
        // Neither is empty; an untouched cell is.
        assert_eq!(inputs[cell(9, 9, 3, 3)], 0.0);
        assert_eq!(inputs[cell(9, 9, 0, 0)], 1.0);
        // Four liberties each.
        assert_eq!(inputs[PLANE * (2 + 4) + cell(9, 9, 3, 3)], 1.0);
        assert_eq!(inputs[PLANE * (15 + 4) + cell(9, 9, 5, 5)], 1.0);
    }

    #[test]
    fn own_planes_follow_the_mover() {
        let mut board = Board::new(9, 9);
        board.play(3, 3, BLACK);
        let inputs = board.inputs(WHITE, 7.5, Rule::Chinese, false);
        // For white to move, the black stone is an opponent stone.
        assert_eq!(inputs[PLANE * 14 + cell(9, 9, 3, 3)], 1.0);
        assert_eq!(inputs[PLANE + cell(9, 9, 3, 3)], 0.0);
    }

    #[test]
    fn mask_covers_exactly_the_board() {
        let mut board = Board::new(9, 9);
        let inputs = board.inputs(BLACK, 7.5, Rule::Chinese, false);
        let mask: f32 = inputs[PLANE * MODEL_FEATURES..PLANE * (MODEL_FEATURES + 1)]
            .iter()
            .sum();
        assert_eq!(mask, 81.0);
    }

    #[test]
    fn history_planes_are_most_recent_first() {
        let mut board = Board::new(9, 9);
        board.play(1, 1, BLACK);
        board.play(2, 2, BLACK);
        let inputs = board.inputs(BLACK, 7.5, Rule::Chinese, false);
        // Plane 11 holds the latest own move, plane 12 the one before.
        assert_eq!(inputs[PLANE * 11 + cell(9, 9, 2, 2)], 1.0);
        assert_eq!(inputs[PLANE * 12 + cell(9, 9, 1, 1)], 1.0);
        assert_eq!(inputs[PLANE * 13..PLANE * 14].iter().sum::<f32>(), 0.0);
    }

    #[test]
    fn scalar_tail_encodes_turn_and_rule() {
        let mut board = Board::new(9, 9);
        let info = (MODEL_FEATURES + 1) * PLANE;

        let black = board.inputs(BLACK, 7.5, Rule::Chinese, false);
        assert_eq!(black[info], 1.0);
        assert_eq!(black[info + 1], 0.0);
        assert!((black[info + 2] - 7.5 / 13.0).abs() < 1e-6);
        assert_eq!(black[info + 5], 1.0);
        assert_eq!(black[info + 6], 0.0);

        let white = board.inputs(WHITE, 7.5, Rule::Japanese, true);
        assert_eq!(white[info], 0.0);
        assert_eq!(white[info + 1], 1.0);
        assert!((white[info + 2] + 7.5 / 13.0).abs() < 1e-6);
        assert_eq!(white[info + 3], 1.0);
        assert_eq!(white[info + 5], 0.0);
        assert_eq!(white[info + 6], 1.0);
    }

    #[test]
    fn ko_plane_marks_the_banned_cell() {
        let mut board = Board::new(9, 9);
        board.play(1, 0, BLACK);
        board.play(0, 1, BLACK);
        board.play(1, 2, BLACK);
        board.play(2, 0, WHITE);
        board.play(3, 1, WHITE);
        board.play(2, 2, WHITE);
        board.play(1, 1, WHITE);
        board.play(2, 1, BLACK);
        assert_eq!(board.ko(WHITE), (1, 1));

        let white = board.inputs(WHITE, 7.5, Rule::Chinese, false);
        assert_eq!(white[PLANE * 31 + cell(9, 9, 1, 1)], 1.0);
        let info = (MODEL_FEATURES + 1) * PLANE;
        assert_eq!(white[info + 4], 1.0);

        // The ban is white's alone; black sees an empty ko plane.
        let black = board.inputs(BLACK, 7.5, Rule::Chinese, false);
        assert_eq!(black[PLANE * 31..PLANE * 32].iter().sum::<f32>(), 0.0);
    }

    #[test]
    fn edge_ring_planes() {
        let mut board = Board::new(9, 9);
        let inputs = board.inputs(BLACK, 7.5, Rule::Chinese, false);
        // First-line ring: the 32 border cells of a 9x9 board.
        let ring: f32 = inputs[PLANE * 27..PLANE * 28].iter().sum();
        assert_eq!(ring, 32.0);
        assert_eq!(inputs[PLANE * 27 + cell(9, 9, 0, 0)], 1.0);
        assert_eq!(inputs[PLANE * 28 + cell(9, 9, 1, 1)], 1.0);
        assert_eq!(inputs[PLANE * 27 + cell(9, 9, 4, 4)], 0.0);
    }
}
