//! End-to-end rules scenarios on full-size boards.

use goban::{Board, Rule, BLACK, EMPTY, WHITE};

fn stones(board: &Board) -> usize {
    board.colors(BLACK).iter().filter(|&&c| c != EMPTY).count()
}

#[test]
fn opening_move_on_a_full_board() {
    let mut board = Board::new(19, 19);
    assert_eq!(board.play(3, 3, BLACK), 0);
    assert_eq!(board.color_at(3, 3), BLACK);
    assert_eq!(board.group_liberties(3, 3), 4);
    assert_eq!(board.ko(BLACK), (-1, -1));
    assert_eq!(board.ko(WHITE), (-1, -1));
    assert_eq!(board.recent_moves(BLACK), vec![(3, 3)]);
}

#[test]
fn capture_accounting_across_a_sequence() {
    let mut board = Board::new(19, 19);
    let moves = [
        (16, 16, BLACK),
        (16, 15, WHITE),
        (15, 16, WHITE),
        (17, 16, WHITE),
        (3, 3, BLACK),
    ];
    for &(x, y, c) in &moves {
        assert!(board.play(x, y, c) >= 0);
    }
    let before = stones(&board);
    // White fills the last liberty and takes the corner-side stone.
    let captured = board.play(16, 17, WHITE);
    assert_eq!(captured, 1);
    assert_eq!(stones(&board), before + 1 - captured as usize);
    assert_eq!(board.color_at(16, 16), EMPTY);
}

#[test]
fn ko_ban_applies_to_one_side_only() {
    let mut board = Board::new(19, 19);
    for &(x, y, c) in &[
        (1, 0, BLACK),
        (0, 1, BLACK),
        (1, 2, BLACK),
        (2, 0, WHITE),
        (3, 1, WHITE),
        (2, 2, WHITE),
        (1, 1, WHITE),
    ] {
        board.play(x, y, c);
    }
    assert_eq!(board.play(2, 1, BLACK), 1);

    let ko = board.ko(WHITE);
    assert_eq!(ko, (1, 1));
    assert!(!board.is_enabled(ko.0, ko.1, WHITE, false));
    assert!(board.is_enabled(ko.0, ko.1, BLACK, false));
}

#[test]
fn copied_board_tracks_the_same_game() {
    let mut original = Board::new(19, 19);
    original.play(3, 3, BLACK);
    original.play(15, 15, WHITE);

    let mut copy = Board::new(19, 19);
    copy.copy_from(&original);

    let continuation = [(15, 3, BLACK), (3, 15, WHITE), (9, 9, BLACK)];
    for &(x, y, c) in &continuation {
        assert_eq!(original.play(x, y, c), copy.play(x, y, c));
    }
    assert_eq!(original.state(), copy.state());
    assert_eq!(original.colors(BLACK), copy.colors(BLACK));
}

#[test]
fn state_survives_a_long_game_prefix() {
    let mut board = Board::new(19, 19);
    let mut color = BLACK;
    for i in 0..40 {
        let x = (i * 7) % 19;
        let y = (i * 11) % 19;
        if board.is_enabled(x, y, color, false) {
            board.play(x, y, color);
            color = -color;
        }
    }

    let state = board.state();
    let mut restored = Board::new(19, 19);
    restored.load_state(&state).unwrap();
    assert_eq!(restored.state(), state);
    assert_eq!(restored.colors(BLACK), board.colors(BLACK));
    assert_eq!(restored.recent_moves(BLACK), board.recent_moves(BLACK));
    assert_eq!(restored.recent_moves(WHITE), board.recent_moves(WHITE));
}

#[test]
fn enabled_map_matches_pointwise_queries() {
    let mut board = Board::new(9, 9);
    board.play(4, 4, BLACK);
    board.play(4, 5, WHITE);
    let map = board.enabled_map(BLACK, false);
    for y in 0..9 {
        for x in 0..9 {
            assert_eq!(
                map[(y * 9 + x) as usize],
                board.is_enabled(x, y, BLACK, false),
                "mismatch at ({x}, {y})"
            );
        }
    }
}

#[test]
fn owners_of_a_finished_small_game() {
    let mut board = Board::new(5, 5);
    // Black walls off the left two columns; white the right two.
    for y in 0..5 {
        board.play(1, y, BLACK);
        board.play(3, y, WHITE);
    }
    let owners = board.owners(BLACK, Rule::Chinese);
    for y in 0..5 {
        assert_eq!(owners[(y * 5) as usize], BLACK, "column 0, row {y}");
        assert_eq!(owners[(y * 5 + 1) as usize], BLACK, "column 1, row {y}");
        assert_eq!(owners[(y * 5 + 3) as usize], WHITE, "column 3, row {y}");
        assert_eq!(owners[(y * 5 + 4) as usize], WHITE, "column 4, row {y}");
        // The middle column touches both walls.
        assert_eq!(owners[(y * 5 + 2) as usize], EMPTY, "column 2, row {y}");
    }
}
