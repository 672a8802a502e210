//! End-to-end search behavior: determinism, invariants, and lifecycle.

use std::sync::Arc;
use std::time::Duration;

use mcts::{
    Player, PlayerConfig, Processor, SearchOptions, UniformInference,
};

fn uniform_processor() -> Arc<Processor> {
    Arc::new(Processor::new(&[0], 1, 8, |_| Ok(Box::new(UniformInference))).unwrap())
}

fn searched_player(config: PlayerConfig, visits: u64) -> Player {
    let player = Player::new(uniform_processor(), config);
    player.start_evaluation(SearchOptions::default());
    let reached =
        player.wait_evaluation(visits, visits as i64, Some(Duration::from_secs(60)), true);
    assert!(reached, "search did not reach its targets in time");
    player
}

#[test]
fn wait_evaluation_reaches_its_targets() {
    let player = searched_player(PlayerConfig::for_testing(), 32);
    let candidates = player.get_candidates();
    assert!(!candidates.is_empty());
    let visits: u32 = candidates.iter().map(|c| c.visits).sum();
    assert!(visits > 0);
}

#[test]
fn single_threaded_search_is_reproducible() {
    let summarize = |player: &Player| -> Vec<(i32, i32, u32, String)> {
        player
            .get_candidates()
            .iter()
            .map(|c| (c.x, c.y, c.visits, format!("{:.6}", c.value)))
            .collect()
    };

    let first = searched_player(PlayerConfig::for_testing(), 64);
    let second = searched_player(PlayerConfig::for_testing(), 64);
    assert_eq!(summarize(&first), summarize(&second));
}

#[test]
fn candidate_moves_are_distinct_and_on_board() {
    let player = searched_player(PlayerConfig::for_testing(), 48);
    let candidates = player.get_candidates();
    let mut seen = std::collections::HashSet::new();
    for candidate in &candidates {
        assert!((0..9).contains(&candidate.x));
        assert!((0..9).contains(&candidate.y));
        assert!(seen.insert((candidate.x, candidate.y)), "duplicate move");
    }
}

#[test]
fn variations_start_with_the_candidate_move() {
    let player = searched_player(PlayerConfig::for_testing(), 48);
    for candidate in player.get_candidates() {
        assert_eq!(candidate.variations[0], (candidate.x, candidate.y));
    }
}

#[test]
fn search_continues_after_playing_a_move() {
    let player = searched_player(PlayerConfig::for_testing(), 32);
    let candidates = player.get_candidates();
    let best = &candidates[0];
    player.play(best.x, best.y);

    player.start_evaluation(SearchOptions::default());
    let reached = player.wait_evaluation(16, 16, Some(Duration::from_secs(60)), true);
    assert!(reached);
    // The new root searches for white now.
    for candidate in player.get_candidates() {
        assert_eq!(candidate.color, goban::WHITE);
    }
}

#[test]
fn multi_threaded_search_completes() {
    let config = PlayerConfig::for_testing().with_threads(4);
    let player = searched_player(config, 64);
    let candidates = player.get_candidates();
    assert!(!candidates.is_empty());
}

#[test]
fn leaf_only_crediting_still_makes_progress() {
    let config = PlayerConfig::for_testing().with_leaf_only(true);
    let player = Player::new(uniform_processor(), config);
    player.start_evaluation(SearchOptions::default());
    let reached = player.wait_evaluation(32, 8, Some(Duration::from_secs(60)), true);
    assert!(reached);
}

#[test]
fn width_limits_root_candidates() {
    let player = Player::new(uniform_processor(), PlayerConfig::for_testing());
    player.start_evaluation(SearchOptions::default().with_width(4));
    player.wait_evaluation(48, 48, Some(Duration::from_secs(60)), true);
    assert!(player.get_candidates().len() <= 4);
}

#[test]
fn ucb1_and_equal_selection_run() {
    for options in [
        SearchOptions::default().with_ucb1(true),
        SearchOptions::default().with_equally(true),
        SearchOptions::default().with_noise(0.5).with_temperature(0.7),
    ] {
        let player = Player::new(uniform_processor(), PlayerConfig::for_testing());
        player.start_evaluation(options);
        let reached = player.wait_evaluation(24, 24, Some(Duration::from_secs(60)), true);
        assert!(reached);
        assert!(!player.get_candidates().is_empty());
    }
}

#[test]
fn deadline_expiry_returns_without_stopping() {
    let player = Player::new(uniform_processor(), PlayerConfig::for_testing());
    // No evaluation started: targets can never be met, the deadline fires.
    let reached = player.wait_evaluation(1_000_000, 1_000_000, Some(Duration::from_millis(50)), false);
    assert!(!reached);
}

#[test]
fn stopped_search_stays_consistent_across_reads() {
    let player = searched_player(PlayerConfig::for_testing(), 32);
    let first = player.get_candidates();
    let second = player.get_candidates();
    let key = |cs: &[mcts::Candidate]| -> Vec<(i32, i32, u32)> {
        cs.iter().map(|c| (c.x, c.y, c.visits)).collect()
    };
    assert_eq!(key(&first), key(&second));
}
