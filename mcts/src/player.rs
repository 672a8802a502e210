//! Search lifecycle: root management, the dispatcher, and the pause fence.
//!
//! A dispatcher thread turns the "evaluation started" state into descents:
//! whenever the search is neither paused nor stopped, a worker slot is free,
//! and the visit/playout targets are unmet, it claims a slot, counts the
//! visit, and submits one descent to the worker pool. Workers add their
//! playout deltas back and wake anyone blocked in [`Player::wait_evaluation`].
//!
//! Operations that mutate or read the tree structure (`play`, `initialize`,
//! candidate queries) raise the pause flag and wait for `running == 0`, so
//! they observe a fence over every in-flight descent.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{info, trace};

use goban::opposite;

use crate::config::{PlayerConfig, SearchOptions};
use crate::manager::NodeManager;
use crate::node::{Node, NodeId};
use crate::policy::Candidate;
use crate::pool::ThreadPool;
use crate::processor::Processor;

struct SearchState {
    root: Arc<Node>,
    options: SearchOptions,
    search_visits: u64,
    search_playouts: i64,
    target_visits: u64,
    target_playouts: i64,
    /// Per-descent RNG stream counter.
    descents: u64,
    running: usize,
    paused: bool,
    stopped: bool,
    terminated: bool,
}

struct PlayerShared {
    state: Mutex<SearchState>,
    cond: Condvar,
}

/// One engine instance: a board position under continuous evaluation.
pub struct Player {
    config: PlayerConfig,
    manager: Arc<NodeManager>,
    shared: Arc<PlayerShared>,
    dispatcher: Option<JoinHandle<()>>,
    rng: Mutex<ChaCha20Rng>,
    // Kept alive for the dispatcher; dropped after it is joined.
    _pool: Arc<ThreadPool>,
}

impl Player {
    pub fn new(processor: Arc<Processor>, config: PlayerConfig) -> Self {
        let manager = Arc::new(NodeManager::new(processor, &config));
        let root = manager.create_root();
        let pool = Arc::new(ThreadPool::new(config.threads));

        let shared = Arc::new(PlayerShared {
            state: Mutex::new(SearchState {
                root,
                options: SearchOptions::default(),
                search_visits: 0,
                search_playouts: 0,
                target_visits: 0,
                target_playouts: 0,
                descents: 0,
                running: 0,
                paused: false,
                stopped: true,
                terminated: false,
            }),
            cond: Condvar::new(),
        });

        let dispatcher = {
            let shared = Arc::clone(&shared);
            let manager = Arc::clone(&manager);
            let pool = Arc::clone(&pool);
            let pool_size = pool.size();
            let leaf_only = config.eval_leaf_only;
            let seed = config.seed;
            std::thread::spawn(move || {
                run_dispatcher(shared, manager, pool, pool_size, leaf_only, seed)
            })
        };

        Self {
            rng: Mutex::new(ChaCha20Rng::seed_from_u64(config.seed)),
            config,
            manager,
            shared,
            dispatcher: Some(dispatcher),
            _pool: pool,
        }
    }

    /// Resets the player to a clear board, releasing the whole tree.
    pub fn initialize(&self) {
        let mut state = self.pause();
        let old_root = Arc::clone(&state.root);
        state.root = self.manager.create_root();
        let keep = state.root.id();
        release_tree(&self.manager, &old_root, keep);
        info!("player initialized");
        self.resume(state);
    }

    /// Advances the root to the child reached by `(x, y)` and releases the
    /// rest of the tree. Returns the number of stones the move captured.
    pub fn play(&self, x: i32, y: i32) -> i32 {
        let mut state = self.pause();
        let old_root = Arc::clone(&state.root);
        let new_root = old_root.get_or_create_child(&self.manager, x, y);
        state.root = Arc::clone(&new_root);
        release_tree(&self.manager, &old_root, new_root.id());
        let captured = new_root.captured();
        trace!(x, y, captured, "root advanced");
        self.resume(state);
        captured
    }

    /// The pass move as a single candidate.
    pub fn get_pass(&self) -> Vec<Candidate> {
        let state = self.pause();
        let root = Arc::clone(&state.root);
        let candidate = Candidate {
            x: -1,
            y: -1,
            color: opposite(root.color()),
            visits: 0,
            prior: 1.0,
            value: root.value(),
            variations: Vec::new(),
        };
        self.resume(state);
        vec![candidate]
    }

    /// A move sampled from the root's policy priors with `temperature`.
    pub fn get_random(&self, temperature: f32) -> Vec<Candidate> {
        let state = self.pause();
        let root = Arc::clone(&state.root);
        let (x, y) = {
            let mut rng = self.rng.lock().expect("player rng poisoned");
            root.random_move(temperature, &mut rng)
        };
        let candidate = Candidate {
            x,
            y,
            color: opposite(root.color()),
            visits: 0,
            prior: 1.0,
            value: root.value(),
            variations: Vec::new(),
        };
        self.resume(state);
        vec![candidate]
    }

    /// Arms the dispatcher with fresh counters and the given root selection
    /// options. Runs until stopped or until wait targets are satisfied.
    pub fn start_evaluation(&self, options: SearchOptions) {
        let mut state = self.pause();
        state.options = options;
        state.search_visits = 0;
        state.search_playouts = 0;
        state.target_visits = u64::MAX;
        state.target_playouts = i64::MAX;
        state.stopped = false;
        info!("evaluation started");
        self.resume(state);
    }

    /// Blocks until `search_visits >= visits` and `search_playouts >=
    /// playouts`, or until `timelimit` elapses (`None` waits forever).
    /// Returns whether the targets were reached. With `stop` set, the
    /// dispatcher stops launching new descents after this call; in-flight
    /// descents still complete.
    pub fn wait_evaluation(
        &self,
        visits: u64,
        playouts: i64,
        timelimit: Option<Duration>,
        stop: bool,
    ) -> bool {
        let deadline = timelimit.map(|limit| Instant::now() + limit);
        let mut state = self.shared.state.lock().expect("player state poisoned");
        state.target_visits = visits;
        state.target_playouts = playouts;
        self.shared.cond.notify_all();

        loop {
            if state.terminated {
                break;
            }
            if state.search_visits >= visits && state.search_playouts >= playouts {
                break;
            }
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    let (guard, _) = self
                        .shared
                        .cond
                        .wait_timeout(state, deadline - now)
                        .expect("player state poisoned");
                    state = guard;
                }
                None => {
                    state = self.shared.cond.wait(state).expect("player state poisoned");
                }
            }
        }

        let reached = state.search_visits >= visits && state.search_playouts >= playouts;
        if stop {
            state.stopped = true;
        }
        drop(state);
        self.shared.cond.notify_all();
        reached
    }

    /// The root's children as candidates, in insertion order. Falls back to
    /// the best policy move (or pass) when the root has none.
    pub fn get_candidates(&self) -> Vec<Candidate> {
        let state = self.pause();
        let root = Arc::clone(&state.root);

        let mut candidates = Vec::new();
        for child_id in root.children() {
            let child = self.manager.get(child_id);
            candidates.push(Candidate {
                x: child.x(),
                y: child.y(),
                color: child.color(),
                visits: child.visits(),
                prior: child.prior(),
                value: child.value(),
                variations: child.variations(&self.manager),
            });
        }

        if candidates.is_empty() {
            let (x, y) = root.policy_move();
            candidates.push(Candidate {
                x,
                y,
                color: opposite(root.color()),
                visits: 0,
                prior: 1.0,
                value: root.value(),
                variations: Vec::new(),
            });
        }

        self.resume(state);
        candidates
    }

    /// The color to move at the root.
    pub fn get_color(&self) -> i32 {
        let state = self.shared.state.lock().expect("player state poisoned");
        opposite(state.root.color())
    }

    /// Serialized state of the root board.
    pub fn get_board_state(&self) -> Vec<u32> {
        let state = self.shared.state.lock().expect("player state poisoned");
        state.root.board_state()
    }

    /// Node-pool statistics.
    pub fn manager_stats(&self) -> crate::manager::ManagerStats {
        self.manager.stats()
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Raises the pause flag and waits for every in-flight descent to
    /// retire, establishing a fence over their value updates.
    fn pause(&self) -> MutexGuard<'_, SearchState> {
        let mut state = self.shared.state.lock().expect("player state poisoned");
        state.paused = true;
        while state.running > 0 {
            state = self.shared.cond.wait(state).expect("player state poisoned");
        }
        state
    }

    fn resume(&self, mut state: MutexGuard<'_, SearchState>) {
        state.paused = false;
        drop(state);
        self.shared.cond.notify_all();
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().expect("player state poisoned");
            state.terminated = true;
        }
        self.shared.cond.notify_all();
        if let Some(dispatcher) = self.dispatcher.take() {
            let _ = dispatcher.join();
        }
    }
}

fn run_dispatcher(
    shared: Arc<PlayerShared>,
    manager: Arc<NodeManager>,
    pool: Arc<ThreadPool>,
    pool_size: usize,
    leaf_only: bool,
    seed: u64,
) {
    loop {
        let (root, options, stream) = {
            let mut state = shared.state.lock().expect("player state poisoned");
            loop {
                if state.terminated {
                    return;
                }
                let targets_unmet = state.search_visits < state.target_visits
                    || state.search_playouts < state.target_playouts;
                if !state.paused && !state.stopped && targets_unmet && state.running < pool_size {
                    break;
                }
                state = shared.cond.wait(state).expect("player state poisoned");
            }
            state.search_visits += 1;
            state.running += 1;
            let stream = state.descents;
            state.descents += 1;
            (Arc::clone(&state.root), state.options.clone(), stream)
        };

        let shared_task = Arc::clone(&shared);
        let manager_task = Arc::clone(&manager);
        pool.submit(move || {
            let mut rng = ChaCha20Rng::seed_from_u64(seed.wrapping_add(stream));
            let delta = descend(&root, &manager_task, &options, leaf_only, &mut rng);

            let mut state = shared_task.state.lock().expect("player state poisoned");
            state.running -= 1;
            state.search_playouts += delta as i64;
            drop(state);
            shared_task.cond.notify_all();
        });
    }
}

/// One descent from the root. The visited path lives on this stack; there
/// are no parent pointers in the tree.
fn descend(
    root: &Arc<Node>,
    manager: &NodeManager,
    options: &SearchOptions,
    leaf_only: bool,
    rng: &mut ChaCha20Rng,
) -> i32 {
    let mut path: Vec<Arc<Node>> = vec![Arc::clone(root)];
    let mut total = 0;
    let mut current = options.clone();

    loop {
        let node = Arc::clone(path.last().expect("path never empty"));
        let outcome = node.evaluate(manager, &current, leaf_only, rng);

        match outcome.next {
            Some(next_id) => {
                if outcome.playouts < 0 {
                    // A first child appeared under leaf-only crediting: the
                    // value this node contributed when it was itself a leaf
                    // is retracted along the path that carried it.
                    for visited in &path {
                        visited.cancel_value(outcome.value);
                        visited.add_playouts(-1);
                    }
                    total -= 1;
                }
                path.push(manager.get(next_id));
            }
            None => {
                for visited in &path {
                    visited.update_value(outcome.value);
                    visited.add_playouts(1);
                }
                total += 1;
                break;
            }
        }

        // Root-only parameters apply to the first step; below the root the
        // descent uses plain defaults.
        current = SearchOptions::default();
    }

    trace!(depth = path.len(), playouts = total, "descent complete");
    total
}

/// Releases `node` and its whole subtree back to the pool, leaving the
/// subtree under `keep` untouched.
fn release_tree(manager: &NodeManager, node: &Arc<Node>, keep: NodeId) {
    let mut stack = vec![Arc::clone(node)];
    while let Some(current) = stack.pop() {
        if current.id() == keep {
            continue;
        }
        for child_id in current.children() {
            stack.push(manager.get(child_id));
        }
        manager.release(current.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UniformInference;
    use goban::BLACK;

    fn player() -> Player {
        let processor = Arc::new(
            Processor::new(&[0], 1, 8, |_| Ok(Box::new(UniformInference))).unwrap(),
        );
        Player::new(processor, PlayerConfig::for_testing())
    }

    #[test]
    fn fresh_player_is_black_to_move() {
        let player = player();
        assert_eq!(player.get_color(), BLACK);
    }

    #[test]
    fn play_advances_the_root() {
        let player = player();
        let before = player.get_board_state();
        let captured = player.play(4, 4);
        assert_eq!(captured, 0);
        assert_ne!(player.get_board_state(), before);
        assert_eq!(player.get_color(), goban::WHITE);
    }

    #[test]
    fn initialize_returns_to_a_clear_board() {
        let player = player();
        let fresh = player.get_board_state();
        player.play(4, 4);
        player.initialize();
        assert_eq!(player.get_board_state(), fresh);
        assert_eq!(player.get_color(), BLACK);
    }

    #[test]
    fn play_releases_the_abandoned_tree() {
        let player = player();
        player.start_evaluation(SearchOptions::default());
        player.wait_evaluation(20, 20, Some(Duration::from_secs(30)), true);
        let before = player.manager_stats();
        assert!(before.in_use > 1);
        player.play(4, 4);
        let after = player.manager_stats();
        assert!(after.in_use < before.in_use);
        // The arena never shrinks; at most the new root was fresh.
        assert!(after.total <= before.total + 1);
    }

    #[test]
    fn get_pass_reports_a_pass() {
        let player = player();
        let candidates = player.get_pass();
        assert_eq!(candidates.len(), 1);
        assert_eq!((candidates[0].x, candidates[0].y), (-1, -1));
        assert_eq!(candidates[0].color, BLACK);
    }

    #[test]
    fn get_random_returns_a_legal_move() {
        let player = player();
        let candidates = player.get_random(1.0);
        assert_eq!(candidates.len(), 1);
        assert!((0..9).contains(&candidates[0].x));
        assert!((0..9).contains(&candidates[0].y));
    }

    #[test]
    fn candidates_before_search_fall_back_to_policy() {
        let player = player();
        let candidates = player.get_candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].visits, 0);
    }
}
