//! Search-tree nodes.
//!
//! A node owns the board snapshot reached by its move, the memoized network
//! evaluation of that board, the child table, and a value accumulator. Two
//! locks split the state: the structural lock covers the board, evaluation,
//! children, waiting queue, and visit counters; the value lock covers only
//! the accumulator, so backpropagation never contends with expansion.
//!
//! Nodes hold no parent pointers; a descent records its path on the worker
//! stack, so subtrees stay acyclic and can be recycled through the pool.

use std::collections::{HashSet, VecDeque};
use std::sync::RwLock;

use rand::distributions::{Distribution, WeightedIndex};
use rand_chacha::ChaCha20Rng;
use rand_distr::Gumbel;
use tracing::debug;

use goban::{opposite, Board, Color, PASS, WHITE};

use crate::config::SearchOptions;
use crate::evaluator::{Evaluation, Evaluator};
use crate::manager::NodeManager;

/// Handle into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// What one `evaluate` call tells the descending worker: where to go next
/// (none at a leaf), the node's evaluation value, and the playout delta the
/// caller must apply along its path (`+1` credit, `-1` retract, `0` keep
/// going).
#[derive(Debug, Clone, Copy)]
pub struct EvalOutcome {
    pub next: Option<NodeId>,
    pub value: f32,
    pub playouts: i32,
}

struct EvalState {
    board: Board,
    x: i32,
    y: i32,
    color: Color,
    captured: i32,
    prior: f32,
    evaluation: Option<Evaluation>,
    /// Children in insertion order, keyed by flattened move index.
    children: Vec<(i32, NodeId)>,
    /// Policies picked by the growth step, awaiting child allocation.
    waiting: VecDeque<crate::policy::Policy>,
    waiting_set: HashSet<i32>,
    visits: u32,
    playouts: i32,
}

struct ValueState {
    sum: f32,
    count: i32,
}

pub struct Node {
    id: NodeId,
    evaluator: Evaluator,
    eval: RwLock<EvalState>,
    value: RwLock<ValueState>,
}

impl Node {
    pub(crate) fn new(id: NodeId, evaluator: Evaluator, width: i32, height: i32) -> Self {
        Self {
            id,
            evaluator,
            eval: RwLock::new(EvalState {
                board: Board::new(width, height),
                x: -1,
                y: -1,
                color: WHITE,
                captured: 0,
                prior: 0.0,
                evaluation: None,
                children: Vec::new(),
                waiting: VecDeque::new(),
                waiting_set: HashSet::new(),
                visits: 0,
                playouts: 0,
            }),
            value: RwLock::new(ValueState { sum: 0.0, count: 0 }),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Clears evaluation and statistics; called when the node returns to the
    /// pool and before re-initialization.
    pub(crate) fn reset(&self) {
        let mut eval = self.eval.write().expect("node eval lock poisoned");
        eval.evaluation = None;
        eval.children.clear();
        eval.waiting.clear();
        eval.waiting_set.clear();
        eval.visits = 0;
        eval.playouts = 0;
        drop(eval);

        let mut value = self.value.write().expect("node value lock poisoned");
        value.sum = 0.0;
        value.count = 0;
    }

    /// Initializes the node as a clear-board root. Roots carry a white
    /// pseudo-move so black is the side to move.
    pub(crate) fn init_as_root(&self) {
        self.reset();
        let mut eval = self.eval.write().expect("node eval lock poisoned");
        eval.board.clear();
        eval.x = -1;
        eval.y = -1;
        eval.color = WHITE;
        eval.captured = 0;
        eval.prior = 1.0;
    }

    /// Initializes the node as the position after playing `(x, y)` with
    /// `color` on `parent_board`.
    pub(crate) fn init_as_child(
        &self,
        parent_board: &Board,
        x: i32,
        y: i32,
        color: Color,
        prior: f32,
    ) {
        self.reset();
        let mut eval = self.eval.write().expect("node eval lock poisoned");
        eval.board.copy_from(parent_board);
        eval.captured = eval.board.play(x, y, color);
        eval.x = x;
        eval.y = y;
        eval.color = color;
        eval.prior = prior;
    }

    /// One descent step at this node.
    ///
    /// Evaluates the board lazily, grows the candidate set by one policy,
    /// allocates at most one child, or selects among existing children. The
    /// `options` carry root-only selection parameters; descents pass
    /// defaults below the root.
    pub fn evaluate(
        &self,
        manager: &NodeManager,
        options: &SearchOptions,
        leaf_only: bool,
        rng: &mut ChaCha20Rng,
    ) -> EvalOutcome {
        let mut eval = self.eval.write().expect("node eval lock poisoned");

        if eval.evaluation.is_none() {
            let side = opposite(eval.color);
            let state = &mut *eval;
            match self.evaluator.evaluate(&mut state.board, side) {
                Ok(evaluation) => state.evaluation = Some(evaluation),
                Err(err) => {
                    // Treat the position as terminal; nothing is cached so a
                    // later descent can retry.
                    debug!(error = %err, "evaluation failed, returning terminal value");
                    eval.visits += 1;
                    return EvalOutcome {
                        next: None,
                        value: 0.0,
                        playouts: 1,
                    };
                }
            }
        }

        eval.visits += 1;

        let value = eval
            .evaluation
            .as_ref()
            .map(|e| e.value)
            .unwrap_or_default();
        let policy_count = eval
            .evaluation
            .as_ref()
            .map(|e| e.policies.len())
            .unwrap_or_default();

        if eval.visits == 1 || policy_count == 0 {
            return EvalOutcome {
                next: None,
                value,
                playouts: 1,
            };
        }

        self.grow_candidates(&mut eval, options, value, rng);

        // Promote the longest-waiting policy to a real child.
        if !eval.waiting.is_empty()
            && (options.width <= 0 || (eval.children.len() as i32) < options.width)
        {
            if let Some(policy) = eval.waiting.pop_front() {
                let board_width = eval.board.width();
                let index = policy.y * board_width + policy.x;
                eval.waiting_set.remove(&index);

                if !eval.children.iter().any(|&(key, _)| key == index) {
                    let child = manager.create_node();
                    child.init_as_child(
                        &eval.board,
                        policy.x,
                        policy.y,
                        opposite(eval.color),
                        policy.prior,
                    );
                    eval.children.push((index, child.id()));

                    let first_child = eval.children.len() == 1;
                    let playouts = if first_child && leaf_only { -1 } else { 0 };
                    return EvalOutcome {
                        next: Some(child.id()),
                        value,
                        playouts,
                    };
                }
            }
        }

        // Select among existing children, optionally narrowed to the
        // top-`width` by lower confidence bound.
        let mut entries: Vec<(NodeId, f32)> = Vec::with_capacity(eval.children.len());
        for &(_, child_id) in &eval.children {
            let child = manager.get(child_id);
            entries.push((child_id, child.value_lcb() * child.color() as f32));
        }
        if entries.is_empty() {
            return EvalOutcome {
                next: None,
                value,
                playouts: 1,
            };
        }
        if options.width > 0 && entries.len() as i32 > options.width {
            entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            entries.truncate(options.width as usize);
        }

        let parent_visits = eval.visits;
        let mut best_id = entries[0].0;
        let mut best_score = f32::NEG_INFINITY;
        for &(child_id, _) in &entries {
            let child = manager.get(child_id);
            let score = if options.equally {
                let visits = child.visits() as f32;
                let signed = child.value() * child.color() as f32;
                1.0 / (visits + 1.0 - signed * 0.5)
            } else if options.use_ucb1 {
                child.priority_ucb1(parent_visits)
            } else {
                child.priority_pucb(parent_visits)
            };
            if score > best_score {
                best_score = score;
                best_id = child_id;
            }
        }

        EvalOutcome {
            next: Some(best_id),
            value,
            playouts: 0,
        }
    }

    /// Picks the highest-priority policy and queues it for expansion.
    ///
    /// Priority is `adjusted_prior / (local_visits + 1)` where the prior is
    /// tempered toward uniformity when the node is losing and sharpened when
    /// winning, then perturbed by Gumbel noise once enough candidates exist.
    /// In `equally` mode, policies already tracked rank strictly below
    /// unseen ones.
    fn grow_candidates(
        &self,
        eval: &mut EvalState,
        options: &SearchOptions,
        value: f32,
        rng: &mut ChaCha20Rng,
    ) {
        let state = &mut *eval;
        let evaluation = match state.evaluation.as_mut() {
            Some(evaluation) => evaluation,
            None => return,
        };

        let children_count = state.children.len() + state.waiting_set.len();
        if children_count >= evaluation.policies.len() {
            return;
        }
        if options.width >= 1 && children_count as i32 >= options.width {
            return;
        }

        let temperature = options.temperature.max(0.1);
        let win_chance = value * opposite(state.color) as f32 * 0.5 + 0.5;
        let power = win_chance + (1.0 / temperature) * (1.0 - win_chance);
        let noise_scale = if children_count > 4 { options.noise } else { 0.0 };
        let gumbel = if noise_scale > 0.0 {
            Gumbel::new(0.0f32, noise_scale).ok()
        } else {
            None
        };

        let board_width = state.board.width();
        let mut best: Option<(usize, (bool, f32))> = None;
        for (i, policy) in evaluation.policies.iter().enumerate() {
            let index = policy.y * board_width + policy.x;
            let tracked = state.waiting_set.contains(&index)
                || state.children.iter().any(|&(key, _)| key == index);
            // Tiering applies only in `equally` mode; otherwise all
            // candidates compete on priority alone.
            let unseen = !options.equally || !tracked;

            let noise = gumbel
                .as_ref()
                .map(|g| g.sample(rng).exp())
                .unwrap_or(1.0);
            let adjusted = policy.prior.max(0.0).powf(power) * noise;
            let priority = adjusted / (policy.local_visits + 1) as f32;

            let key = (unseen, priority);
            if best.map_or(true, |(_, best_key)| key > best_key) {
                best = Some((i, key));
            }
        }

        if let Some((i, _)) = best {
            let policy = &mut evaluation.policies[i];
            let index = policy.y * board_width + policy.x;
            policy.local_visits += 1;
            let snapshot = policy.clone();

            let tracked = state.waiting_set.contains(&index)
                || state.children.iter().any(|&(key, _)| key == index);
            if !tracked {
                state.waiting.push_back(snapshot);
                state.waiting_set.insert(index);
            }
        }
    }

    /// Adds a descent's value to the accumulator.
    pub fn update_value(&self, value: f32) {
        let mut state = self.value.write().expect("node value lock poisoned");
        state.sum += value;
        state.count += 1;
    }

    /// Retracts a previously credited value.
    pub fn cancel_value(&self, value: f32) {
        let mut state = self.value.write().expect("node value lock poisoned");
        state.sum -= value;
        state.count -= 1;
        debug_assert!(state.count >= 0, "value cancel without a matching update");
    }

    pub fn add_playouts(&self, delta: i32) {
        let mut eval = self.eval.write().expect("node eval lock poisoned");
        eval.playouts += delta;
    }

    /// Mean accumulated value, 0 before the first update.
    pub fn value(&self) -> f32 {
        let state = self.value.read().expect("node value lock poisoned");
        if state.count == 0 {
            0.0
        } else {
            state.sum / state.count as f32
        }
    }

    /// Lower confidence bound on the value, signed so better-for-the-mover
    /// is always larger after multiplying by the mover's color.
    pub fn value_lcb(&self) -> f32 {
        let (sum, count) = {
            let state = self.value.read().expect("node value lock poisoned");
            (state.sum, state.count)
        };
        if count == 0 {
            return 0.0;
        }
        let (visits, color) = {
            let eval = self.eval.read().expect("node eval lock poisoned");
            (eval.visits, eval.color)
        };
        let value = sum / count as f32;
        let lower = 1.96 * 0.5 / ((visits + 1) as f32).sqrt();
        value - lower * color as f32
    }

    fn priority_pucb(&self, total_visits: u32) -> f32 {
        let (sum, count) = {
            let state = self.value.read().expect("node value lock poisoned");
            (state.sum, state.count)
        };
        if count == 0 {
            return -99.0;
        }
        let (visits, color, prior) = {
            let eval = self.eval.read().expect("node eval lock poisoned");
            (eval.visits, eval.color, eval.prior)
        };
        let c_puct = ((1.0 + total_visits as f32 + 19652.0) / 19652.0).ln() + 1.25;
        let value = (sum / count as f32) * color as f32;
        let upper = c_puct * prior * (total_visits as f32).sqrt() / (1.0 + visits as f32);
        value + 2.0 * upper
    }

    fn priority_ucb1(&self, total_visits: u32) -> f32 {
        let (sum, count) = {
            let state = self.value.read().expect("node value lock poisoned");
            (state.sum, state.count)
        };
        if count == 0 {
            return -99.0;
        }
        let visits = self.visits();
        let color = self.color();
        let value = (sum / count as f32) * color as f32;
        let upper = 0.5 * ((total_visits as f32).ln() / (visits + 1) as f32).sqrt();
        value + upper
    }

    pub fn x(&self) -> i32 {
        self.eval.read().expect("node eval lock poisoned").x
    }

    pub fn y(&self) -> i32 {
        self.eval.read().expect("node eval lock poisoned").y
    }

    pub fn color(&self) -> Color {
        self.eval.read().expect("node eval lock poisoned").color
    }

    pub fn captured(&self) -> i32 {
        self.eval.read().expect("node eval lock poisoned").captured
    }

    pub fn prior(&self) -> f32 {
        self.eval.read().expect("node eval lock poisoned").prior
    }

    pub fn visits(&self) -> u32 {
        self.eval.read().expect("node eval lock poisoned").visits
    }

    pub fn playouts(&self) -> i32 {
        self.eval.read().expect("node eval lock poisoned").playouts
    }

    /// Child ids in insertion order.
    pub fn children(&self) -> Vec<NodeId> {
        self.eval
            .read()
            .expect("node eval lock poisoned")
            .children
            .iter()
            .map(|&(_, id)| id)
            .collect()
    }

    pub(crate) fn waiting_len(&self) -> usize {
        self.eval
            .read()
            .expect("node eval lock poisoned")
            .waiting
            .len()
    }

    pub(crate) fn policy_count(&self) -> usize {
        self.eval
            .read()
            .expect("node eval lock poisoned")
            .evaluation
            .as_ref()
            .map(|e| e.policies.len())
            .unwrap_or_default()
    }

    /// The registered child for `(x, y)`, or a fresh node initialized with
    /// that move. A fresh node is *not* registered as a child here; the
    /// caller decides what tree it belongs to.
    pub fn get_or_create_child(&self, manager: &NodeManager, x: i32, y: i32) -> std::sync::Arc<Node> {
        let eval = self.eval.write().expect("node eval lock poisoned");
        let index = y * eval.board.width() + x;
        if let Some(&(_, id)) = eval.children.iter().find(|&&(key, _)| key == index) {
            return manager.get(id);
        }
        let node = manager.create_node();
        node.init_as_child(&eval.board, x, y, opposite(eval.color), 1.0);
        node
    }

    /// Samples a move from the policy priors with a temperature; `PASS` when
    /// the position has no candidates.
    pub fn random_move(&self, temperature: f32, rng: &mut ChaCha20Rng) -> (i32, i32) {
        let mut eval = self.eval.write().expect("node eval lock poisoned");
        self.ensure_evaluated(&mut eval);

        let evaluation = match eval.evaluation.as_ref() {
            Some(evaluation) if !evaluation.policies.is_empty() => evaluation,
            _ => return PASS,
        };

        let temperature = temperature.max(0.1);
        let weights: Vec<f32> = evaluation
            .policies
            .iter()
            .map(|p| p.prior.max(0.0).powf(1.0 / temperature))
            .collect();
        match WeightedIndex::new(&weights) {
            Ok(distribution) => {
                let policy = &evaluation.policies[distribution.sample(rng)];
                (policy.x, policy.y)
            }
            // All-zero weights; fall back to the best prior.
            Err(_) => evaluation
                .policies
                .iter()
                .max_by(|a, b| a.prior.partial_cmp(&b.prior).unwrap_or(std::cmp::Ordering::Equal))
                .map(|p| (p.x, p.y))
                .unwrap_or(PASS),
        }
    }

    /// The candidate with the highest prior; `PASS` when there is none.
    pub fn policy_move(&self) -> (i32, i32) {
        let mut eval = self.eval.write().expect("node eval lock poisoned");
        self.ensure_evaluated(&mut eval);

        eval.evaluation
            .as_ref()
            .and_then(|evaluation| {
                evaluation
                    .policies
                    .iter()
                    .max_by(|a, b| {
                        a.prior
                            .partial_cmp(&b.prior)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .map(|p| (p.x, p.y))
            })
            .unwrap_or(PASS)
    }

    fn ensure_evaluated(&self, eval: &mut EvalState) {
        if eval.evaluation.is_some() {
            return;
        }
        let side = opposite(eval.color);
        let state = &mut *eval;
        match self.evaluator.evaluate(&mut state.board, side) {
            Ok(evaluation) => state.evaluation = Some(evaluation),
            Err(err) => debug!(error = %err, "evaluation failed"),
        }
    }

    /// Greedy principal variation from this node: its own move, then the
    /// most-visited child's, and so on.
    pub fn variations(&self, manager: &NodeManager) -> Vec<(i32, i32)> {
        let mut moves = vec![(self.x(), self.y())];
        let mut current = self.best_visited_child(manager);
        while let Some(id) = current {
            let node = manager.get(id);
            moves.push((node.x(), node.y()));
            current = node.best_visited_child(manager);
        }
        moves
    }

    fn best_visited_child(&self, manager: &NodeManager) -> Option<NodeId> {
        let mut best: Option<(NodeId, u32)> = None;
        for id in self.children() {
            let visits = manager.get(id).visits();
            if visits > 0 && best.map_or(true, |(_, most)| visits > most) {
                best = Some((id, visits));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Serialized state of this node's board.
    pub fn board_state(&self) -> Vec<u32> {
        self.eval
            .read()
            .expect("node eval lock poisoned")
            .board
            .state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerConfig;
    use crate::model::UniformInference;
    use crate::processor::Processor;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn manager() -> NodeManager {
        let processor = Arc::new(
            Processor::new(&[0], 1, 8, |_| Ok(Box::new(UniformInference))).unwrap(),
        );
        NodeManager::new(processor, &PlayerConfig::for_testing())
    }

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(7)
    }

    #[test]
    fn first_visit_is_a_leaf() {
        let manager = manager();
        let root = manager.create_root();
        let outcome = root.evaluate(&manager, &SearchOptions::default(), false, &mut rng());
        assert!(outcome.next.is_none());
        assert_eq!(outcome.playouts, 1);
        assert_eq!(root.visits(), 1);
        assert_eq!(root.policy_count(), 81);
    }

    #[test]
    fn second_visit_expands_one_child() {
        let manager = manager();
        let root = manager.create_root();
        let mut rng = rng();
        root.evaluate(&manager, &SearchOptions::default(), false, &mut rng);
        let outcome = root.evaluate(&manager, &SearchOptions::default(), false, &mut rng);
        let child_id = outcome.next.expect("expansion returns the new child");
        assert_eq!(outcome.playouts, 0);
        assert_eq!(root.children(), vec![child_id]);

        let child = manager.get(child_id);
        // The child plays black on the root's empty board.
        assert_eq!(child.color(), goban::BLACK);
        assert_eq!(child.captured(), 0);
        assert_ne!(child.board_state(), root.board_state());
    }

    #[test]
    fn first_expansion_cancels_in_leaf_only_mode() {
        let manager = manager();
        let root = manager.create_root();
        let mut rng = rng();
        root.evaluate(&manager, &SearchOptions::default(), true, &mut rng);
        let outcome = root.evaluate(&manager, &SearchOptions::default(), true, &mut rng);
        assert!(outcome.next.is_some());
        assert_eq!(outcome.playouts, -1);
    }

    #[test]
    fn children_never_exceed_policies() {
        let manager = manager();
        let root = manager.create_root();
        let mut rng = rng();
        for _ in 0..200 {
            root.evaluate(&manager, &SearchOptions::default(), false, &mut rng);
        }
        let tracked = root.children().len() + root.waiting_len();
        assert!(tracked <= root.policy_count());
        // Child moves are pairwise distinct.
        let mut seen = std::collections::HashSet::new();
        for id in root.children() {
            let node = manager.get(id);
            assert!(seen.insert((node.x(), node.y())));
        }
    }

    #[test]
    fn width_limits_the_child_table() {
        let manager = manager();
        let root = manager.create_root();
        let mut rng = rng();
        let options = SearchOptions::default().with_width(3);
        for _ in 0..50 {
            root.evaluate(&manager, &options, false, &mut rng);
        }
        assert!(root.children().len() <= 3);
    }

    #[test]
    fn update_and_cancel_balance_out() {
        let manager = manager();
        let root = manager.create_root();
        root.update_value(0.75);
        assert!((root.value() - 0.75).abs() < 1e-6);
        root.update_value(0.25);
        assert!((root.value() - 0.5).abs() < 1e-6);
        root.cancel_value(0.75);
        assert!((root.value() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn variations_follow_the_most_visited_line() {
        let manager = manager();
        let root = manager.create_root();
        let mut rng = rng();
        for _ in 0..30 {
            root.evaluate(&manager, &SearchOptions::default(), false, &mut rng);
        }
        // Give one child an overwhelming visit count.
        let children = root.children();
        let favorite = manager.get(children[0]);
        for _ in 0..50 {
            favorite.evaluate(&manager, &SearchOptions::default(), false, &mut rng);
        }
        let variations = favorite.variations(&manager);
        assert_eq!(variations[0], (favorite.x(), favorite.y()));
    }

    #[test]
    fn random_move_returns_a_board_move() {
        let manager = manager();
        let root = manager.create_root();
        let (x, y) = root.random_move(1.0, &mut rng());
        assert!((0..9).contains(&x));
        assert!((0..9).contains(&y));
    }

    #[test]
    fn reset_clears_statistics() {
        let manager = manager();
        let root = manager.create_root();
        let mut rng = rng();
        root.evaluate(&manager, &SearchOptions::default(), false, &mut rng);
        root.update_value(1.0);
        root.reset();
        assert_eq!(root.visits(), 0);
        assert_eq!(root.children().len(), 0);
        assert!(root.value().abs() < 1e-6);
    }
}
