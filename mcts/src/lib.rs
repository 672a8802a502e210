//! Parallel Monte Carlo tree search over a batched inference service.
//!
//! The crate is built from three layers:
//!
//! - **Inference plumbing**: [`Processor`] fans evaluation requests out to
//!   per-device [`Executor`] threads, each of which drains a job queue into
//!   GPU-sized batches and runs one [`InferenceModel`] call per batch. Every
//!   requester blocks until its slice of the batch is back.
//! - **The tree**: [`Node`]s live in the pooled [`NodeManager`] arena and
//!   are addressed by [`NodeId`]. A node owns its board snapshot, its
//!   memoized evaluation, and its value accumulator; descents expand
//!   children from Gumbel-perturbed policy priors and select among them by
//!   PUCB, UCB1, or an equalizing rule.
//! - **The lifecycle**: [`Player`] owns the root, a dispatcher thread that
//!   feeds descents to a worker pool, and the pause fence that keeps
//!   mutating calls (`play`, `initialize`, candidate reads) consistent with
//!   in-flight search.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mcts::{Player, PlayerConfig, Processor, SearchOptions, UniformInference};
//!
//! let processor = Arc::new(Processor::new(&[0], 1, 8, |_| {
//!     Ok(Box::new(UniformInference))
//! })?);
//! let player = Player::new(processor, PlayerConfig::default());
//! player.start_evaluation(SearchOptions::default());
//! player.wait_evaluation(800, 800, None, true);
//! let best = &player.get_candidates()[0];
//! ```

pub mod config;
pub mod evaluator;
pub mod executor;
mod job;
pub mod manager;
pub mod model;
pub mod node;
pub mod player;
pub mod policy;
pub mod pool;
pub mod processor;

pub use config::{PlayerConfig, SearchOptions};
pub use evaluator::{Evaluation, Evaluator};
pub use executor::Executor;
pub use manager::{ManagerStats, NodeManager};
pub use model::{InferenceError, InferenceModel, UniformInference};
pub use node::{EvalOutcome, Node, NodeId};
pub use player::Player;
pub use policy::{Candidate, Policy};
pub use pool::ThreadPool;
pub use processor::Processor;
