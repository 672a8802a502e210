//! Go rules engine.
//!
//! This crate maintains the full rules state of a Go board: stone groups and
//! their liberties, ko, lazy territory analysis, ladder (shicho) reading, and
//! seki/nakade classification. It is the game-rules half of the engine; the
//! search half lives in the `mcts` crate and only talks to this one through
//! [`Board`].
//!
//! Design constraints that shape the code:
//!
//! - Every mutation goes through [`Board::play`], [`Board::clear`],
//!   [`Board::load_state`], or [`Board::copy_from`]. Derived data (territory,
//!   ladder flags) is invalidated on mutation and recomputed lazily on query.
//! - Copy-construction must stay cheap: ladder reading clones the board onto
//!   a DFS stack, so the board is a handful of flat vectors.
//! - The grid is border-padded so neighbor lookups never branch on edges; a
//!   sentinel group with id 0 owns the border cells.

mod board;
mod color;
mod features;
mod group;
mod history;
mod ladder;
mod pattern;
mod seki;
mod territory;

pub use board::{Board, StateError};
pub use color::{opposite, Color, Rule, BLACK, EDGE, EMPTY, PASS, WHITE};
pub use features::{
    MODEL_FEATURES, MODEL_INFOS, MODEL_INPUT_SIZE, MODEL_OUTPUT_SIZE, MODEL_PREDICTIONS,
    MODEL_SIZE, MODEL_VALUES,
};
pub use group::Group;
