//! Stone colors and scoring rules.
//!
//! Colors are plain signed integers because the rest of the engine leans on
//! their arithmetic: `opposite(c) == -c`, and a value signed for black can be
//! re-signed for the side to move by multiplying with the mover's color.

/// Stone color (or cell content). `BLACK` and `WHITE` are negatives of each
/// other; `EDGE` marks the border padding.
pub type Color = i32;

pub const EMPTY: Color = 0;
pub const BLACK: Color = 1;
pub const WHITE: Color = -1;
pub const EDGE: Color = 2;

/// Coordinates meaning "pass".
pub const PASS: (i32, i32) = (-1, -1);

/// The opponent of `color`.
#[inline]
pub fn opposite(color: Color) -> Color {
    -color
}

/// Scoring rule used for territory/owner queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum Rule {
    /// Chinese counting: stones plus territory.
    Chinese = 0,
    /// Japanese counting: territory only.
    Japanese = 1,
    /// Automatic-match counting used between engines.
    Computer = 2,
}
