//! Persistent text storage for the syntax tree.
//!
//! A [`Rope`] is an immutable character sequence with O(1) concatenation and
//! zero-copy substring extraction; every parse and every edit works over one.

mod change;
mod cursor;
mod rope;

pub use change::TextChange;
pub use cursor::{Cursor, EOF_CHAR};
pub use rope::{Chunks, Rope};
pub use text_size::{TextLen, TextRange, TextSize};
