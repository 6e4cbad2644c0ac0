//! Frame-scoped memory.
//!
//! - [`Arena`]: bump allocator with block growth, reset once per frame
//! - [`BlockSource`]: pluggable provider of the arena's backing blocks
//! - [`ArenaVec`] / [`ArenaString`]: containers that build directly in arena memory
//!
//! Anything allocated here is valid until the next `Arena::clear`.

mod arena;
mod scratch;
mod source;

pub use arena::{Arena, ArenaPtr};
pub use scratch::{ArenaString, ArenaVec};
pub use source::{AllocError, BlockSource, BudgetBlocks, SystemBlocks};
