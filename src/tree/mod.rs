//! Decision tree catalog and traversal.
//!
//! - [`TreeCatalog`]: validated, read-only node lookup
//! - [`TreeWalker`]: per-session traversal with compounding confidence
//! - [`TreeSessions`]: registry of live walkers for the server

mod catalog;
mod sessions;
mod types;
mod walker;

pub use catalog::*;
pub use sessions::*;
pub use types::*;
pub use walker::*;
