//! Multi-source diagnosis: result types, ranking, learning statistics and
//! the session engine that ties them together.

mod aggregator;
mod engine;
mod learning;
mod types;

pub use aggregator::*;
pub use engine::*;
pub use learning::*;
pub use types::*;
