//! Executors and the supervisor that routes between them.

pub mod executor;
pub mod hierarchical;
pub mod supervisor;
