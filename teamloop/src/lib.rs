//! Supervisor-routed team orchestration.
//!
//! A supervisor decides, once per iteration and from the transcript alone,
//! which executor acts next; the loop repeats until the supervisor terminates.
//! Whole teams can be wrapped as single executors and nested inside other
//! teams. The crate is split the same way throughout:
//!
//! - **[`core`]**: Pure, deterministic logic (state transitions, roster, transcript).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Collaborator boundaries (routing oracle, prompts, team files).
//!   Isolated to enable scripted doubles in tests.
//!
//! [`graph`] drives the loop; [`agents`] holds the executor contract, the
//! supervisor and the hierarchical adapter; [`team`] assembles graphs from
//! team files for the CLI.

pub mod agents;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod graph;
pub mod io;
pub mod logging;
pub mod team;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tools;

pub use agents::executor::{Executor, FnTool, Tool, ToolError, ToolExecutor};
pub use agents::hierarchical::HierarchicalExecutor;
pub use crate::core::types::{
    ConversationState, ExecutorDescriptor, Message, Route, RouteDecision, RunOutput,
};
pub use error::{ProtocolViolation, RunError, RunErrorKind};
pub use graph::{GraphBuilder, OrchestrationGraph, Turn};
pub use io::oracle::{RoutingOracle, RoutingRequest};
