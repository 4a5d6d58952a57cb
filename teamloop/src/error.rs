//! Typed failures of an orchestration run.

use std::fmt;

use thiserror::Error;

use crate::core::types::ConversationState;

/// Node of the graph that was active when a run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Supervising,
    Executing(String),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Supervising => f.write_str("supervisor"),
            Stage::Executing(id) => write!(f, "executor '{id}'"),
        }
    }
}

/// The routing reply could not be turned into a valid decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("decision names unregistered executor '{target}' (registered: [{}])", .registered.join(", "))]
    UnknownTarget {
        target: String,
        registered: Vec<String>,
    },

    #[error("decision reply does not match the decision schema: {}", .errors.join("; "))]
    SchemaMismatch { errors: Vec<String> },

    #[error("decision reply is not a continue/terminate decision: {0}")]
    Unparsable(String),
}

#[derive(Debug, Error)]
pub enum RunErrorKind {
    #[error("protocol violation")]
    ProtocolViolation(#[from] ProtocolViolation),

    #[error("integration failure in {stage}")]
    IntegrationFailure {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error("iteration limit exceeded: {max_iterations} supervisor decisions without terminate")]
    IterationLimitExceeded { max_iterations: u32 },

    #[error("run cancelled before {stage}")]
    Cancelled { stage: Stage },
}

/// A failed run together with the state accumulated before the failure.
#[derive(Debug, Error)]
#[error("run stopped after {} messages", .state.messages.len())]
pub struct RunError {
    #[source]
    pub kind: RunErrorKind,
    pub state: ConversationState,
}

impl RunError {
    pub fn new(kind: RunErrorKind, state: ConversationState) -> Self {
        Self { kind, state }
    }

    pub fn is_protocol_violation(&self) -> bool {
        matches!(self.kind, RunErrorKind::ProtocolViolation(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, RunErrorKind::Cancelled { .. })
    }
}
