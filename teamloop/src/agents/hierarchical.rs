//! A whole team presented to its parent as a single executor.

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::agents::executor::Executor;
use crate::core::roster::Roster;
use crate::core::transcript::summarize_results;
use crate::core::types::{ConversationState, ExecutorDescriptor, Message};
use crate::graph::OrchestrationGraph;

/// Executor that drives a nested [`OrchestrationGraph`] per invocation.
///
/// Each call seeds a fresh state from the parent's messages plus the task and
/// runs the nested team to completion. Only the summary (one
/// `<id>: <last result>` line per nested executor) flows back; the nested
/// transcript and results stay private to the call.
pub struct HierarchicalExecutor {
    descriptor: ExecutorDescriptor,
    graph: OrchestrationGraph,
}

impl HierarchicalExecutor {
    pub fn new(descriptor: ExecutorDescriptor, graph: OrchestrationGraph) -> Self {
        Self { descriptor, graph }
    }

    /// Describe the team by the capabilities of its members.
    pub fn with_default_description(id: impl Into<String>, graph: OrchestrationGraph) -> Self {
        let description = team_description(graph.roster());
        Self::new(ExecutorDescriptor::new(id, description), graph)
    }

    pub fn descriptor(&self) -> &ExecutorDescriptor {
        &self.descriptor
    }

    pub fn graph(&self) -> &OrchestrationGraph {
        &self.graph
    }
}

impl Executor for HierarchicalExecutor {
    #[instrument(skip_all, fields(team = %self.descriptor.id, context = context.len()))]
    fn invoke(&self, task: &str, context: &[Message]) -> Result<String> {
        let state = ConversationState::with_history(context.to_vec(), task);
        let finished = self
            .graph
            .run_from(state, |_| {})
            .with_context(|| format!("nested team '{}'", self.descriptor.id))?;
        info!(
            executors = finished.results.len(),
            messages = finished.messages.len(),
            "nested team finished"
        );
        Ok(summarize_results(&finished.results))
    }
}

/// `Coordinates a team that can: <description>; <description>`.
pub fn team_description(roster: &Roster) -> String {
    if roster.is_empty() {
        return "Coordinates an empty team".to_string();
    }
    let capabilities: Vec<&str> = roster
        .descriptors()
        .iter()
        .map(|descriptor| descriptor.description.trim())
        .collect();
    format!("Coordinates a team that can: {}", capabilities.join("; "))
}
