//! The supervising loop: one supervisor, N executors, one active node at a time.

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::agents::executor::{Executor, ToolExecutor};
use crate::agents::hierarchical::HierarchicalExecutor;
use crate::agents::supervisor::{DecideError, Supervisor};
use crate::core::roster::Roster;
use crate::core::types::{ConversationState, ExecutorDescriptor, Route, RouteDecision};
use crate::error::{ProtocolViolation, RunError, RunErrorKind, Stage};
use crate::io::config::GraphConfig;
use crate::io::oracle::RoutingOracle;

/// Observable event emitted after each node completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn<'a> {
    /// The supervisor produced decision number `iteration` (0-based) over a
    /// transcript of `messages` entries.
    Decided {
        iteration: u32,
        decision: &'a RouteDecision,
        messages: usize,
    },
    /// Executor `id` answered; its response is now message number `messages`.
    Executed {
        id: &'a str,
        response: &'a str,
        messages: usize,
    },
}

/// Registers executors and wires them to a supervisor.
pub struct GraphBuilder {
    executors: Vec<(ExecutorDescriptor, Box<dyn Executor>)>,
    config: GraphConfig,
    cancel: CancellationToken,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            executors: Vec::new(),
            config: GraphConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn executor(
        mut self,
        descriptor: ExecutorDescriptor,
        executor: impl Executor + 'static,
    ) -> Self {
        self.executors.push((descriptor, Box::new(executor)));
        self
    }

    /// Register a tool executor under its own descriptor.
    pub fn tool(self, executor: ToolExecutor) -> Self {
        let descriptor = executor.descriptor().clone();
        self.executor(descriptor, executor)
    }

    /// Register a nested team under its own descriptor.
    pub fn team(self, team: HierarchicalExecutor) -> Self {
        let descriptor = team.descriptor().clone();
        self.executor(descriptor, team)
    }

    pub fn config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Token checked on every node entry.
    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Validate the roster and the config, then attach the routing oracle.
    pub fn build(self, oracle: impl RoutingOracle + 'static) -> Result<OrchestrationGraph> {
        self.config.validate()?;
        let (descriptors, executors): (Vec<_>, Vec<_>) = self
            .executors
            .into_iter()
            .map(|(descriptor, executor)| {
                let id = descriptor.id.clone();
                (descriptor, (id, executor))
            })
            .unzip();
        let roster = Roster::new(descriptors)?;
        let supervisor = Supervisor::new(oracle, roster)?;
        Ok(OrchestrationGraph {
            supervisor,
            executors,
            max_iterations: self.config.max_iterations,
            cancel: self.cancel,
        })
    }
}

/// Cyclic control loop `SUPERVISING -> EXECUTING(id) -> SUPERVISING ... -> FINISHED`.
///
/// State is threaded by value through every transition. All entry points
/// take `&self`; a graph holds no per-run state and is not `Sync`, so two
/// runs of one instance can never interleave.
pub struct OrchestrationGraph {
    supervisor: Supervisor,
    executors: Vec<(String, Box<dyn Executor>)>,
    max_iterations: u32,
    cancel: CancellationToken,
}

impl OrchestrationGraph {
    pub fn builder() -> GraphBuilder {
        GraphBuilder::new()
    }

    pub fn roster(&self) -> &Roster {
        self.supervisor.roster()
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run from a single seed message holding `task`.
    pub fn run(&self, task: &str) -> Result<ConversationState, RunError> {
        self.run_from(ConversationState::seeded(task), |_| {})
    }

    /// Like [`run`](Self::run), reporting every completed node to `on_turn`.
    pub fn run_observed<F: FnMut(Turn<'_>)>(
        &self,
        task: &str,
        on_turn: F,
    ) -> Result<ConversationState, RunError> {
        self.run_from(ConversationState::seeded(task), on_turn)
    }

    /// Drive the loop from `state` until the supervisor terminates.
    ///
    /// Stops at the first protocol violation, integration failure, exhausted
    /// iteration budget or cancellation, returning the state reached so far.
    #[instrument(skip_all, fields(executors = self.executors.len(), max_iterations = self.max_iterations))]
    pub fn run_from<F: FnMut(Turn<'_>)>(
        &self,
        mut state: ConversationState,
        mut on_turn: F,
    ) -> Result<ConversationState, RunError> {
        let mut decisions = 0u32;
        loop {
            if self.cancel.is_cancelled() {
                return Err(cancelled(Stage::Supervising, state));
            }
            if decisions >= self.max_iterations {
                warn!(decisions, "supervisor never terminated");
                return Err(RunError::new(
                    RunErrorKind::IterationLimitExceeded {
                        max_iterations: self.max_iterations,
                    },
                    state,
                ));
            }

            let decision = match self.supervisor.decide(&state, decisions) {
                Ok(decision) => decision,
                Err(DecideError::Protocol(violation)) => {
                    return Err(RunError::new(violation.into(), state));
                }
                Err(DecideError::Integration(source)) => {
                    return Err(RunError::new(
                        RunErrorKind::IntegrationFailure {
                            stage: Stage::Supervising,
                            source,
                        },
                        state,
                    ));
                }
            };
            on_turn(Turn::Decided {
                iteration: decisions,
                decision: &decision,
                messages: state.messages.len(),
            });
            decisions += 1;

            let id = match &decision.route {
                Route::Terminate => {
                    state = state.routed(Route::Terminate);
                    info!(decisions, messages = state.messages.len(), "run finished");
                    return Ok(state);
                }
                Route::Continue(id) => id.clone(),
            };
            let Some(executor) = self.lookup(&id) else {
                return Err(RunError::new(
                    ProtocolViolation::UnknownTarget {
                        target: id,
                        registered: self.roster().ids().map(str::to_string).collect(),
                    }
                    .into(),
                    state,
                ));
            };
            state = state.routed(decision.route);

            if self.cancel.is_cancelled() {
                return Err(cancelled(Stage::Executing(id), state));
            }
            let response = match executor.invoke(state.last_content(), &state.messages) {
                Ok(response) => response,
                Err(source) if self.cancel.is_cancelled() || nested_cancel(&source) => {
                    debug!(executor = %id, error = %source, "executor stopped by cancellation");
                    return Err(cancelled(Stage::Executing(id), state));
                }
                Err(source) => {
                    return Err(RunError::new(
                        RunErrorKind::IntegrationFailure {
                            stage: Stage::Executing(id),
                            source,
                        },
                        state,
                    ));
                }
            };
            debug!(executor = %id, bytes = response.len(), "executor answered");
            state = state.executed(&id, response);
            on_turn(Turn::Executed {
                id: &id,
                response: state.last_content(),
                messages: state.messages.len(),
            });
        }
    }

    fn lookup(&self, id: &str) -> Option<&dyn Executor> {
        self.executors
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, executor)| executor.as_ref())
    }
}

/// A nested team that stopped on its own cancellation token.
fn nested_cancel(source: &anyhow::Error) -> bool {
    source
        .downcast_ref::<RunError>()
        .is_some_and(RunError::is_cancelled)
}

fn cancelled(stage: Stage, state: ConversationState) -> RunError {
    info!(%stage, "run cancelled");
    RunError::new(RunErrorKind::Cancelled { stage }, state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Message;
    use crate::test_support::{FixedExecutor, ScriptedOracle, cont, term};
    use std::rc::Rc;

    fn descriptor(id: &str) -> ExecutorDescriptor {
        ExecutorDescriptor::new(id, format!("{id} worker"))
    }

    #[test]
    fn continue_continue_terminate_runs_two_executors() {
        let oracle = Rc::new(ScriptedOracle::new(vec![cont("a"), cont("b"), term()]));
        let a = Rc::new(FixedExecutor::new("from a"));
        let b = Rc::new(FixedExecutor::new("from b"));
        let graph = OrchestrationGraph::builder()
            .executor(descriptor("a"), a.clone())
            .executor(descriptor("b"), b.clone())
            .build(oracle.clone())
            .expect("graph");

        let state = graph.run("task").expect("run");

        assert_eq!(oracle.calls(), 3);
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
        assert_eq!(
            state.messages,
            vec![
                Message::task("task"),
                Message::from_executor("a", "from a"),
                Message::from_executor("b", "from b"),
            ]
        );
        assert_eq!(state.next, Some(Route::Terminate));
    }

    #[test]
    fn executor_receives_last_message_and_full_context() {
        let oracle = ScriptedOracle::new(vec![cont("a"), cont("b"), term()]);
        let b = Rc::new(FixedExecutor::new("done"));
        let graph = OrchestrationGraph::builder()
            .executor(descriptor("a"), FixedExecutor::new("intermediate"))
            .executor(descriptor("b"), b.clone())
            .build(oracle)
            .expect("graph");

        graph.run("task").expect("run");

        let (task, context_len) = b.last_call().expect("b called");
        assert_eq!(task, "intermediate");
        assert_eq!(context_len, 2);
    }

    #[test]
    fn unknown_target_keeps_transcript_before_decision() {
        let oracle = ScriptedOracle::new(vec![cont("a"), cont("ghost")]);
        let graph = OrchestrationGraph::builder()
            .executor(descriptor("a"), FixedExecutor::new("ok"))
            .build(oracle)
            .expect("graph");

        let err = graph.run("task").unwrap_err();

        assert!(err.is_protocol_violation());
        assert_eq!(err.state.messages.len(), 2);
        assert_eq!(err.state.next, None);
    }

    #[test]
    fn iteration_limit_stops_runaway_supervisor() {
        let oracle = ScriptedOracle::new(vec![cont("a"); 10]);
        let graph = OrchestrationGraph::builder()
            .executor(descriptor("a"), FixedExecutor::new("again"))
            .max_iterations(3)
            .build(oracle)
            .expect("graph");

        let err = graph.run("task").unwrap_err();

        assert!(matches!(
            err.kind,
            RunErrorKind::IterationLimitExceeded { max_iterations: 3 }
        ));
        assert_eq!(err.state.messages.len(), 4);
    }

    #[test]
    fn cancelled_before_first_decision() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let oracle = Rc::new(ScriptedOracle::new(vec![term()]));
        let graph = OrchestrationGraph::builder()
            .cancellation(cancel)
            .build(oracle.clone())
            .expect("graph");

        let err = graph.run("task").unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(oracle.calls(), 0);
        assert_eq!(err.state.messages.len(), 1);
    }

    #[test]
    fn cancellation_observed_at_executor_entry() {
        let cancel = CancellationToken::new();
        let oracle = ScriptedOracle::new(vec![cont("a"), term()]);
        let a = Rc::new(FixedExecutor::new("never"));
        let graph = OrchestrationGraph::builder()
            .executor(descriptor("a"), a.clone())
            .cancellation(cancel.clone())
            .build(oracle)
            .expect("graph");

        let err = graph
            .run_observed("task", |turn| {
                if matches!(turn, Turn::Decided { .. }) {
                    cancel.cancel();
                }
            })
            .unwrap_err();

        assert!(matches!(
            err.kind,
            RunErrorKind::Cancelled {
                stage: Stage::Executing(ref id)
            } if id == "a"
        ));
        assert_eq!(a.calls(), 0);
        assert_eq!(err.state.next, Some(Route::Continue("a".to_string())));
    }

    #[test]
    fn rejects_duplicate_executor_ids() {
        let result = OrchestrationGraph::builder()
            .executor(descriptor("a"), FixedExecutor::new("1"))
            .executor(descriptor("a"), FixedExecutor::new("2"))
            .build(ScriptedOracle::new(Vec::new()));
        let err = result.err().expect("duplicate ids must fail");
        assert!(err.to_string().contains("duplicate executor id 'a'"));
    }

    #[test]
    fn observer_sees_decisions_and_executions_in_order() {
        let oracle = ScriptedOracle::new(vec![cont("a"), term()]);
        let graph = OrchestrationGraph::builder()
            .executor(descriptor("a"), FixedExecutor::new("ok"))
            .build(oracle)
            .expect("graph");

        let mut events = Vec::new();
        graph
            .run_observed("task", |turn| {
                events.push(match turn {
                    Turn::Decided {
                        iteration,
                        decision,
                        ..
                    } => {
                        format!("decided {iteration} {}", decision.route)
                    }
                    Turn::Executed { id, response, .. } => format!("executed {id} {response}"),
                });
            })
            .expect("run");

        assert_eq!(
            events,
            vec!["decided 0 a", "executed a ok", "decided 1 terminate"]
        );
    }
}
