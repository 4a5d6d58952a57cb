//! Test-only scripted collaborators for driving graphs deterministically.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use anyhow::{Result, anyhow};

use crate::agents::executor::Executor;
use crate::core::types::Message;
use crate::io::oracle::{RoutingOracle, RoutingRequest, continue_reply, terminate_reply};

/// Raw reply continuing to `id`.
pub fn cont(id: &str) -> String {
    continue_reply(id, &format!("route to {id}"))
}

/// Raw reply terminating the run.
pub fn term() -> String {
    terminate_reply("task complete")
}

/// Oracle that returns queued raw replies and records every request.
///
/// Running out of replies is an integration failure.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    replies: RefCell<VecDeque<String>>,
    requests: RefCell<Vec<RoutingRequest>>,
}

impl ScriptedOracle {
    pub fn new(replies: Vec<String>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn requests(&self) -> Vec<RoutingRequest> {
        self.requests.borrow().clone()
    }
}

impl RoutingOracle for ScriptedOracle {
    fn route(&self, request: &RoutingRequest) -> Result<String> {
        self.requests.borrow_mut().push(request.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted oracle exhausted"))
    }
}

/// Executor answering every task with the same response.
#[derive(Debug)]
pub struct FixedExecutor {
    response: String,
    calls: Cell<usize>,
    last_call: RefCell<Option<(String, usize)>>,
}

impl FixedExecutor {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            calls: Cell::new(0),
            last_call: RefCell::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Task and context length of the most recent call.
    pub fn last_call(&self) -> Option<(String, usize)> {
        self.last_call.borrow().clone()
    }
}

impl Executor for FixedExecutor {
    fn invoke(&self, task: &str, context: &[Message]) -> Result<String> {
        self.calls.set(self.calls.get() + 1);
        *self.last_call.borrow_mut() = Some((task.to_string(), context.len()));
        Ok(self.response.clone())
    }
}

/// Executor returning queued responses, one per call.
#[derive(Debug)]
pub struct SequenceExecutor {
    responses: RefCell<VecDeque<String>>,
}

impl SequenceExecutor {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: RefCell::new(responses.iter().map(|r| r.to_string()).collect()),
        }
    }
}

impl Executor for SequenceExecutor {
    fn invoke(&self, _task: &str, _context: &[Message]) -> Result<String> {
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("sequence executor exhausted"))
    }
}

/// Executor whose integration always fails.
#[derive(Debug)]
pub struct FailingExecutor {
    reason: String,
}

impl FailingExecutor {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

impl Executor for FailingExecutor {
    fn invoke(&self, _task: &str, _context: &[Message]) -> Result<String> {
        Err(anyhow!("{}", self.reason))
    }
}
