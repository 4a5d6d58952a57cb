//! Executor abstraction and the tool-backed executor.
//!
//! The [`Executor`] trait is the single capability the graph loop drives.
//! Plain tool wrappers and whole nested teams implement it the same way.

use std::rc::Rc;

use anyhow::Result;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::core::types::{ExecutorDescriptor, Message};

/// A unit of work invocable with a task, returning text.
pub trait Executor {
    /// Run one turn. `context` is the full message history at call time.
    ///
    /// Errors are integration failures and end the run.
    fn invoke(&self, task: &str, context: &[Message]) -> Result<String>;
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn invoke(&self, task: &str, context: &[Message]) -> Result<String> {
        (**self).invoke(task, context)
    }
}

impl<E: Executor + ?Sized> Executor for Rc<E> {
    fn invoke(&self, task: &str, context: &[Message]) -> Result<String> {
        (**self).invoke(task, context)
    }
}

/// Failure of a tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool itself raised. Recovered as response text.
    #[error("{0}")]
    Raised(String),

    /// The integration around the tool failed. Propagated.
    #[error(transparent)]
    Integration(#[from] anyhow::Error),
}

/// A function of one text argument.
pub trait Tool {
    fn call(&self, input: &str) -> Result<String, ToolError>;
}

/// Adapter turning a closure into a [`Tool`].
pub struct FnTool<F>(pub F);

impl<F> Tool for FnTool<F>
where
    F: Fn(&str) -> Result<String, ToolError>,
{
    fn call(&self, input: &str) -> Result<String, ToolError> {
        (self.0)(input)
    }
}

/// Executor that hands the task to one tool.
pub struct ToolExecutor {
    descriptor: ExecutorDescriptor,
    tool: Box<dyn Tool>,
}

impl ToolExecutor {
    pub fn new(descriptor: ExecutorDescriptor, tool: impl Tool + 'static) -> Self {
        Self {
            descriptor,
            tool: Box::new(tool),
        }
    }

    pub fn descriptor(&self) -> &ExecutorDescriptor {
        &self.descriptor
    }
}

impl Executor for ToolExecutor {
    #[instrument(skip_all, fields(executor = %self.descriptor.id))]
    fn invoke(&self, task: &str, _context: &[Message]) -> Result<String> {
        match self.tool.call(task) {
            Ok(response) => {
                debug!(bytes = response.len(), "tool returned");
                Ok(response)
            }
            Err(ToolError::Raised(reason)) => {
                warn!(%reason, "tool raised; returning failure text");
                Ok(format!("Error in {}: {reason}", self.descriptor.id))
            }
            Err(ToolError::Integration(err)) => {
                Err(err.context(format!("tool integration for '{}'", self.descriptor.id)))
            }
        }
    }
}
