//! Closed registry of executor descriptors.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::core::types::ExecutorDescriptor;

static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("id pattern should be valid"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("duplicate executor id '{0}'")]
    DuplicateId(String),

    #[error("invalid executor id '{0}' (expected letters, digits, '_' or '-', starting with a letter)")]
    InvalidId(String),

    #[error("executor '{0}' has an empty description")]
    EmptyDescription(String),
}

/// Executor descriptors in registration order. Ids are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    descriptors: Vec<ExecutorDescriptor>,
}

impl Roster {
    pub fn new(descriptors: Vec<ExecutorDescriptor>) -> Result<Self, RosterError> {
        let mut seen = HashSet::new();
        for descriptor in &descriptors {
            if !ID_RE.is_match(&descriptor.id) {
                return Err(RosterError::InvalidId(descriptor.id.clone()));
            }
            if descriptor.description.trim().is_empty() {
                return Err(RosterError::EmptyDescription(descriptor.id.clone()));
            }
            if !seen.insert(descriptor.id.as_str()) {
                return Err(RosterError::DuplicateId(descriptor.id.clone()));
            }
        }
        Ok(Self { descriptors })
    }

    /// Canonical id equal to `target`, if registered. Matching is exact.
    pub fn resolve(&self, target: &str) -> Option<&str> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.id == target)
            .map(|descriptor| descriptor.id.as_str())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.descriptors
            .iter()
            .map(|descriptor| descriptor.id.as_str())
    }

    pub fn descriptors(&self) -> &[ExecutorDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Fixed-format menu, one `- <id>: <description>` line per executor.
    ///
    /// Depends only on the registered descriptors.
    pub fn render(&self) -> String {
        if self.descriptors.is_empty() {
            return "(no executors registered)".to_string();
        }
        self.descriptors
            .iter()
            .map(|descriptor| format!("- {}: {}", descriptor.id, descriptor.description.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
