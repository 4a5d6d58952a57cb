//! Shared deterministic types threaded through a run.
//!
//! These types define stable contracts between the supervisor, the executors
//! and the graph loop. They carry no I/O and serialize deterministically.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// One immutable unit of the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub content: String,
    /// Id of the executor that produced this message. `None` for the seed task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl Message {
    /// Untagged message holding a task (the seed of a run).
    pub fn task(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            origin: None,
        }
    }

    /// Message produced by the executor `origin`.
    pub fn from_executor(origin: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            origin: Some(origin.into()),
        }
    }
}

/// Stable id plus capability description used to render the routing menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorDescriptor {
    pub id: String,
    pub description: String,
}

impl ExecutorDescriptor {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
        }
    }
}

/// Where the loop goes after a supervisor turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Continue(String),
    Terminate,
}

impl Route {
    pub fn as_str(&self) -> &str {
        match self {
            Route::Continue(id) => id,
            Route::Terminate => "terminate",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated supervisor decision.
///
/// `rationale` is kept for logs and observers only; control flow looks at
/// `route` alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub route: Route,
    pub rationale: String,
}

/// Executor id to most recent response, in first-invocation order.
///
/// Re-inserting an id overwrites its value in place; the id keeps its
/// original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultMap {
    entries: Vec<(String, String)>,
}

impl ResultMap {
    pub fn insert(&mut self, id: &str, response: String) {
        match self.entries.iter_mut().find(|(key, _)| key == id) {
            Some((_, value)) => *value = response,
            None => self.entries.push((id.to_string(), response)),
        }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ResultMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Ordered transcript plus transient routing and result side-state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    /// Pending routing target. Set by the supervisor turn, cleared by the
    /// executor turn.
    pub next: Option<Route>,
    pub results: ResultMap,
}

impl ConversationState {
    /// Fresh state holding exactly one task message.
    pub fn seeded(task: impl Into<String>) -> Self {
        Self::with_history(Vec::new(), task)
    }

    /// Fresh state holding `history` followed by one task message.
    pub fn with_history(mut history: Vec<Message>, task: impl Into<String>) -> Self {
        history.push(Message::task(task));
        Self {
            messages: history,
            next: None,
            results: ResultMap::default(),
        }
    }

    /// Content of the last message, or the empty string for an empty log.
    pub fn last_content(&self) -> &str {
        self.messages
            .last()
            .map(|message| message.content.as_str())
            .unwrap_or("")
    }

    /// Supervisor transition: record the routing target, nothing else.
    pub fn routed(mut self, route: Route) -> Self {
        self.next = Some(route);
        self
    }

    /// Executor transition: append the tagged response, overwrite the result
    /// entry for `id`, clear `next`.
    pub fn executed(mut self, id: &str, response: String) -> Self {
        self.messages.push(Message::from_executor(id, response.clone()));
        self.results.insert(id, response);
        self.next = None;
        self
    }

    /// Externally observable shape of a run.
    pub fn into_output(self) -> RunOutput {
        RunOutput {
            messages: self.messages,
            next: self.next.map(|route| route.to_string()).unwrap_or_default(),
            results: self.results,
        }
    }
}

/// Serializable result of `run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutput {
    pub messages: Vec<Message>,
    pub next: String,
    pub results: ResultMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_map_overwrites_in_place() {
        let mut results = ResultMap::default();
        results.insert("a", "one".to_string());
        results.insert("b", "two".to_string());
        results.insert("a", "three".to_string());

        let entries: Vec<_> = results.iter().collect();
        assert_eq!(entries, vec![("a", "three"), ("b", "two")]);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn executed_appends_and_clears_next() {
        let state = ConversationState::seeded("task")
            .routed(Route::Continue("math".to_string()))
            .executed("math", "4".to_string());

        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1], Message::from_executor("math", "4"));
        assert_eq!(state.next, None);
        assert_eq!(state.results.get("math"), Some("4"));
    }

    #[test]
    fn routed_leaves_messages_and_results_untouched() {
        let before = ConversationState::seeded("task").executed("a", "x".to_string());
        let after = before.clone().routed(Route::Terminate);

        assert_eq!(after.messages, before.messages);
        assert_eq!(after.results, before.results);
        assert_eq!(after.next, Some(Route::Terminate));
    }

    #[test]
    fn output_renders_next_as_text() {
        let output = ConversationState::seeded("task")
            .routed(Route::Terminate)
            .into_output();
        assert_eq!(output.next, "terminate");

        let json = serde_json::to_value(&output).expect("serialize");
        assert_eq!(json["messages"][0]["content"], "task");
        assert!(json["messages"][0].get("origin").is_none());
        assert!(json["results"].as_object().expect("results object").is_empty());
    }
}
