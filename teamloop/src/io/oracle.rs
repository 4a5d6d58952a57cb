//! Routing oracle abstraction.
//!
//! The [`RoutingOracle`] trait decouples the supervisor from whatever backend
//! actually makes the routing call (a model integration, a scripted plan).
//! Replies travel as JSON documents constrained by
//! `schemas/route_decision.schema.json`; this module validates and parses them.

use std::rc::Rc;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use jsonschema::{Draft, Validator};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::error::ProtocolViolation;

pub const ROUTE_DECISION_SCHEMA: &str = include_str!("../../schemas/route_decision.schema.json");

static DECISION_VALIDATOR: LazyLock<Validator> = LazyLock::new(|| {
    let schema: Value =
        serde_json::from_str(ROUTE_DECISION_SCHEMA).expect("decision schema should be valid json");
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .expect("decision schema should compile")
});

/// Parameters for one routing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRequest {
    /// Fixed routing instructions with the roster embedded.
    pub instructions: String,
    /// Rendered roster menu.
    pub roster: String,
    /// Linear transcript of the conversation so far.
    pub transcript: String,
    /// Rendered per-decision turn (task plus transcript).
    pub prompt: String,
    /// Content of the first message of the run.
    pub task: String,
    /// 0-based index of this decision within the run.
    pub iteration: u32,
    /// JSON Schema the reply must satisfy.
    pub output_schema: &'static str,
}

/// Abstraction over routing decision backends.
pub trait RoutingOracle {
    /// Make one routing call and return the raw structured reply (JSON text).
    ///
    /// Errors mean the integration itself failed (transport, auth, timeout)
    /// and are never retried by the caller.
    fn route(&self, request: &RoutingRequest) -> Result<String>;
}

impl<O: RoutingOracle + ?Sized> RoutingOracle for Box<O> {
    fn route(&self, request: &RoutingRequest) -> Result<String> {
        (**self).route(request)
    }
}

impl<O: RoutingOracle + ?Sized> RoutingOracle for Rc<O> {
    fn route(&self, request: &RoutingRequest) -> Result<String> {
        (**self).route(request)
    }
}

/// Structured decision as it arrives on the wire, before roster validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteReply {
    #[serde(flatten)]
    pub action: ReplyAction,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReplyAction {
    Continue { target: String },
    Terminate,
}

/// Parse a raw reply.
///
/// Text that is not JSON at all is an integration failure (`Err` of the outer
/// result); JSON that is not a valid decision is a protocol violation.
#[instrument(skip_all, fields(bytes = raw.len()))]
pub fn parse_reply(raw: &str) -> Result<Result<RouteReply, ProtocolViolation>> {
    let value: Value = serde_json::from_str(raw.trim()).context("parse routing reply as json")?;

    let errors: Vec<String> = DECISION_VALIDATOR
        .iter_errors(&value)
        .map(|err| err.to_string())
        .collect();
    if !errors.is_empty() {
        debug!(?errors, "routing reply failed schema validation");
        return Ok(Err(ProtocolViolation::SchemaMismatch { errors }));
    }

    Ok(serde_json::from_value(value).map_err(|err| ProtocolViolation::Unparsable(err.to_string())))
}

/// JSON reply delegating to `target`.
pub fn continue_reply(target: &str, rationale: &str) -> String {
    json!({ "action": "continue", "target": target, "rationale": rationale }).to_string()
}

/// JSON reply ending the run.
pub fn terminate_reply(rationale: &str) -> String {
    json!({ "action": "terminate", "rationale": rationale }).to_string()
}

/// Oracle that follows a fixed routing plan.
///
/// Decision `i` continues to `plan[i]`; once the plan is exhausted it
/// terminates. The plan is not checked against any roster, so an unknown id
/// surfaces as a protocol violation in the supervisor.
#[derive(Debug, Clone, Default)]
pub struct PlanOracle {
    plan: Vec<String>,
}

impl PlanOracle {
    pub fn new(plan: Vec<String>) -> Self {
        Self { plan }
    }
}

impl RoutingOracle for PlanOracle {
    fn route(&self, request: &RoutingRequest) -> Result<String> {
        let step = usize::try_from(request.iteration).context("decision index overflow")?;
        Ok(match self.plan.get(step) {
            Some(target) => continue_reply(target, &format!("plan step {}", step + 1)),
            None => terminate_reply("plan complete"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(iteration: u32) -> RoutingRequest {
        RoutingRequest {
            instructions: String::new(),
            roster: String::new(),
            transcript: String::new(),
            prompt: String::new(),
            task: "task".to_string(),
            iteration,
            output_schema: ROUTE_DECISION_SCHEMA,
        }
    }

    #[test]
    fn parses_continue_and_terminate() {
        let reply = parse_reply(&continue_reply("math", "numbers"))
            .expect("json")
            .expect("decision");
        assert_eq!(
            reply.action,
            ReplyAction::Continue {
                target: "math".to_string()
            }
        );
        assert_eq!(reply.rationale, "numbers");

        let reply = parse_reply(&terminate_reply("done"))
            .expect("json")
            .expect("decision");
        assert_eq!(reply.action, ReplyAction::Terminate);
    }

    #[test]
    fn non_json_is_integration_failure() {
        let err = parse_reply("FINISH").unwrap_err();
        assert!(err.to_string().contains("parse routing reply"));
    }

    #[test]
    fn string_sentinels_are_protocol_violations() {
        let violation = parse_reply(r#"{"action":"FINISH","rationale":"done"}"#)
            .expect("json")
            .unwrap_err();
        assert!(matches!(violation, ProtocolViolation::SchemaMismatch { .. }));
    }

    #[test]
    fn continue_without_target_is_protocol_violation() {
        let violation = parse_reply(r#"{"action":"continue","rationale":"?"}"#)
            .expect("json")
            .unwrap_err();
        assert!(matches!(violation, ProtocolViolation::SchemaMismatch { .. }));
    }

    #[test]
    fn plan_oracle_follows_plan_then_terminates() {
        let oracle = PlanOracle::new(vec!["a".to_string(), "b".to_string()]);

        let first = parse_reply(&oracle.route(&request(0)).expect("route"))
            .expect("json")
            .expect("decision");
        assert_eq!(
            first.action,
            ReplyAction::Continue {
                target: "a".to_string()
            }
        );

        let third = parse_reply(&oracle.route(&request(2)).expect("route"))
            .expect("json")
            .expect("decision");
        assert_eq!(third.action, ReplyAction::Terminate);
    }
}
