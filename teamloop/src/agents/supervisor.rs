//! Supervisor: one routing decision per call.

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::core::roster::Roster;
use crate::core::transcript::render_transcript;
use crate::core::types::{ConversationState, Route, RouteDecision};
use crate::error::ProtocolViolation;
use crate::io::oracle::{
    ROUTE_DECISION_SCHEMA, ReplyAction, RoutingOracle, RoutingRequest, parse_reply,
};
use crate::io::prompt::{render_decision_turn, render_instructions};

#[derive(Debug, Error)]
pub enum DecideError {
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    #[error(transparent)]
    Integration(#[from] anyhow::Error),
}

/// Owns the routing oracle and the roster it routes over.
pub struct Supervisor {
    oracle: Box<dyn RoutingOracle>,
    roster: Roster,
    roster_text: String,
    instructions: String,
}

impl Supervisor {
    pub fn new(oracle: impl RoutingOracle + 'static, roster: Roster) -> Result<Self> {
        let roster_text = roster.render();
        let instructions =
            render_instructions(&roster_text).context("render supervisor instructions")?;
        Ok(Self {
            oracle: Box::new(oracle),
            roster,
            roster_text,
            instructions,
        })
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Build the routing request for `state`.
    pub fn request(&self, state: &ConversationState, iteration: u32) -> Result<RoutingRequest> {
        let transcript = render_transcript(&state.messages);
        let task = state
            .messages
            .first()
            .map(|message| message.content.clone())
            .unwrap_or_default();
        let prompt = render_decision_turn(&task, &transcript).context("render decision turn")?;
        Ok(RoutingRequest {
            instructions: self.instructions.clone(),
            roster: self.roster_text.clone(),
            transcript,
            prompt,
            task,
            iteration,
            output_schema: ROUTE_DECISION_SCHEMA,
        })
    }

    /// Issue exactly one routing call and validate the reply against the roster.
    #[instrument(skip_all, fields(iteration = iteration, messages = state.messages.len()))]
    pub fn decide(
        &self,
        state: &ConversationState,
        iteration: u32,
    ) -> Result<RouteDecision, DecideError> {
        let request = self.request(state, iteration)?;
        let raw = self.oracle.route(&request).context("routing call")?;
        let reply = parse_reply(&raw)??;

        let route = match reply.action {
            ReplyAction::Terminate => Route::Terminate,
            ReplyAction::Continue { target } => match self.roster.resolve(&target) {
                Some(id) => Route::Continue(id.to_string()),
                None => {
                    warn!(%target, "routing reply names an unregistered executor");
                    return Err(ProtocolViolation::UnknownTarget {
                        target,
                        registered: self.roster.ids().map(str::to_string).collect(),
                    }
                    .into());
                }
            },
        };

        info!(next = %route, rationale = %reply.rationale, "supervisor decision");
        Ok(RouteDecision {
            route,
            rationale: reply.rationale,
        })
    }
}
