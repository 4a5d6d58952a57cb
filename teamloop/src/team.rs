//! Assemble graphs from team files.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::agents::executor::ToolExecutor;
use crate::agents::hierarchical::HierarchicalExecutor;
use crate::core::types::ExecutorDescriptor;
use crate::graph::{GraphBuilder, OrchestrationGraph};
use crate::io::config::{ExecutorSpec, TeamSpec};
use crate::io::oracle::PlanOracle;

/// Build the graph for `spec`, recursing into nested teams.
///
/// Every nested graph gets a child of `cancel`, so cancelling the top-level
/// token stops the whole hierarchy.
pub fn build_team(spec: &TeamSpec, cancel: &CancellationToken) -> Result<OrchestrationGraph> {
    let mut builder = GraphBuilder::new()
        .config(spec.graph)
        .cancellation(cancel.clone());

    for executor in &spec.executors {
        builder = match executor {
            ExecutorSpec::Tool {
                id,
                description,
                tool,
            } => builder.tool(ToolExecutor::new(
                ExecutorDescriptor::new(id.as_str(), description.as_str()),
                *tool,
            )),
            ExecutorSpec::Team {
                id,
                description,
                team,
            } => {
                let graph = build_team(team, &cancel.child_token())
                    .with_context(|| format!("build nested team '{id}'"))?;
                let nested = match description {
                    Some(description) => HierarchicalExecutor::new(
                        ExecutorDescriptor::new(id.as_str(), description.as_str()),
                        graph,
                    ),
                    None => HierarchicalExecutor::with_default_description(id.as_str(), graph),
                };
                builder.team(nested)
            }
        };
    }

    debug!(executors = spec.executors.len(), plan = ?spec.route, "team assembled");
    builder.build(PlanOracle::new(spec.route.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::{DEFAULT_TEAM_TOML, parse_team};

    #[test]
    fn default_team_runs_to_completion() {
        let spec = parse_team(DEFAULT_TEAM_TOML).expect("parse");
        let graph = build_team(&spec, &CancellationToken::new()).expect("build");

        let state = graph.run("Research compound interest").expect("run");

        let ids: Vec<&str> = state.results.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["research_team", "content_team"]);
        let research = state.results.get("research_team").expect("research team");
        assert!(research.starts_with("research: Research findings"));
        assert!(research.contains("\nanalysis: Analysis of"));
        assert_eq!(state.messages.len(), 3);
    }

    #[test]
    fn nested_team_without_description_describes_members() {
        let spec = parse_team(
            r#"
route = ["calc"]

[[executors]]
kind = "team"
id = "calc"

[executors.team]
route = ["calculation"]

[[executors.team.executors]]
kind = "tool"
id = "calculation"
description = "Evaluates arithmetic"
tool = "calculation"
"#,
        )
        .expect("parse");
        let graph = build_team(&spec, &CancellationToken::new()).expect("build");

        assert_eq!(
            graph.roster().render(),
            "- calc: Coordinates a team that can: Evaluates arithmetic"
        );
        let state = graph.run("6 * 7").expect("run");
        assert_eq!(
            state.results.get("calc"),
            Some("calculation: Calculation result: 42")
        );
    }

    #[test]
    fn plan_with_unknown_id_fails_at_run_time() {
        let spec = parse_team(
            r#"
route = ["missing"]

[[executors]]
kind = "tool"
id = "writing"
description = "Writes"
tool = "writing"
"#,
        )
        .expect("parse");
        let graph = build_team(&spec, &CancellationToken::new()).expect("build");

        let err = graph.run("task").unwrap_err();
        assert!(err.is_protocol_violation());
        assert_eq!(err.state.messages.len(), 1);
    }

    #[test]
    fn duplicate_ids_in_nested_team_fail_to_build() {
        let spec = parse_team(
            r#"
[[executors]]
kind = "team"
id = "inner"

[[executors.team.executors]]
kind = "tool"
id = "dup"
description = "one"
tool = "writing"

[[executors.team.executors]]
kind = "tool"
id = "dup"
description = "two"
tool = "writing"
"#,
        )
        .expect("parse");

        let err = build_team(&spec, &CancellationToken::new()).err().expect("build fails");
        assert!(format!("{err:#}").contains("duplicate executor id 'dup'"));
    }
}
