//! Supervisor prompt rendering.

use std::sync::LazyLock;

use anyhow::Result;
use minijinja::{Environment, context};

const SUPERVISOR_TEMPLATE: &str = include_str!("prompts/supervisor.md");
const DECISION_TEMPLATE: &str = include_str!("prompts/decision.md");

static ENGINE: LazyLock<PromptEngine> = LazyLock::new(PromptEngine::new);

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("supervisor", SUPERVISOR_TEMPLATE)
            .expect("supervisor template should be valid");
        env.add_template("decision", DECISION_TEMPLATE)
            .expect("decision template should be valid");
        Self { env }
    }
}

/// Fixed routing instructions with the roster menu embedded.
pub fn render_instructions(roster: &str) -> Result<String> {
    let template = ENGINE.env.get_template("supervisor")?;
    let rendered = template.render(context! { roster => roster.trim() })?;
    Ok(rendered)
}

/// Per-decision user turn: the seed task and the transcript so far.
pub fn render_decision_turn(task: &str, transcript: &str) -> Result<String> {
    let template = ENGINE.env.get_template("decision")?;
    let rendered = template.render(context! {
        task => task.trim(),
        transcript => (!transcript.trim().is_empty()).then(|| transcript.trim()),
    })?;
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_embed_roster() {
        let rendered = render_instructions("- math: Performs calculations").expect("render");
        assert!(rendered.contains("- math: Performs calculations"));
        assert!(rendered.contains("terminate"));
    }

    #[test]
    fn decision_turn_marks_empty_history() {
        let rendered = render_decision_turn("task", "  ").expect("render");
        assert!(rendered.starts_with("Task: task"));
        assert!(rendered.contains("(empty)"));
    }

    #[test]
    fn decision_turn_includes_transcript() {
        let rendered = render_decision_turn("task", "task\nmath result: 4").expect("render");
        assert!(rendered.contains("math result: 4"));
        assert!(!rendered.contains("(empty)"));
    }
}
