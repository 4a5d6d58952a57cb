//! Loop settings and team files (`team.toml`).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::tools::BuiltinTool;

/// Default supervisor decision budget per run.
pub const DEFAULT_MAX_ITERATIONS: u32 = 25;

/// Team file written by `teamloop init`.
pub const DEFAULT_TEAM_TOML: &str = include_str!("../../teams/default.toml");

/// Settings for one orchestration graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Maximum number of supervisor decisions before the run fails.
    pub max_iterations: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl GraphConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be > 0"));
        }
        Ok(())
    }
}

/// A team: loop settings, a routing plan and its executors.
///
/// Nested teams reuse the same shape, so a file describes a whole
/// team-of-teams hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamSpec {
    #[serde(flatten)]
    pub graph: GraphConfig,

    /// Executor ids the plan router delegates to, in order, before terminating.
    pub route: Vec<String>,

    pub executors: Vec<ExecutorSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutorSpec {
    /// Leaf executor wrapping a built-in tool.
    Tool {
        id: String,
        description: String,
        tool: BuiltinTool,
    },
    /// Nested team acting as one executor.
    Team {
        id: String,
        /// Defaults to a summary of the nested roster.
        #[serde(default)]
        description: Option<String>,
        team: TeamSpec,
    },
}

impl ExecutorSpec {
    pub fn id(&self) -> &str {
        match self {
            ExecutorSpec::Tool { id, .. } | ExecutorSpec::Team { id, .. } => id,
        }
    }
}

impl TeamSpec {
    /// Validate loop settings at every nesting level.
    ///
    /// Roster rules (unique ids, id format) are checked when the graph is built.
    pub fn validate(&self) -> Result<()> {
        self.graph.validate()?;
        for executor in &self.executors {
            if let ExecutorSpec::Team { id, team, .. } = executor {
                team.validate().with_context(|| format!("nested team '{id}'"))?;
            }
        }
        Ok(())
    }
}

/// Load and validate a team file.
pub fn load_team(path: &Path) -> Result<TeamSpec> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_team(&contents).with_context(|| format!("parse {}", path.display()))
}

pub fn parse_team(contents: &str) -> Result<TeamSpec> {
    let team: TeamSpec = toml::from_str(contents).context("parse team toml")?;
    team.validate()?;
    Ok(team)
}

/// Write the default team file unless one exists (or `force` is set).
///
/// Returns whether the file was written.
pub fn write_default_team(path: &Path, force: bool) -> Result<bool> {
    if !force && path.exists() {
        return Ok(false);
    }
    write_atomic(path, DEFAULT_TEAM_TOML)?;
    Ok(true)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp team file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace team file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_team_parses() {
        let team = parse_team(DEFAULT_TEAM_TOML).expect("parse");
        assert!(!team.executors.is_empty());
        assert!(
            team.executors
                .iter()
                .any(|executor| matches!(executor, ExecutorSpec::Team { .. }))
        );
    }

    #[test]
    fn missing_fields_default() {
        let team = parse_team("").expect("parse");
        assert_eq!(team.graph, GraphConfig::default());
        assert!(team.route.is_empty());
        assert!(team.executors.is_empty());
    }

    #[test]
    fn nested_zero_iterations_rejected() {
        let raw = r#"
[[executors]]
kind = "team"
id = "inner"
team = { max_iterations = 0 }
"#;
        let err = parse_team(raw).unwrap_err();
        assert!(format!("{err:#}").contains("max_iterations must be > 0"));
    }

    #[test]
    fn init_does_not_overwrite_without_force() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("team.toml");
        fs::write(&path, "route = []\n").expect("seed");

        assert!(!write_default_team(&path, false).expect("write"));
        assert_eq!(fs::read_to_string(&path).expect("read"), "route = []\n");

        assert!(write_default_team(&path, true).expect("write"));
        let loaded = load_team(&path).expect("load");
        assert_eq!(loaded, parse_team(DEFAULT_TEAM_TOML).expect("parse"));
    }
}
