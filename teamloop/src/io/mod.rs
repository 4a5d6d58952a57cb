//! Collaborator boundaries: routing oracles, prompts and team files.

pub mod config;
pub mod oracle;
pub mod prompt;
