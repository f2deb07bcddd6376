//! CLI configuration file
//!
//! ```toml
//! [solver]
//! allocator_step_budget = 500000
//! rearrangement_step_budget = 50000
//! shuffle_seed = 7
//! ```
//!
//! Every key is optional; missing keys keep the solver defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use timetabler_solver::SolverOptions;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub solver: SolverOptions,
}

impl Config {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid configuration")
    }

    /// Load the file when given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("In config file {}", path.display()))
    }
}
