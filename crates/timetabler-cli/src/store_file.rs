//! JSON store file
//!
//! The whole `InMemoryStore` is read before a command runs and written back
//! after it succeeds. Commands that only read never write.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use timetabler_core::InMemoryStore;

pub fn load(path: &Path) -> Result<InMemoryStore> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read store file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid store file {}", path.display()))
}

pub fn save(path: &Path, store: &InMemoryStore) -> Result<()> {
    let mut json = serde_json::to_string_pretty(store).context("Failed to serialize store")?;
    json.push('\n');
    fs::write(path, json).with_context(|| format!("Failed to write store file {}", path.display()))
}
