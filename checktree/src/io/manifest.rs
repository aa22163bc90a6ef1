//! Work tree manifests: JSON or TOML files declaring groups and commands.
//!
//! ```json
//! {
//!   "build": ["cargo", "build"],
//!   "lint": { "fmt": ["cargo", "fmt", "--check"] }
//! }
//! ```
//!
//! Objects become groups and non-empty string arrays become command units.
//! Any other value is passed through unchanged, so the scheduler reports it
//! (invalid value, or a malformed root when the file is not an object).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::debug;

use crate::io::process::command_unit;
use crate::work::{WorkItem, WorkTree};

/// Settings shared by every command unit built from one manifest.
#[derive(Debug, Clone)]
pub struct ManifestOptions {
    /// Working directory for commands.
    pub cwd: PathBuf,
    pub output_limit_bytes: usize,
}

/// Read and convert a manifest. Format is chosen by extension.
pub fn load_manifest(path: &Path, options: &ManifestOptions) -> Result<WorkItem> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read manifest {}", path.display()))?;
    let value = parse_manifest(path, &contents)?;
    let item = to_work_item(value, options);
    debug!(path = %path.display(), kind = item.kind(), "manifest loaded");
    Ok(item)
}

fn parse_manifest(path: &Path, contents: &str) -> Result<Value> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(contents)
            .with_context(|| format!("parse manifest {}", path.display())),
        Some("toml") => {
            let table: toml::Table = toml::from_str(contents)
                .with_context(|| format!("parse manifest {}", path.display()))?;
            serde_json::to_value(table)
                .with_context(|| format!("convert manifest {}", path.display()))
        }
        _ => bail!(
            "unsupported manifest extension for {} (expected .json or .toml)",
            path.display()
        ),
    }
}

/// Convert a parsed manifest value into a work item.
pub fn to_work_item(value: Value, options: &ManifestOptions) -> WorkItem {
    match value {
        Value::Object(map) => {
            let mut tree = WorkTree::new();
            for (key, child) in map {
                tree.insert(key, to_work_item(child, options));
            }
            WorkItem::Group(tree)
        }
        Value::Array(items) => match command_argv(&items) {
            Some(argv) => WorkItem::Unit(command_unit(
                argv,
                options.cwd.clone(),
                options.output_limit_bytes,
            )),
            None => WorkItem::Value(Value::Array(items)),
        },
        other => WorkItem::Value(other),
    }
}

fn command_argv(items: &[Value]) -> Option<Vec<String>> {
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}
