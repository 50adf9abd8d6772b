//! Instruction scripts: what the runner enqueues.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::json;
use shuttle_core::Priority;

/// One script line. `parent` is the index of an earlier entry.
#[derive(Debug, Deserialize)]
pub struct ScriptEntry {
    pub payload: serde_json::Value,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub parent: Option<usize>,
}

pub fn load(path: &Path) -> Result<Vec<ScriptEntry>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script '{}'", path.display()))?;
    let entries: Vec<ScriptEntry> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse script '{}'", path.display()))?;
    check(&entries)?;
    Ok(entries)
}

fn check(entries: &[ScriptEntry]) -> Result<()> {
    for (index, entry) in entries.iter().enumerate() {
        if let Some(parent) = entry.parent
            && parent >= index
        {
            bail!("entry {index}: parent {parent} must refer to an earlier entry");
        }
    }
    Ok(())
}

/// A boot message, a three-step chain ending in a flaky step, and a
/// low-priority note.
pub fn demo() -> Vec<ScriptEntry> {
    vec![
        ScriptEntry {
            payload: json!({ "type": "say", "text": "boot" }),
            priority: Priority::Critical,
            parent: None,
        },
        ScriptEntry {
            payload: json!({ "type": "say", "text": "calibrate" }),
            priority: Priority::Normal,
            parent: None,
        },
        ScriptEntry {
            payload: json!({ "type": "sleep", "ms": 200 }),
            priority: Priority::Normal,
            parent: Some(1),
        },
        ScriptEntry {
            payload: json!({ "type": "flaky", "text": "align", "failures": 1 }),
            priority: Priority::Low,
            parent: Some(2),
        },
        ScriptEntry {
            payload: json!({ "type": "say", "text": "done" }),
            priority: Priority::Low,
            parent: None,
        },
    ]
}
