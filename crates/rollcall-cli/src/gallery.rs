//! JSON gallery of enrolled records.
//!
//! The file format is a plain JSON array of `{name, rollNo, embedding}`
//! objects — the embedding as a bare float array — so galleries written by
//! other frontends interoperate.

use anyhow::{Context, Result};
use rollcall_core::StudentRecord;
use std::path::Path;

/// Load the gallery. A missing file is an empty gallery, not an error.
pub fn load(path: &Path) -> Result<Vec<StudentRecord>> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "gallery file absent; starting empty");
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading gallery {}", path.display()))?;
    let records: Vec<StudentRecord> =
        serde_json::from_str(&raw).with_context(|| format!("parsing gallery {}", path.display()))?;
    tracing::info!(path = %path.display(), records = records.len(), "gallery loaded");
    Ok(records)
}

/// Write the gallery back, pretty-printed.
pub fn save(path: &Path, records: &[StudentRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json).with_context(|| format!("writing gallery {}", path.display()))?;
    tracing::info!(path = %path.display(), records = records.len(), "gallery saved");
    Ok(())
}
