//! Quest file loading.

use anyhow::{Context as _, Result};
use std::path::Path;

use super::model::Quest;

/// Load and parse a quest file.
///
/// Read failures and parse failures produce distinct errors so callers can
/// tell a missing file from a corrupt one.
pub async fn load(path: &Path) -> Result<Quest> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read quest file: {}", path.display()))?;
    let quest: Quest = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse quest file: {}", path.display()))?;
    Ok(quest)
}
