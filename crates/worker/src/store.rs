//! The record store as a JSON snapshot on disk.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use charops_infra::record_source::InMemoryRecordSource;

pub async fn load(path: &Path) -> Result<InMemoryRecordSource> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read store snapshot {}", path.display()))?;
    let snapshot: serde_json::Value = serde_json::from_slice(&raw)
        .with_context(|| format!("store snapshot {} is not valid JSON", path.display()))?;
    let source = InMemoryRecordSource::from_snapshot(snapshot)?;
    info!(path = %path.display(), "store snapshot loaded");
    Ok(source)
}

pub async fn save(source: &InMemoryRecordSource, path: &Path) -> Result<()> {
    let snapshot = source.to_snapshot()?;
    let raw = serde_json::to_vec_pretty(&snapshot)?;
    tokio::fs::write(path, raw)
        .await
        .with_context(|| format!("failed to write store snapshot {}", path.display()))?;
    info!(path = %path.display(), "store snapshot saved");
    Ok(())
}
