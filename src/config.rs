use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::layout::LayoutParams;

pub const DEFAULT_POLL_SECS: u64 = 15;
pub const MIN_POLL_SECS: u64 = 10;
pub const MAX_POLL_SECS: u64 = 30;

pub fn load_layout_params(path: Option<&Path>) -> Result<LayoutParams> {
    let Some(path) = path else {
        return Ok(LayoutParams::default());
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read layout config {}", path.display()))?;
    let params: LayoutParams = serde_json::from_str(&raw)
        .with_context(|| format!("invalid layout config {}", path.display()))?;
    info!(path = %path.display(), iterations = params.iterations, "loaded layout config");
    Ok(params)
}

pub fn poll_interval(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(MIN_POLL_SECS, MAX_POLL_SECS))
}
