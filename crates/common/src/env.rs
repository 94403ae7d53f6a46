//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use tracing::{info, warn};

/// Ensure the data directory exists and is writable.
///
/// The directory is created when missing. A marker file is written and removed
/// so that a read-only mount fails at startup rather than on the first write.
pub async fn ensure_data_dir(data_dir: &str) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(data_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {data_dir}: {e}"))?;

    let marker = std::path::Path::new(data_dir).join(".write_check");
    if let Err(e) = tokio::fs::write(&marker, b"ok").await {
        warn!(%data_dir, error = %e, "data directory is not writable");
        return Err(anyhow::anyhow!("data directory {data_dir} is not writable: {e}"));
    }
    let _ = tokio::fs::remove_file(&marker).await;
    info!(%data_dir, "data directory ready");
    Ok(())
}
