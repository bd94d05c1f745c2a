use std::path::Path;

use log::warn;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::download::chunk_plan::ChunkSpec;
use crate::download::error::MergeError;

/// Concatenates fetched chunk artifacts into `destination` in ascending index
/// order, streaming each artifact rather than buffering it. Every artifact is
/// verified to exist before the destination is created, so a missing chunk
/// never leaves a truncated file behind.
pub async fn merge_chunks(specs: &[ChunkSpec], destination: &Path) -> Result<u64, MergeError> {
    for spec in specs {
        if !spec.temp_path.exists() {
            return Err(MergeError::MissingChunk {
                index: spec.index,
                path: spec.temp_path.clone(),
            });
        }
    }

    let mut file = File::create(destination).await?;
    let mut total_bytes = 0u64;

    for spec in specs {
        let mut chunk = match File::open(&spec.temp_path).await {
            Ok(chunk) => chunk,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(MergeError::MissingChunk {
                    index: spec.index,
                    path: spec.temp_path.clone(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        total_bytes += tokio::io::copy(&mut chunk, &mut file).await?;
    }

    file.flush().await?;
    file.sync_all().await?;

    Ok(total_bytes)
}

/// Tears down a job's scratch directory. Best-effort; failures are logged
/// and never alter the job result.
pub async fn remove_artifacts(scratch_dir: &Path) {
    if let Err(err) = tokio::fs::remove_dir_all(scratch_dir).await {
        warn!("Failed to remove scratch dir {:?}: {}", scratch_dir, err);
    }
}
