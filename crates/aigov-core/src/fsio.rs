//! Atomic artifact writes.
//!
//! Bytes go to a `NamedTempFile` in the destination directory, are synced,
//! and the file is then renamed over the target. If any step fails the temp
//! file is dropped and removed, so readers only ever see the old artifact or
//! the complete new one.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use aigov_contracts::error::{AigovError, AigovResult};

/// Write `bytes` to `path` via temp file + rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> AigovResult<()> {
    let dir = path.parent().ok_or_else(|| AigovError::InvalidArgument {
        reason: format!("artifact path '{}' has no parent directory", path.display()),
    })?;
    fs::create_dir_all(dir).map_err(|e| AigovError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| AigovError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| AigovError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| AigovError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| AigovError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
    Ok(())
}

/// Pretty-print `value` as JSON and write it atomically.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> AigovResult<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| AigovError::malformed(path.display().to_string(), e))?;
    write_atomic(path, &bytes)
}

/// Read a file fully; a missing file is `MissingArtifact`.
pub fn read_artifact(path: &Path) -> AigovResult<Vec<u8>> {
    fs::read(path).map_err(|e| AigovError::io(path, e))
}

/// Parse artifact bytes as JSON of type `T`, reporting failures as
/// `MalformedInput` against `path`.
pub fn parse_json<T: serde::de::DeserializeOwned>(path: &Path, bytes: &[u8]) -> AigovResult<T> {
    serde_json::from_slice(bytes).map_err(|e| AigovError::malformed(path.display().to_string(), e))
}
