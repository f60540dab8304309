//! Entity tag derivation
//!
//! Deterministic over file identity, mtime and size, so two HEADs with no
//! intervening write agree (and any write through this server moves the
//! tag). Directories fold in every entry so a child write invalidates the
//! container's tag too.

use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Compute the ETag of a file or directory (unquoted).
pub fn etag(path: &Path) -> io::Result<String> {
    let stat = std::fs::metadata(path)?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(path.to_string_lossy().as_bytes());

    if stat.is_dir() {
        let mut entries: Vec<_> = std::fs::read_dir(path)?
            .filter_map(|e| e.ok())
            .collect();
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            hasher.update(entry.file_name().to_string_lossy().as_bytes());
            if let Ok(stat) = entry.metadata() {
                fold_stat(&mut hasher, &stat);
            }
        }
    } else {
        fold_stat(&mut hasher, &stat);
    }

    Ok(hasher.finalize().to_hex()[..32].to_string())
}

fn fold_stat(hasher: &mut blake3::Hasher, stat: &std::fs::Metadata) {
    let mtime = stat
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    hasher.update(&mtime.to_le_bytes());
    hasher.update(&stat.len().to_le_bytes());
}
