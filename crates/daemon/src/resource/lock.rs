//! Per-path mutual exclusion
//!
//! Every mutating verb holds the lock for its target file across the whole
//! read-modify-write. Guards release on drop, so a canceled request task
//! cannot leak a lock. Readers do not take locks; sibling paths never
//! serialize against each other.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

const PURGE_THRESHOLD: usize = 64;

/// Process-wide keyed mutex map.
#[derive(Debug, Default, Clone)]
pub struct LockMap {
    inner: Arc<Mutex<HashMap<PathBuf, Weak<AsyncMutex<()>>>>>,
}

/// Held lock; dropping it releases the path.
#[derive(Debug)]
pub struct LockGuard {
    _guard: OwnedMutexGuard<()>,
}

impl LockMap {
    /// Acquire the lock for `key`, waiting for any current holder.
    pub async fn lock(&self, key: &Path) -> LockGuard {
        let entry = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            match map.get(key).and_then(Weak::upgrade) {
                Some(entry) => entry,
                None => {
                    if map.len() > PURGE_THRESHOLD {
                        map.retain(|_, weak| weak.strong_count() > 0);
                    }
                    let entry = Arc::new(AsyncMutex::new(()));
                    map.insert(key.to_path_buf(), Arc::downgrade(&entry));
                    entry
                }
            }
        };
        LockGuard {
            _guard: entry.lock_owned().await,
        }
    }
}
