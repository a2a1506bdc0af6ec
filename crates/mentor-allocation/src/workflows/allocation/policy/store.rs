use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, info};

use super::{Policy, PolicyError, PolicyLoadMode};

/// Caller-owned policy cache keyed by the document's modification time.
///
/// There is no process-wide state: whoever owns the store decides how long a
/// policy lives and when to [`reload`](Self::reload) it.
#[derive(Debug)]
pub struct PolicyStore {
    path: PathBuf,
    mode: PolicyLoadMode,
    cached: Option<CachedPolicy>,
}

#[derive(Debug)]
struct CachedPolicy {
    modified: Option<SystemTime>,
    policy: Arc<Policy>,
}

impl PolicyStore {
    pub fn new(path: impl Into<PathBuf>, mode: PolicyLoadMode) -> Self {
        Self {
            path: path.into(),
            mode,
            cached: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the cached policy unless the document changed on disk.
    pub fn load(&mut self) -> Result<Arc<Policy>, PolicyError> {
        let modified = self.modified_at()?;
        if let Some(cached) = &self.cached {
            if modified.is_some() && cached.modified == modified {
                debug!(path = %self.path.display(), "policy cache hit");
                return Ok(Arc::clone(&cached.policy));
            }
        }
        self.reload()
    }

    /// Re-read and re-validate the document regardless of the cache.
    pub fn reload(&mut self) -> Result<Arc<Policy>, PolicyError> {
        let modified = self.modified_at()?;
        let policy = Arc::new(Policy::from_path(&self.path, self.mode)?);

        info!(
            path = %self.path.display(),
            version = %policy.version(),
            migrated_sections = policy.migration_warnings().len(),
            "policy loaded"
        );

        self.cached = Some(CachedPolicy {
            modified,
            policy: Arc::clone(&policy),
        });
        Ok(policy)
    }

    pub fn clear(&mut self) {
        self.cached = None;
    }

    fn modified_at(&self) -> Result<Option<SystemTime>, PolicyError> {
        let metadata = std::fs::metadata(&self.path).map_err(|source| PolicyError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(metadata.modified().ok())
    }
}
