//! On-disk payload cache
//!
//! One JSON file per (clan tag, resource) pair. A present file suppresses a
//! remote fetch unless the sync was started with the cache bypassed; a fresh
//! fetch always overwrites the file.

use std::path::{Path, PathBuf};
use tracing::warn;

use crate::api::Resource;
use crate::SyncResult;

pub struct PayloadCache {
    dir: PathBuf,
}

impl PayloadCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path(&self, clan_tag: &str, resource: Resource) -> PathBuf {
        self.dir.join(format!("{}_{}.json", clan_tag, resource.as_str()))
    }

    /// Load the cached payload for this (clan, resource), if any.
    /// An unreadable file is treated as a miss, not an error.
    pub fn load(&self, clan_tag: &str, resource: Resource) -> Option<String> {
        let path = self.path(clan_tag, resource);
        match std::fs::read_to_string(&path) {
            Ok(body) => Some(body),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable cache file");
                None
            }
        }
    }

    /// Overwrite the cached payload for this (clan, resource)
    pub fn store(&self, clan_tag: &str, resource: Resource, body: &str) -> SyncResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(clan_tag, resource), body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PayloadCache::new(dir.path());

        assert!(cache.load("2PP", Resource::Members).is_none());

        cache.store("2PP", Resource::Members, r#"{"items": []}"#).unwrap();
        assert_eq!(
            cache.load("2PP", Resource::Members).as_deref(),
            Some(r#"{"items": []}"#)
        );

        // Other resource for the same clan is a separate file
        assert!(cache.load("2PP", Resource::Warlog).is_none());

        // A fresh store overwrites
        cache.store("2PP", Resource::Members, "{}").unwrap();
        assert_eq!(cache.load("2PP", Resource::Members).as_deref(), Some("{}"));
    }
}
