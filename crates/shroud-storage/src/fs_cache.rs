// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured on-disk cache directory.
//!
//! Layout is `<root>/<namespace>/<name>`. Nothing written here may be a
//! secret; the whole tree is removed by the panic wipe.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use shroud_core::{ShroudError, WipeTarget};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the root directory if it does not exist.
    pub async fn ensure(&self) -> Result<(), ShroudError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(ShroudError::persistence)
    }

    pub async fn write_entry(
        &self,
        namespace: &str,
        name: &str,
        contents: &[u8],
    ) -> Result<PathBuf, ShroudError> {
        let path = self.entry_path(namespace, name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ShroudError::persistence)?;
        }
        tokio::fs::write(&path, contents)
            .await
            .map_err(ShroudError::persistence)?;
        debug!(namespace, name, bytes = contents.len(), "cache entry written");
        Ok(path)
    }

    /// Returns `None` when the entry does not exist.
    pub async fn read_entry(&self, namespace: &str, name: &str) -> Result<Option<Vec<u8>>, ShroudError> {
        let path = self.entry_path(namespace, name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ShroudError::persistence(e)),
        }
    }

    /// Removes the whole tree. A missing directory counts as success.
    pub async fn remove_all(&self) -> Result<(), ShroudError> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {
                info!(path = %self.root.display(), "cache directory removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ShroudError::persistence(e)),
        }
    }

    fn entry_path(&self, namespace: &str, name: &str) -> Result<PathBuf, ShroudError> {
        for part in [namespace, name] {
            let mut components = Path::new(part).components();
            let single_normal =
                matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none();
            if !single_normal {
                return Err(ShroudError::InvalidInput(format!(
                    "cache path segment `{part}` must be a plain file name"
                )));
            }
        }
        Ok(self.root.join(namespace).join(name))
    }
}

#[async_trait]
impl WipeTarget for CacheDir {
    fn target_name(&self) -> &str {
        "cache-dir"
    }

    async fn wipe(&self) -> Result<(), ShroudError> {
        self.remove_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_read_and_wipe() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = CacheDir::new(tmp.path().join("cache"));
        cache.ensure().await.unwrap();

        cache.write_entry("prices", "eth.json", b"{}").await.unwrap();
        assert_eq!(
            cache.read_entry("prices", "eth.json").await.unwrap().as_deref(),
            Some(&b"{}"[..])
        );
        assert_eq!(cache.read_entry("prices", "btc.json").await.unwrap(), None);

        cache.wipe().await.unwrap();
        assert!(!cache.root().exists());
        // Second wipe on a missing directory still succeeds.
        cache.wipe().await.unwrap();
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = CacheDir::new(tmp.path());
        for (ns, name) in [("..", "x"), ("a/b", "x"), ("a", "/etc/passwd"), ("a", "")] {
            assert!(matches!(
                cache.write_entry(ns, name, b"").await,
                Err(ShroudError::InvalidInput(_))
            ));
        }
    }
}
