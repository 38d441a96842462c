//! Directory-backed [`AssetStore`] loaded once at startup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};

use super::AssetStore;
use crate::error::WebConsoleError;

/// In-memory snapshot of an asset build directory.
///
/// Every regular file under the root is read eagerly and keyed by its
/// slash-separated path relative to the root. Files added after startup
/// are not seen.
#[derive(Debug, Clone)]
pub struct DirAssetStore {
    root: PathBuf,
    assets: BTreeMap<String, Bytes>,
}

impl DirAssetStore {
    pub fn load(root: &Path) -> Result<Self, WebConsoleError> {
        let mut assets = BTreeMap::new();
        walk(root, root, &mut assets).map_err(|source| WebConsoleError::AssetDir {
            path: root.to_path_buf(),
            source,
        })?;

        tracing::debug!(root = %root.display(), assets = assets.len(), "asset directory loaded");

        Ok(Self {
            root: root.to_path_buf(),
            assets,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// SHA-256 over every (path, content) pair in path order.
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (path, content) in &self.assets {
            hasher.update(path.as_bytes());
            hasher.update([0u8]);
            hasher.update((content.len() as u64).to_be_bytes());
            hasher.update(content);
        }
        format!("{:x}", hasher.finalize())
    }
}

fn walk(
    root: &Path,
    dir: &Path,
    assets: &mut BTreeMap<String, Bytes>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            walk(root, &path, assets)?;
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let Some(key) = relative_key(root, &path) else {
            tracing::warn!(path = %path.display(), "skipping asset with non UTF-8 path");
            continue;
        };
        let content = std::fs::read(&path)?;
        assets.insert(key, Bytes::from(content));
    }
    Ok(())
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        parts.push(component.as_os_str().to_str()?);
    }
    Some(parts.join("/"))
}

impl AssetStore for DirAssetStore {
    fn resolve(&self, path: &str) -> Option<Bytes> {
        self.assets.get(path).cloned()
    }

    fn len(&self) -> usize {
        self.assets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        std::fs::create_dir_all(dir.path().join("scripts/vendor")).unwrap();
        std::fs::write(dir.path().join("scripts/vendor/lib.js"), "lib()").unwrap();
        dir
    }

    #[test]
    fn loads_nested_files_with_slash_keys() {
        let dir = fixture();
        let store = DirAssetStore::load(dir.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.resolve("scripts/vendor/lib.js"),
            Some(Bytes::from_static(b"lib()"))
        );
        assert!(store.resolve("scripts/vendor").is_none());
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = DirAssetStore::load(Path::new("/nonexistent/assets")).unwrap_err();
        assert!(matches!(err, WebConsoleError::AssetDir { .. }));
    }

    #[test]
    fn digest_tracks_content() {
        let dir = fixture();
        let before = DirAssetStore::load(dir.path()).unwrap().digest();
        assert_eq!(before, DirAssetStore::load(dir.path()).unwrap().digest());

        std::fs::write(dir.path().join("index.html"), "<html>v2</html>").unwrap();
        let after = DirAssetStore::load(dir.path()).unwrap().digest();
        assert_ne!(before, after);
    }
}
