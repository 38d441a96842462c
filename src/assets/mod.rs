//! The asset store and the innermost "serve raw asset" handler.
//!
//! [`AssetStore`] is the byte-content provider consulted by the route
//! fallback stage and by [`serve_asset`]. Two stores ship with the crate:
//! [`MemoryAssetStore`] for compiled-in or test content, and
//! [`DirAssetStore`] which snapshots a build output directory at startup.

mod dir;
mod serve;

use std::borrow::Cow;
use std::collections::HashMap;

use bytes::Bytes;
use percent_encoding::percent_decode_str;

pub use dir::DirAssetStore;
pub use serve::serve_asset;

/// Byte content keyed by normalized path (no leading slash).
///
/// `None` from [`resolve`](AssetStore::resolve) is the ordinary "not found"
/// signal, not an error.
pub trait AssetStore: Send + Sync {
    fn resolve(&self, path: &str) -> Option<Bytes>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Strip one leading slash and percent-decode a request path.
///
/// A path that does not decode to UTF-8 is returned undecoded, which
/// simply makes it miss the store.
#[must_use]
pub fn normalize_path(raw: &str) -> Cow<'_, str> {
    let trimmed = raw.strip_prefix('/').unwrap_or(raw);
    percent_decode_str(trimmed)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(trimmed))
}

#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    assets: HashMap<String, Bytes>,
}

impl MemoryAssetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<Bytes>) {
        self.assets.insert(path.into(), content.into());
    }
}

impl<P, C> FromIterator<(P, C)> for MemoryAssetStore
where
    P: Into<String>,
    C: Into<Bytes>,
{
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (path, content) in iter {
            store.insert(path, content);
        }
        store
    }
}

impl AssetStore for MemoryAssetStore {
    fn resolve(&self, path: &str) -> Option<Bytes> {
        // Bytes clones share the allocation
        self.assets.get(path).cloned()
    }

    fn len(&self) -> usize {
        self.assets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_single_leading_slash() {
        assert_eq!(normalize_path("/app.js"), "app.js");
        assert_eq!(normalize_path("//app.js"), "/app.js");
        assert_eq!(normalize_path("app.js"), "app.js");
        assert_eq!(normalize_path("/"), "");
    }

    #[test]
    fn normalize_percent_decodes() {
        assert_eq!(normalize_path("/fonts/open%20sans.woff"), "fonts/open sans.woff");
        assert_eq!(normalize_path("/bad%FF"), "bad%FF");
    }

    #[test]
    fn memory_store_resolves_exact_keys_only() {
        let store: MemoryAssetStore = [("app.js", "x"), ("styles/main.css", "y")]
            .into_iter()
            .collect();
        assert_eq!(store.resolve("app.js"), Some(Bytes::from_static(b"x")));
        assert!(store.resolve("/app.js").is_none());
        assert!(store.resolve("styles").is_none());
        assert_eq!(store.len(), 2);
        assert!(!store.is_empty());
    }
}
