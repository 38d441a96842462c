//! Client-side route fallback across subcontext mount points.
//!
//! A path the [`AssetStore`] knows is always served literally. Any other
//! path is matched against the configured subcontexts, most specific
//! first, and answered with that subcontext's index document whose
//! `<base href="/">` has been rewritten to the subcontext's absolute
//! mount path. Paths matching nothing continue down the pipeline.

use std::cmp::Ordering;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use bytes::{Bytes, BytesMut};

use crate::assets::{normalize_path, AssetStore};
use crate::error::WebConsoleError;

/// Marker in index documents replaced with the subcontext's base path.
pub const BASE_HREF_PLACEHOLDER: &[u8] = b"<base href=\"/\">";

const HTML: &str = "text/html; charset=utf-8";

/// A mount point and its rewritten index document.
#[derive(Debug, Clone)]
pub struct Subcontext {
    name: String,
    index: Bytes,
}

impl Subcontext {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn index(&self) -> &Bytes {
        &self.index
    }

    /// Exact match, or `name` followed by a path separator.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        path.strip_prefix(self.name.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

pub struct RouteFallback {
    store: Arc<dyn AssetStore>,
    subcontexts: Vec<Subcontext>,
}

impl std::fmt::Debug for RouteFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteFallback")
            .field("subcontexts", &self.subcontexts)
            .finish_non_exhaustive()
    }
}

impl RouteFallback {
    /// Resolve and rewrite every subcontext's index up front.
    ///
    /// `context_root` carries leading and trailing slashes. A missing
    /// index asset fails construction.
    pub fn new<'a, I>(
        store: Arc<dyn AssetStore>,
        context_root: &str,
        subcontexts: I,
    ) -> Result<Self, WebConsoleError>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut resolved = Vec::new();
        for (name, index_path) in subcontexts {
            let index = store
                .resolve(index_path)
                .ok_or_else(|| WebConsoleError::MissingIndex {
                    subcontext: name.clone(),
                    index: index_path.clone(),
                })?;
            let base = join_base(context_root, name);
            resolved.push(Subcontext {
                name: name.clone(),
                index: rewrite_base_href(&index, &base),
            });
        }

        resolved.sort_by(|a, b| precedence(&a.name, &b.name));

        Ok(Self {
            store,
            subcontexts: resolved,
        })
    }

    /// Subcontexts in match order.
    #[must_use]
    pub fn subcontexts(&self) -> &[Subcontext] {
        &self.subcontexts
    }

    /// First subcontext, in precedence order, that claims `path`.
    #[must_use]
    pub fn match_subcontext(&self, path: &str) -> Option<&Subcontext> {
        self.subcontexts.iter().find(|s| s.matches(path))
    }

    /// The index to serve for `path`, or `None` when the path is a real
    /// asset or falls outside every subcontext.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<Bytes> {
        if self.store.resolve(path).is_some() {
            return None;
        }
        self.match_subcontext(path).map(|s| s.index.clone())
    }
}

/// Longer names first; names of equal length alphabetically.
///
/// Longest-first makes "a/b" win over "a" for "a/b/x" whatever order
/// the subcontexts were configured in.
#[must_use]
pub fn precedence(a: &str, b: &str) -> Ordering {
    b.len().cmp(&a.len()).then_with(|| a.cmp(b))
}

/// Join the context root and a subcontext name into a clean absolute
/// path: no doubled or trailing slashes, `.` and `..` resolved.
#[must_use]
pub fn join_base(context_root: &str, name: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in context_root.split('/').chain(name.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Replace the first [`BASE_HREF_PLACEHOLDER`] in `document` with a base
/// element pointing at `base`. Documents without it are returned as-is.
#[must_use]
pub fn rewrite_base_href(document: &[u8], base: &str) -> Bytes {
    let Some(pos) = document
        .windows(BASE_HREF_PLACEHOLDER.len())
        .position(|w| w == BASE_HREF_PLACEHOLDER)
    else {
        return Bytes::copy_from_slice(document);
    };

    let replacement = format!("<base href=\"{base}\">");
    let mut out = BytesMut::with_capacity(document.len() + replacement.len());
    out.extend_from_slice(&document[..pos]);
    out.extend_from_slice(replacement.as_bytes());
    out.extend_from_slice(&document[pos + BASE_HREF_PLACEHOLDER.len()..]);
    out.freeze()
}

pub async fn fallback(
    State(stage): State<Arc<RouteFallback>>,
    request: Request,
    next: Next,
) -> Response {
    let index = stage.resolve(&normalize_path(request.uri().path()));

    match index {
        Some(index) => {
            tracing::debug!(path = %request.uri().path(), "serving subcontext index");
            ([(header::CONTENT_TYPE, HeaderValue::from_static(HTML))], index).into_response()
        }
        None => next.run(request).await,
    }
}
