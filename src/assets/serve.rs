//! Innermost handler: serves literal asset bytes.

use std::borrow::Cow;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use super::{normalize_path, AssetStore};
use crate::middleware::sniff::sniff_content_type;

/// Served for the bare root path.
pub const DEFAULT_INDEX: &str = "index.html";

/// Serve the asset named by the request path, or 404.
///
/// `Content-Type` is guessed from the extension, falling back to
/// sniffing the content, so it does not depend on the negotiated
/// encoding.
pub async fn serve_asset(
    State(store): State<Arc<dyn AssetStore>>,
    method: Method,
    uri: Uri,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, HeaderValue::from_static("GET, HEAD"))],
        )
            .into_response();
    }

    let path = normalize_path(uri.path());
    let path = if path.is_empty() {
        Cow::Borrowed(DEFAULT_INDEX)
    } else {
        path
    };

    let Some(content) = store.resolve(&path) else {
        tracing::debug!(path = %path, "asset not found");
        return StatusCode::NOT_FOUND.into_response();
    };

    let mime = mime_guess::from_path(path.as_ref())
        .first_raw()
        .unwrap_or_else(|| sniff_content_type(&content));
    let mut response = Response::new(Body::from(content));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(mime));
    response
}
