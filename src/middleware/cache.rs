//! Weak ETag computation and `If-None-Match` validation.
//!
//! The ETag covers the asset build version plus the request's values for
//! every header the response varies on. Those names come from the
//! request's [`VaryHeaders`], so any stage that adds to `Vary` must run
//! before this one.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};

use super::VaryHeaders;

#[derive(Debug, Clone)]
pub struct CacheValidation {
    version: String,
}

impl CacheValidation {
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn etag(&self, request_headers: &HeaderMap, vary: &[HeaderName]) -> String {
        compute_etag(&self.version, request_headers, vary)
    }
}

/// `W/"<sha256 hex of version + vary values>"`.
///
/// Vary values are concatenated in list order; an absent header
/// contributes nothing. Only the first value of a repeated header counts.
#[must_use]
pub fn compute_etag(version: &str, request_headers: &HeaderMap, vary: &[HeaderName]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(version.as_bytes());
    for name in vary {
        if let Some(value) = request_headers.get(name) {
            hasher.update(value.as_bytes());
        }
    }
    format!("W/\"{:x}\"", hasher.finalize())
}

pub async fn validate(
    State(stage): State<Arc<CacheValidation>>,
    request: Request,
    next: Next,
) -> Response {
    let vary = request
        .extensions()
        .get::<VaryHeaders>()
        .map(VaryHeaders::names)
        .unwrap_or_default();
    let etag = stage.etag(request.headers(), vary);

    // Hex digest inside quotes is always a legal header value
    let Ok(etag_value) = HeaderValue::try_from(etag) else {
        return next.run(request).await;
    };

    let matches = request
        .headers()
        .get(header::IF_NONE_MATCH)
        .is_some_and(|candidate| *candidate == etag_value);
    if matches {
        tracing::debug!(path = %request.uri().path(), "etag matched, not modified");
        return (StatusCode::NOT_MODIFIED, [(header::ETAG, etag_value)]).into_response();
    }

    let mut response = next.run(request).await;
    response.headers_mut().insert(header::ETAG, etag_value);
    response
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for &(k, v) in pairs {
            map.insert(k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn etag_is_deterministic_and_weak() {
        let h = headers(&[("accept-encoding", "gzip")]);
        let vary = [header::ACCEPT_ENCODING];
        let a = compute_etag("v1", &h, &vary);
        let b = compute_etag("v1", &h, &vary);
        assert_eq!(a, b);
        assert!(a.starts_with("W/\""));
        assert!(a.ends_with('"'));
        assert_eq!(a.len(), "W/\"\"".len() + 64);
    }

    #[test]
    fn etag_changes_with_vary_values_and_version() {
        let vary = [header::ACCEPT_ENCODING];
        let gzip = compute_etag("v1", &headers(&[("accept-encoding", "gzip")]), &vary);
        let none = compute_etag("v1", &HeaderMap::new(), &vary);
        let v2 = compute_etag("v2", &headers(&[("accept-encoding", "gzip")]), &vary);
        assert_ne!(gzip, none);
        assert_ne!(gzip, v2);
    }

    #[test]
    fn empty_vary_depends_only_on_version() {
        let a = compute_etag("v1", &headers(&[("accept-encoding", "gzip")]), &[]);
        let b = compute_etag("v1", &headers(&[("user-agent", "curl")]), &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn unlisted_headers_are_ignored() {
        let vary = [header::ACCEPT_ENCODING];
        let a = compute_etag("v1", &headers(&[("accept-encoding", "gzip")]), &vary);
        let b = compute_etag(
            "v1",
            &headers(&[("accept-encoding", "gzip"), ("cookie", "x=1")]),
            &vary,
        );
        assert_eq!(a, b);
    }

    fn router(hits: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/app.js",
                get(move || {
                    let hits = Arc::clone(&hits);
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        "console.log(1)"
                    }
                }),
            )
            .layer(from_fn_with_state(
                Arc::new(CacheValidation::new("build-7")),
                validate,
            ))
    }

    #[tokio::test]
    async fn sets_etag_then_short_circuits_on_match() {
        let hits = Arc::new(AtomicUsize::new(0));

        let resp = router(Arc::clone(&hits))
            .oneshot(HttpRequest::get("/app.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let etag = resp.headers()[header::ETAG].clone();
        assert_eq!(etag.to_str().unwrap(), compute_etag("build-7", &HeaderMap::new(), &[]));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let resp = router(Arc::clone(&hits))
            .oneshot(
                HttpRequest::get("/app.js")
                    .header(header::IF_NONE_MATCH, etag.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(resp.headers()[header::ETAG], etag);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 1, "downstream must not run");
    }

    #[tokio::test]
    async fn stale_validator_gets_full_response() {
        let hits = Arc::new(AtomicUsize::new(0));
        let resp = router(Arc::clone(&hits))
            .oneshot(
                HttpRequest::get("/app.js")
                    .header(header::IF_NONE_MATCH, "W/\"stale\"")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn vary_names_from_outer_stage_feed_the_etag() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut vary = VaryHeaders::default();
        vary.push(header::ACCEPT_ENCODING);

        let mut req = HttpRequest::get("/app.js")
            .header(header::ACCEPT_ENCODING, "gzip")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut().insert(vary);

        let resp = router(hits).oneshot(req).await.unwrap();
        let expected = compute_etag(
            "build-7",
            &headers(&[("accept-encoding", "gzip")]),
            &[header::ACCEPT_ENCODING],
        );
        assert_eq!(resp.headers()[header::ETAG].to_str().unwrap(), expected);
    }
}
