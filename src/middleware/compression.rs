//! Transparent gzip response compression.
//!
//! [`compress`] runs first in the pipeline. When the client advertises
//! gzip it canonicalizes `Accept-Encoding` to exactly `gzip` (so later
//! stages key caches on one value), registers `Accept-Encoding` in the
//! request's [`VaryHeaders`], and on the way out marks the response as
//! gzip-encoded and streams its body through a [`GzipBody`].

use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use bytes::Bytes;
use flate2::write::GzEncoder;
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::BodyExt;

use super::sniff::sniff_content_type;
use super::VaryHeaders;

pub const GZIP: &str = "gzip";

/// Compression stage state. Only the gzip level is configurable.
#[derive(Debug, Clone, Copy)]
pub struct Compression {
    level: flate2::Compression,
}

impl Default for Compression {
    fn default() -> Self {
        Self::new()
    }
}

impl Compression {
    #[must_use]
    pub fn new() -> Self {
        Self {
            level: flate2::Compression::default(),
        }
    }

    /// Gzip level from 0 (store) to 9 (best); larger values are clamped.
    #[must_use]
    pub fn with_level(level: u32) -> Self {
        Self {
            level: flate2::Compression::new(level.min(9)),
        }
    }
}

/// Whether the request's `Accept-Encoding` mentions gzip without
/// refusing it through `q=0`.
#[must_use]
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(gzip_allowed))
}

fn gzip_allowed(entry: &str) -> bool {
    let mut parts = entry.split(';');
    let coding = parts.next().unwrap_or_default();
    if !coding.contains(GZIP) {
        return false;
    }
    // An unparsable weight does not refuse the coding
    parts
        .filter_map(|param| param.trim().strip_prefix("q="))
        .all(|q| q.trim().parse::<f32>().map_or(true, |q| q > 0.0))
}

pub async fn compress(
    State(stage): State<Arc<Compression>>,
    mut request: Request,
    next: Next,
) -> Response {
    if !accepts_gzip(request.headers()) {
        return next.run(request).await;
    }

    request
        .headers_mut()
        .insert(header::ACCEPT_ENCODING, HeaderValue::from_static(GZIP));
    let mut vary = request
        .extensions_mut()
        .remove::<VaryHeaders>()
        .unwrap_or_default();
    vary.push(header::ACCEPT_ENCODING);
    request.extensions_mut().insert(vary);

    let response = next.run(request).await;
    let (mut parts, mut body) = response.into_parts();

    parts
        .headers
        .append(header::VARY, HeaderValue::from_static("Accept-Encoding"));
    parts
        .headers
        .insert(header::CONTENT_ENCODING, HeaderValue::from_static(GZIP));

    if !body_allowed(parts.status) {
        return Response::from_parts(parts, body);
    }
    parts.headers.remove(header::CONTENT_LENGTH);

    // The first frame is read here so the content type can be sniffed
    // before the headers go out.
    let head = if parts.headers.contains_key(header::CONTENT_TYPE) {
        None
    } else {
        let head = body.frame().await;
        if let Some(data) = head
            .as_ref()
            .and_then(|r| r.as_ref().ok())
            .and_then(Frame::data_ref)
        {
            let sniffed = sniff_content_type(data);
            parts
                .headers
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(sniffed));
        }
        head
    };

    let body = GzipBody::new(body, head, stage.level);
    Response::from_parts(parts, Body::new(body))
}

fn body_allowed(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

/// Response body that gzips every data frame of the wrapped body.
///
/// The encoder is created with the body and released exactly once: it is
/// finished (writing the gzip footer) when the inner body ends, dropped
/// when the inner body fails, and dropped with the body if the response
/// is abandoned. Trailers from the inner body are discarded.
pub struct GzipBody {
    inner: Body,
    head: Option<Result<Frame<Bytes>, axum::Error>>,
    encoder: Option<GzEncoder<Vec<u8>>>,
}

impl GzipBody {
    #[must_use]
    pub fn new(
        inner: Body,
        head: Option<Result<Frame<Bytes>, axum::Error>>,
        level: flate2::Compression,
    ) -> Self {
        Self {
            inner,
            head,
            encoder: Some(GzEncoder::new(Vec::new(), level)),
        }
    }
}

impl HttpBody for GzipBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        loop {
            let Some(encoder) = this.encoder.as_mut() else {
                return Poll::Ready(None);
            };

            let next = match this.head.take() {
                Some(head) => Some(head),
                None => ready!(Pin::new(&mut this.inner).poll_frame(cx)),
            };

            match next {
                Some(Ok(frame)) => {
                    let Ok(data) = frame.into_data() else {
                        continue;
                    };
                    if let Err(e) = encoder.write_all(&data) {
                        this.encoder = None;
                        return Poll::Ready(Some(Err(axum::Error::new(e))));
                    }
                    let compressed = std::mem::take(encoder.get_mut());
                    if !compressed.is_empty() {
                        return Poll::Ready(Some(Ok(Frame::data(Bytes::from(compressed)))));
                    }
                }
                Some(Err(e)) => {
                    this.encoder = None;
                    tracing::warn!(error = %e, "response body failed mid-compression");
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    let Some(encoder) = this.encoder.take() else {
                        return Poll::Ready(None);
                    };
                    return match encoder.finish() {
                        Ok(tail) => Poll::Ready(Some(Ok(Frame::data(Bytes::from(tail))))),
                        Err(e) => Poll::Ready(Some(Err(axum::Error::new(e)))),
                    };
                }
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.encoder.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::default()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::Read;

    use axum::http::Request as HttpRequest;
    use axum::middleware::from_fn_with_state;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;
    use flate2::read::GzDecoder;
    use tower::ServiceExt;

    use super::*;

    fn gunzip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    /// Body yielding a fixed sequence of chunks or errors.
    struct Chunks(VecDeque<Result<Bytes, std::io::Error>>);

    impl HttpBody for Chunks {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
            Poll::Ready(self.get_mut().0.pop_front().map(|r| r.map(Frame::data)))
        }
    }

    fn router() -> Router {
        Router::new()
            .route("/page", get(|| async { "<html><body>hi</body></html>" }))
            .route(
                "/typed",
                get(|| async { ([(header::CONTENT_TYPE, "text/css")], "body{}") }),
            )
            .route(
                "/untyped",
                get(|| async {
                    let mut resp = Body::from("<!DOCTYPE html><p>x</p>").into_response();
                    resp.headers_mut().remove(header::CONTENT_TYPE);
                    resp
                }),
            )
            .route(
                "/echo",
                get(|req: Request| async move {
                    let seen = req.extensions().get::<VaryHeaders>().cloned();
                    let accept = req.headers()[header::ACCEPT_ENCODING].clone();
                    let names = seen.map(|v| v.names().len()).unwrap_or_default();
                    format!("{}|{names}", accept.to_str().unwrap())
                }),
            )
            .route(
                "/chunks",
                get(|| async {
                    Body::new(Chunks(
                        [
                            Ok(Bytes::from_static(b"first ")),
                            Ok(Bytes::from_static(b"second ")),
                            Ok(Bytes::from_static(b"third")),
                        ]
                        .into(),
                    ))
                }),
            )
            .route(
                "/not-modified",
                get(|| async { StatusCode::NOT_MODIFIED }),
            )
            .layer(from_fn_with_state(Arc::new(Compression::new()), compress))
    }

    async fn fetch(path: &str, accept: Option<&str>) -> Response {
        let mut req = HttpRequest::get(path);
        if let Some(accept) = accept {
            req = req.header(header::ACCEPT_ENCODING, accept);
        }
        router()
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_bytes(resp: Response) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn no_gzip_passes_through_unchanged() {
        let resp = fetch("/page", Some("br, deflate")).await;
        assert!(resp.headers().get(header::CONTENT_ENCODING).is_none());
        assert!(resp.headers().get(header::VARY).is_none());
        assert_eq!(&body_bytes(resp).await[..], b"<html><body>hi</body></html>");
    }

    #[test]
    fn zero_weight_refuses_gzip() {
        let accept = |v: &'static str| {
            let mut h = HeaderMap::new();
            h.insert(header::ACCEPT_ENCODING, HeaderValue::from_static(v));
            accepts_gzip(&h)
        };
        assert!(accept("gzip"));
        assert!(accept("br, gzip;q=0.5"));
        assert!(accept("x-gzip"));
        assert!(!accept("gzip;q=0"));
        assert!(!accept("gzip; q=0.0, deflate"));
        assert!(!accept("br"));
        assert!(!accept(""));
    }

    #[tokio::test]
    async fn refused_gzip_passes_through_unchanged() {
        let resp = fetch("/page", Some("gzip;q=0, identity")).await;
        assert!(resp.headers().get(header::CONTENT_ENCODING).is_none());
        assert!(resp.headers().get(header::VARY).is_none());
        assert_eq!(&body_bytes(resp).await[..], b"<html><body>hi</body></html>");
    }

    #[tokio::test]
    async fn gzip_body_decompresses_to_input() {
        let plain = body_bytes(fetch("/page", None).await).await;
        let resp = fetch("/page", Some("gzip, deflate, br")).await;
        assert_eq!(resp.headers()[header::CONTENT_ENCODING], GZIP);
        assert_eq!(resp.headers()[header::VARY], "Accept-Encoding");
        assert!(resp.headers().get(header::CONTENT_LENGTH).is_none());
        let compressed = body_bytes(resp).await;
        assert_eq!(gunzip(&compressed), plain.to_vec());
    }

    #[tokio::test]
    async fn accept_encoding_is_canonicalized_and_vary_registered() {
        let resp = fetch("/echo", Some("deflate, gzip;q=0.8")).await;
        let body = gunzip(&body_bytes(resp).await);
        assert_eq!(body, b"gzip|1");
    }

    #[tokio::test]
    async fn existing_content_type_is_kept() {
        let resp = fetch("/typed", Some("gzip")).await;
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/css");
    }

    #[tokio::test]
    async fn missing_content_type_is_sniffed_from_first_bytes() {
        let resp = fetch("/untyped", Some("gzip")).await;
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        let body = gunzip(&body_bytes(resp).await);
        assert_eq!(body, b"<!DOCTYPE html><p>x</p>");
    }

    #[tokio::test]
    async fn multi_frame_body_is_one_gzip_stream() {
        let resp = fetch("/chunks", Some("gzip")).await;
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let body = gunzip(&body_bytes(resp).await);
        assert_eq!(body, b"first second third");
    }

    #[tokio::test]
    async fn bodiless_status_is_not_wrapped() {
        let resp = fetch("/not-modified", Some("gzip")).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn encoder_is_released_when_inner_body_fails() {
        let inner = Body::new(Chunks(
            [
                Ok(Bytes::from_static(b"partial")),
                Err(std::io::Error::other("upstream gone")),
            ]
            .into(),
        ));
        let mut body = GzipBody::new(inner, None, flate2::Compression::fast());

        let mut saw_error = false;
        while let Some(frame) = body.frame().await {
            if frame.is_err() {
                saw_error = true;
            }
        }
        assert!(saw_error);
        assert!(body.is_end_stream());
        assert!(body.frame().await.is_none());
    }

    #[tokio::test]
    async fn empty_body_still_yields_valid_gzip() {
        let mut body = GzipBody::new(Body::empty(), None, flate2::Compression::default());
        let mut out = Vec::new();
        while let Some(frame) = body.frame().await {
            out.extend_from_slice(frame.unwrap().data_ref().unwrap());
        }
        assert!(gunzip(&out).is_empty());
        assert!(body.is_end_stream());
    }

    #[test]
    fn level_is_clamped() {
        assert_eq!(Compression::with_level(42).level.level(), 9);
    }
}
