//! Dynamic `config.js` rendering.
//!
//! Requests for [`CONFIG_SCRIPT_PATH`] are answered here with a script
//! assigning the operator's [`WebConsoleConfig`] to
//! `window.OPENSHIFT_CONFIG`. Every interpolated value is JavaScript-string
//! escaped. The response is never cacheable.

use std::fmt::{self, Write};
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::assets::normalize_path;
use crate::config::model::WebConsoleConfig;

/// Reserved asset path, without leading slash.
pub const CONFIG_SCRIPT_PATH: &str = "config.js";

/// Global the browser application reads its configuration from.
pub const CONFIG_GLOBAL: &str = "OPENSHIFT_CONFIG";

const NO_STORE: &str = "no-cache, no-store";
const JAVASCRIPT: &str = "application/javascript; charset=utf-8";

#[derive(Debug, Clone)]
pub struct ConfigScript {
    config: WebConsoleConfig,
}

impl ConfigScript {
    #[must_use]
    pub const fn new(config: WebConsoleConfig) -> Self {
        Self { config }
    }

    /// Write the script into `out`. On error `out` holds whatever was
    /// written before the failure.
    pub fn render<W: Write>(&self, out: &mut W) -> fmt::Result {
        let c = &self.config;
        writeln!(out)?;
        writeln!(out, "window.{CONFIG_GLOBAL} = {{")?;
        writeln!(out, "  api: {{")?;
        writeln!(out, "    openshift: {{")?;
        writeln!(out, "      hostPort: \"{}\",", JsEscaped(&c.master_addr))?;
        writeln!(out, "      prefix: \"{}\"", JsEscaped(&c.master_prefix))?;
        writeln!(out, "    }},")?;
        writeln!(out, "    k8s: {{")?;
        writeln!(out, "      hostPort: \"{}\",", JsEscaped(&c.kubernetes_addr))?;
        writeln!(out, "      prefix: \"{}\"", JsEscaped(&c.kubernetes_prefix))?;
        writeln!(out, "    }}")?;
        writeln!(out, "  }},")?;
        writeln!(out, "  auth: {{")?;
        writeln!(
            out,
            "    oauth_authorize_uri: \"{}\",",
            JsEscaped(&c.oauth_authorize_uri)
        )?;
        writeln!(
            out,
            "    oauth_redirect_base: \"{}\",",
            JsEscaped(&c.oauth_redirect_base)
        )?;
        writeln!(out, "    oauth_client_id: \"{}\",", JsEscaped(&c.oauth_client_id))?;
        writeln!(out, "    logout_uri: \"{}\"", JsEscaped(&c.logout_uri))?;
        writeln!(out, "  }}")?;
        writeln!(out, "}};")
    }
}

/// Displays a string escaped for a double- or single-quoted JS literal.
///
/// Quotes and backslashes get a backslash; `<`, `>`, `&`, `=`, control
/// characters and the JS line separators become `\uXXXX`, so the output
/// can never close a `<script>` element or the literal itself.
pub struct JsEscaped<'a>(pub &'a str);

impl fmt::Display for JsEscaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut start = 0;
        for (i, ch) in self.0.char_indices() {
            let escape = match ch {
                '\\' => Some(Escape::Str("\\\\")),
                '\'' => Some(Escape::Str("\\'")),
                '"' => Some(Escape::Str("\\\"")),
                '<' | '>' | '&' | '=' | '\u{2028}' | '\u{2029}' => Some(Escape::Unicode(ch)),
                c if c.is_control() => Some(Escape::Unicode(c)),
                _ => None,
            };
            if let Some(escape) = escape {
                f.write_str(&self.0[start..i])?;
                match escape {
                    Escape::Str(s) => f.write_str(s)?,
                    Escape::Unicode(c) => write!(f, "\\u{:04X}", u32::from(c))?,
                }
                start = i + ch.len_utf8();
            }
        }
        f.write_str(&self.0[start..])
    }
}

enum Escape {
    Str(&'static str),
    Unicode(char),
}

pub async fn inject(
    State(stage): State<Arc<ConfigScript>>,
    request: Request,
    next: Next,
) -> Response {
    if normalize_path(request.uri().path()) != CONFIG_SCRIPT_PATH {
        return next.run(request).await;
    }

    let mut body = String::new();
    if let Err(e) = stage.render(&mut body) {
        tracing::error!(error = %e, rendered = body.len(), "unable to render config script");
    }

    (
        [
            (header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE)),
            (header::CONTENT_TYPE, HeaderValue::from_static(JAVASCRIPT)),
        ],
        body,
    )
        .into_response()
}
