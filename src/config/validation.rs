//! Configuration validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`Config`] for structural
//! errors: a context root without surrounding slashes, subcontext names
//! or index paths with stray slashes, and malformed OAuth or logout URLs.
//! Returns a list of [`ValidationError`] values with per-field suggestions.

use url::Url;

use super::model::Config;
use crate::error::ValidationError;

/// Validate the context root. Returns `Ok(())` or a human-readable error.
pub fn validate_context_root(root: &str) -> Result<(), String> {
    if !root.starts_with('/') {
        return Err("context root must start with '/'".into());
    }
    if !root.ends_with('/') {
        return Err("context root must end with '/'".into());
    }
    Ok(())
}

/// Validate a subcontext name. The empty name is allowed and mounts the root.
pub fn validate_subcontext(name: &str) -> Result<(), String> {
    if name.starts_with('/') || name.ends_with('/') {
        return Err(format!(
            "subcontext '{name}' must not start or end with '/'"
        ));
    }
    Ok(())
}

/// Validate an absolute http(s) URL. Returns `Ok(())` or a human-readable error.
pub fn validate_http_url(url: &str) -> Result<(), String> {
    match Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            if scheme != "http" && scheme != "https" {
                Err(format!(
                    "unsupported scheme '{scheme}' (expected http or https)"
                ))
            } else {
                Ok(())
            }
        }
        Err(_) => Err(format!("'{url}' is not a valid absolute URL")),
    }
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(ref version) = config.version {
        if version.trim().is_empty() {
            errors.push(ValidationError {
                field: "version".into(),
                message: "version cannot be empty when set".into(),
                suggestion: Some("remove it to derive the version from the assets".into()),
            });
        }
    }

    if let Err(msg) = validate_context_root(&config.context_root) {
        let root = config.context_root.trim_matches('/');
        errors.push(ValidationError {
            field: "context_root".into(),
            message: msg,
            suggestion: Some(if root.is_empty() {
                "did you mean '/'?".to_string()
            } else {
                format!("did you mean '/{root}/'?")
            }),
        });
    }

    for (name, index) in &config.subcontexts {
        if let Err(msg) = validate_subcontext(name) {
            errors.push(ValidationError {
                field: format!("subcontexts.{name}"),
                message: msg,
                suggestion: Some(format!("did you mean '{}'?", name.trim_matches('/'))),
            });
        }
        if index.is_empty() {
            errors.push(ValidationError {
                field: format!("subcontexts.{name}"),
                message: "index asset path cannot be empty".into(),
                suggestion: None,
            });
        } else if index.starts_with('/') {
            errors.push(ValidationError {
                field: format!("subcontexts.{name}"),
                message: format!("index asset path '{index}' must not start with '/'"),
                suggestion: Some(format!("did you mean '{}'?", index.trim_start_matches('/'))),
            });
        }
    }

    let console = &config.console;
    for (field, value) in [
        ("console.oauth_authorize_uri", &console.oauth_authorize_uri),
        ("console.oauth_redirect_base", &console.oauth_redirect_base),
    ] {
        if let Err(msg) = validate_http_url(value) {
            errors.push(ValidationError {
                field: field.into(),
                message: msg,
                suggestion: None,
            });
        }
    }

    if console.oauth_client_id.is_empty() {
        errors.push(ValidationError {
            field: "console.oauth_client_id".into(),
            message: "OAuth client id cannot be empty".into(),
            suggestion: None,
        });
    }

    if !console.logout_uri.is_empty() {
        if let Err(msg) = validate_http_url(&console.logout_uri) {
            errors.push(ValidationError {
                field: "console.logout_uri".into(),
                message: msg,
                suggestion: Some("leave it empty to use the built-in logout page".into()),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[must_use]
pub fn format_validation_report(path: &str, config: &Config) -> String {
    let mut lines = vec![format!(
        "  context root {}, {} subcontexts\n",
        config.context_root,
        config.subcontext_count()
    )];

    lines.push(format!("  assets:  {}", config.assets_dir.display()));
    lines.push(format!(
        "  version: {}",
        config.version.as_deref().unwrap_or("(asset digest)")
    ));
    for (name, index) in &config.subcontexts {
        let mount = if name.is_empty() { "(root)" } else { name.as_str() };
        lines.push(format!("  {mount}  -> {index}"));
    }

    format!("{} is valid\n{}", path, lines.join("\n"))
}
