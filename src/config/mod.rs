//! Configuration loading and validation.
//!
//! [`load`] reads a config file, picks the deserializer from its
//! extension via [`parse_config_str`], and runs [`validation::validate`]
//! over the result. [`discover`] looks for a conventionally named file
//! in the working directory when no path is given.

pub mod model;
pub mod validation;

use std::path::{Path, PathBuf};

use crate::error::WebConsoleError;
use model::Config;

/// File names probed, in order, when `--config` is not given.
pub const CANDIDATES: &[&str] = &[
    "webconsole.yaml",
    "webconsole.yml",
    "webconsole.json",
    "webconsole.toml",
];

/// Parse a config string based on file extension.
pub fn parse_config_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<Config, WebConsoleError> {
    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => serde_yml::from_str(content).map_err(|e| WebConsoleError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        #[cfg(feature = "json")]
        "json" => serde_json::from_str(content).map_err(|e| WebConsoleError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        #[cfg(feature = "toml")]
        "toml" => toml::from_str(content).map_err(|e| WebConsoleError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        other => Err(WebConsoleError::UnsupportedFormat(other.to_string())),
    }
}

/// Read, parse, and validate the config file at `path`.
pub async fn load(path: &Path) -> Result<Config, WebConsoleError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            WebConsoleError::ConfigFileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            WebConsoleError::Io(e)
        }
    })?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let config = parse_config_str(ext, &content, &path.display().to_string())?;

    if let Err(errors) = validation::validate(&config) {
        return Err(WebConsoleError::ConfigValidation { errors });
    }

    Ok(config)
}

/// Resolve the config path: an explicit path wins, otherwise the first
/// existing [`CANDIDATES`] entry in the working directory.
pub async fn discover(explicit: Option<&Path>) -> Result<PathBuf, WebConsoleError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    for name in CANDIDATES {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected config file");
            return Ok(path);
        }
    }

    Err(WebConsoleError::NoConfigSource {
        hint: "Provide --config <file>.\n  \
               Run 'webconsole init' to create a config file."
            .into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_is_rejected() {
        let err = parse_config_str("xml", "<x/>", "webconsole.xml").unwrap_err();
        assert!(matches!(err, WebConsoleError::UnsupportedFormat(ext) if ext == "xml"));
    }

    #[tokio::test]
    async fn missing_file_reports_path() {
        let err = load(Path::new("does-not-exist.yaml")).await.unwrap_err();
        assert!(matches!(err, WebConsoleError::ConfigFileNotFound { .. }));
    }

    #[tokio::test]
    async fn explicit_path_is_used_verbatim() {
        let path = discover(Some(Path::new("custom/console.toml")))
            .await
            .unwrap();
        assert_eq!(path, PathBuf::from("custom/console.toml"));
    }
}
