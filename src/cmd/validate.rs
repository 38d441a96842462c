//! `webconsole validate`: check a configuration file without serving.
//!
//! Builds a [`Report`] for the file and prints it as text or JSON. Besides
//! the structural checks in [`validation`], the report warns about an
//! asset directory or subcontext index that is not on disk yet; those
//! are only warnings because assets are often built after the config is
//! written.

use std::path::Path;

use serde::Serialize;

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::model::Config;
use crate::config::{parse_config_str, validation};
use crate::error::{ValidationError, WebConsoleError};

/// Outcome of checking one config file.
#[derive(Debug, Serialize)]
pub struct Report {
    pub file: String,
    pub valid: bool,
    pub context_root: String,
    pub subcontexts: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip)]
    summary: String,
}

pub fn execute(args: &ValidateArgs) -> Result<(), WebConsoleError> {
    let report = inspect(&args.config)?;

    match args.format {
        ValidateFormat::Text => print_text(&report),
        ValidateFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report)
                .map_err(|e| WebConsoleError::Io(std::io::Error::other(e)))?
        ),
    }

    if report.valid {
        Ok(())
    } else {
        Err(WebConsoleError::ConfigValidation {
            errors: report.errors,
        })
    }
}

/// Read, parse, and check the config at `path`.
///
/// Parse failures are errors; validation failures are reported.
pub fn inspect(path: &Path) -> Result<Report, WebConsoleError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            WebConsoleError::ConfigFileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            WebConsoleError::Io(e)
        }
    })?;

    let file = path.display().to_string();
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let config = parse_config_str(ext, &content, &file)?;

    let errors = validation::validate(&config).err().unwrap_or_default();
    let warnings = asset_warnings(&config, path.parent().unwrap_or(Path::new("")));
    let summary = validation::format_validation_report(&file, &config);

    Ok(Report {
        valid: errors.is_empty(),
        context_root: config.context_root.clone(),
        subcontexts: config.subcontext_count(),
        file,
        errors,
        warnings,
        summary,
    })
}

/// Missing asset files, resolved the way `run` would from the config's
/// directory when `assets_dir` is relative.
fn asset_warnings(config: &Config, base: &Path) -> Vec<String> {
    let dir = base.join(&config.assets_dir);
    if !dir.is_dir() {
        return vec![format!(
            "assets_dir {} does not exist; build the console first",
            dir.display()
        )];
    }

    config
        .subcontexts
        .iter()
        .filter(|(_, index)| !dir.join(index.as_str()).is_file())
        .map(|(name, index)| {
            let mount = if name.is_empty() { "(root)" } else { name.as_str() };
            format!("subcontext {mount}: index {index} not found under {}", dir.display())
        })
        .collect()
}

fn print_text(report: &Report) {
    if report.valid {
        println!("\u{2713} {}", report.summary);
    } else {
        eprintln!(
            "\u{2717} {} has {} error{}\n",
            report.file,
            report.errors.len(),
            if report.errors.len() == 1 { "" } else { "s" }
        );
        for error in &report.errors {
            eprintln!("{error}");
        }
    }
    for warning in &report.warnings {
        eprintln!("  warning: {warning}");
    }
}

#[cfg(all(test, feature = "yaml"))]
mod tests {
    use super::*;

    const VALID: &str = r#"
assets_dir: dist
subcontexts:
  "": index.html
  java: java/index.html
console:
  oauth_authorize_uri: https://localhost:8443/oauth/authorize
  oauth_redirect_base: https://localhost:8443/console
  oauth_client_id: openshift-web-console
"#;

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn valid_config_with_assets_has_no_findings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "webconsole.yaml", VALID);
        write(dir.path(), "dist/index.html", "<html></html>");
        write(dir.path(), "dist/java/index.html", "<html></html>");

        let report = inspect(&path).unwrap();
        assert!(report.valid);
        assert_eq!(report.subcontexts, 2);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn missing_index_is_a_warning_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "webconsole.yaml", VALID);
        write(dir.path(), "dist/index.html", "<html></html>");

        let report = inspect(&path).unwrap();
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("java/index.html"));
    }

    #[test]
    fn missing_assets_dir_is_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "webconsole.yaml", VALID);
        let report = inspect(&path).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("does not exist"));
    }

    #[test]
    fn invalid_config_lists_errors_in_json() {
        let dir = tempfile::tempdir().unwrap();
        let bad = VALID.replace("assets_dir: dist", "assets_dir: dist\ncontext_root: console");
        let path = write(dir.path(), "webconsole.yaml", &bad);

        let report = inspect(&path).unwrap();
        assert!(!report.valid);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["errors"][0]["field"], "context_root");
        assert_eq!(json["errors"][0]["suggestion"], "did you mean '/console/'?");
        assert!(json.get("summary").is_none());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = inspect(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, WebConsoleError::ConfigFileNotFound { .. }));
    }
}
