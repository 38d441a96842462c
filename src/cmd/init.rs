//! `webconsole init`: generate a starter configuration file.
//!
//! Builds a [`Config`] with placeholder values, serializes it in the
//! requested format, and writes it next to the working directory. An
//! existing file is never overwritten.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::cli::{ConfigFormat, InitArgs};
use crate::config::model::{Config, WebConsoleConfig};
use crate::error::WebConsoleError;

const MASTER: &str = "localhost:8443";

pub fn execute(args: &InitArgs) -> Result<(), WebConsoleError> {
    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("webconsole.{}", args.format.extension())));

    if path.exists() {
        return Err(WebConsoleError::FileExists { path });
    }

    let config = starter_config(args.full);
    let content = serialize_config(&config, &args.format)?;
    std::fs::write(&path, content)?;

    println!("\u{2713} Created {}", path.display());
    println!("\n  Next steps:");
    println!("    1. Point the oauth_* values at your authorization server");
    println!("    2. Validate:  webconsole validate {}", path.display());
    println!("    3. Run:       webconsole run -c {}", path.display());

    Ok(())
}

/// Placeholder configuration. `full` also sets the optional fields.
#[must_use]
pub fn starter_config(full: bool) -> Config {
    let mut console = WebConsoleConfig {
        master_addr: MASTER.to_string(),
        master_prefix: "/oapi".to_string(),
        kubernetes_addr: MASTER.to_string(),
        kubernetes_prefix: "/api".to_string(),
        oauth_authorize_uri: format!("https://{MASTER}/oauth/authorize"),
        oauth_redirect_base: format!("https://{MASTER}/console"),
        oauth_client_id: "openshift-web-console".to_string(),
        logout_uri: String::new(),
    };

    if !full {
        return Config {
            version: None,
            assets_dir: PathBuf::from("dist"),
            context_root: "/".to_string(),
            subcontexts: BTreeMap::from([(String::new(), "index.html".to_string())]),
            console,
        };
    }

    console.logout_uri = format!("https://{MASTER}/logout");
    Config {
        version: Some("dev".to_string()),
        assets_dir: PathBuf::from("dist"),
        context_root: "/console/".to_string(),
        subcontexts: BTreeMap::from([
            (String::new(), "index.html".to_string()),
            ("java".to_string(), "java/index.html".to_string()),
        ]),
        console,
    }
}

/// Serialize a `Config` to a formatted string in the given format.
pub fn serialize_config(config: &Config, format: &ConfigFormat) -> Result<String, WebConsoleError> {
    match format {
        #[cfg(feature = "yaml")]
        ConfigFormat::Yaml => serde_yml::to_string(config)
            .map_err(|e| WebConsoleError::Io(std::io::Error::other(e.to_string()))),

        #[cfg(not(feature = "yaml"))]
        ConfigFormat::Yaml => Err(WebConsoleError::UnsupportedFormat("yaml".into())),

        ConfigFormat::Json => serde_json::to_string_pretty(config)
            .map_err(|e| WebConsoleError::Io(std::io::Error::other(e.to_string()))),

        #[cfg(feature = "toml")]
        ConfigFormat::Toml => toml::to_string_pretty(config)
            .map_err(|e| WebConsoleError::Io(std::io::Error::other(e.to_string()))),

        #[cfg(not(feature = "toml"))]
        ConfigFormat::Toml => Err(WebConsoleError::UnsupportedFormat("toml".into())),
    }
}
