//! Serde data structures for the web console configuration file.
//!
//! Contains [`Config`] (the root) and [`WebConsoleConfig`], the record
//! rendered into `config.js`. All types derive `Serialize` and
//! `Deserialize` with `deny_unknown_fields` for strict parsing.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_context_root() -> String {
    "/".to_string()
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn is_default_context_root(v: &str) -> bool {
    v == "/"
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Asset build identifier. Falls back to a digest of the asset tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,

    #[serde(
        default = "default_context_root",
        skip_serializing_if = "is_default_context_root"
    )]
    pub context_root: String,

    /// Subcontext name (no leading or trailing slash) to index asset path.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subcontexts: BTreeMap<String, String>,

    pub console: WebConsoleConfig,
}

/// Runtime values handed to the browser application through `config.js`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebConsoleConfig {
    /// host:port of the master API. The scheme follows the page's scheme.
    #[serde(default)]
    pub master_addr: String,

    #[serde(default)]
    pub master_prefix: String,

    /// host:port of the secondary (Kubernetes) API.
    #[serde(default)]
    pub kubernetes_addr: String,

    #[serde(default)]
    pub kubernetes_prefix: String,

    /// OAuth2 endpoint used to request a token. Must support `response_type=token`.
    pub oauth_authorize_uri: String,

    /// Base URI of the console; must be a valid `redirect_uri` for the client.
    pub oauth_redirect_base: String,

    pub oauth_client_id: String,

    /// Where to send the browser after logout. Empty shows the built-in page.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logout_uri: String,
}

impl Config {
    #[must_use]
    pub fn subcontext_count(&self) -> usize {
        self.subcontexts.len()
    }
}
