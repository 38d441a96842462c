//! Webconsole serves a single-page web console from a directory of static
//! assets.
//!
//! Every asset request runs through a four-stage middleware pipeline:
//! gzip compression, weak-ETag cache validation, dynamic `config.js`
//! rendering, and subcontext index fallback for client-side routes.
//!
//! # Architecture
//!
//! - [`assets`] -- The [`AssetStore`](assets::AssetStore) trait, an in-memory
//!   and a directory-backed store, and the terminal asset handler.
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, init, validate, health).
//! - [`config`] -- Configuration loading, discovery, and validation.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`health`] -- `GET /health` endpoint handler returning runtime diagnostics.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`middleware`] -- The four pipeline stages and their assembly.
//! - [`server`] -- Axum server setup, shared application state, and graceful
//!   shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |
//! | `file-backends` | All file format backends |
//! | `full` | All features |

// Binary crate: public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod assets;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod server;
