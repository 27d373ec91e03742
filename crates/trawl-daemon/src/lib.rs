//! Trawl daemon library.
//!
//! Configuration loading and the axum HTTP surface, shared by the
//! `trawl-daemon` binary and its tests.

pub mod config;
pub mod error;
pub mod server;

pub use config::{ServerConfig, TrawlConfig};
pub use error::{DaemonError, Result};
pub use server::{AppState, DOWNLOADS_PATH, router, serve};
