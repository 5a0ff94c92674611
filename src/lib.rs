//! octoauth - GitHub OAuth session flow for single-page showcase sites
//!
//! The flow is split into small pieces that depend on ports instead of
//! browser globals, so every step runs in tests or from a terminal:
//! session persistence, authorization redirect, callback handling and the
//! controller that ties them together.

pub mod auth;
pub mod config;
pub mod error;
pub mod ui;

pub use error::{Error, Result};
