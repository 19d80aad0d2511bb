// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! CLI module for running gesture recognition.
//!
//! This module contains the command-line interface logic, including argument parsing,
//! the `recognize` and `inspect` commands, and the logging macros used across the crate.

// Modules
/// CLI arguments.
pub mod args;

/// Console logging macros and verbosity control.
pub mod logging;

/// Recognition and inspection commands.
pub mod recognize;
