// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Command-line interface.
//!
//! Argument parsing, the `run` command, and the terminal logging macros.

/// CLI arguments.
pub mod args;

/// Terminal logging.
pub mod logging;

/// The `run` command.
pub mod run;
