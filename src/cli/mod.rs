//! Command-line interface
//!
//! Argument parsing and the handlers each subcommand dispatches to.

pub mod commands;
pub mod handlers;

pub use commands::{Command, Opt};
