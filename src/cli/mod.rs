//! CLI module for redraft - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for serving the chat API,
//! revising a single message, and running eval suites.

pub mod commands;

pub use commands::Cli;
