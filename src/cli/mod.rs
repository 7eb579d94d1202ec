//! CLI module for sendr - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
