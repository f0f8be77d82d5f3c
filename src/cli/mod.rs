//! CLI module for scaffoldr - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
