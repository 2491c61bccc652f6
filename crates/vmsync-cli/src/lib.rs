//! # vmsync-cli
//!
//! The `vmsync` command line: configuration loading, tracing setup, one module per
//! subcommand and the terminal renderers.

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod observability;
pub mod output;
