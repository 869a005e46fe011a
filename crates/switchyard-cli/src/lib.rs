//! Command-line adapter for switchyard.
//!
//! `main.rs` parses arguments, [`bootstrap`] wires the `GatewayCore`, and
//! each subcommand is a thin handler in [`handlers`].

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

// Re-export primary types for convenient access
pub use bootstrap::{CliContext, bootstrap};
pub use commands::Commands;
pub use error::CliError;
pub use parser::Cli;
