//! Shared CLI presentation utilities.
//!
//! Format-only helpers; no domain decisions are made here.

pub mod server_display;
pub mod tables;

pub use server_display::{print_json, readiness_label, status_symbol};
pub use tables::{format_optional, print_separator, truncate_string};
