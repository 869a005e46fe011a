//! Keygen command handler. Needs no database.

use switchyard_core::config::MASTER_KEY_ENV;
use switchyard_crypto::generate_master_key;

/// Print a fresh master key in `.env` form.
pub fn execute() {
    println!("{MASTER_KEY_ENV}={}", generate_master_key());
    eprintln!("Keep this key safe: credentials stored with it cannot be recovered without it.");
}
