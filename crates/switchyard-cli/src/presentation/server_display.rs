//! Labels for server state in terminal output.

use serde::Serialize;

use switchyard_core::{Readiness, ServerStatus};

/// One-character marker for the list table.
pub const fn status_symbol(status: ServerStatus) -> &'static str {
    match status {
        ServerStatus::Active => "●",
        ServerStatus::Inactive => "○",
        ServerStatus::Error => "!",
    }
}

pub const fn readiness_label(readiness: Readiness) -> &'static str {
    match readiness {
        Readiness::Ready => "ready",
        Readiness::NeedsCredentials => "needs credentials",
        Readiness::Blocked => "blocked",
    }
}

/// Pretty-print any serializable value on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_status_has_a_distinct_symbol() {
        let symbols = [
            status_symbol(ServerStatus::Active),
            status_symbol(ServerStatus::Inactive),
            status_symbol(ServerStatus::Error),
        ];
        assert_ne!(symbols[0], symbols[1]);
        assert_ne!(symbols[1], symbols[2]);
        assert_ne!(symbols[0], symbols[2]);
    }

    #[test]
    fn test_readiness_labels_are_human_readable() {
        assert_eq!(readiness_label(Readiness::NeedsCredentials), "needs credentials");
    }
}
