//! Table formatting utilities for CLI output.

/// Truncates a string to a maximum number of characters, adding "..." if needed.
///
/// # Examples
///
/// ```rust
/// use switchyard_cli::presentation::truncate_string;
///
/// assert_eq!(truncate_string("github", 10), "github");
/// assert_eq!(truncate_string("sequential-thinking", 10), "sequent...");
/// ```
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Print a horizontal separator line.
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

/// Format an optional value for table display, returning a default if None.
pub fn format_optional<T: std::fmt::Display>(value: Option<&T>, default: &str) -> String {
    value.map_or_else(|| default.to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string_no_truncation_needed() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("exactly10c", 10), "exactly10c");
    }

    #[test]
    fn test_truncate_string_counts_characters() {
        assert_eq!(truncate_string("ümlaut-server", 7), "ümla...");
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some(&3), "--"), "3");
        assert_eq!(format_optional::<u8>(None, "--"), "--");
    }
}
