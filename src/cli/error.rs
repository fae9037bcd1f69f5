// Error handling utilities for consistent error messages and exit codes

use crate::models::LeadStatus;
use std::io::{self, Write};
use std::process;

/// Exit with a user error (exit code 1)
/// User errors are for invalid input, missing resources, etc.
pub fn user_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Validate that a string is not empty
pub fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} cannot be empty", field_name))
    } else {
        Ok(())
    }
}

/// Validate that a lead ID is valid (positive integer)
pub fn validate_lead_id(id_str: &str) -> Result<i64, String> {
    id_str.parse::<i64>()
        .map_err(|_| format!("Invalid lead ID: '{}'. Lead ID must be a number.", id_str))
        .and_then(|id| {
            if id > 0 {
                Ok(id)
            } else {
                Err(format!("Invalid lead ID: {}. Lead ID must be positive.", id))
            }
        })
}

/// Validate stage key format (lowercase letters, digits, hyphens)
pub fn validate_stage_key(key: &str) -> Result<(), String> {
    if key.trim().is_empty() {
        return Err("Stage key cannot be empty".to_string());
    }

    if key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        Ok(())
    } else {
        Err(format!("Invalid stage key: '{}'. Stage keys can only contain lowercase letters, numbers, and hyphens.", key))
    }
}

/// Parse a lead status name
pub fn parse_lead_status(value: &str) -> Result<LeadStatus, String> {
    LeadStatus::from_str(&value.to_lowercase())
        .ok_or_else(|| format!("Invalid status: '{}'. Expected active, converted, or lost.", value))
}

/// Ask a yes/no question on stdout; anything but y/yes is a no
pub fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} (y/n): ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_non_empty() {
        assert!(validate_non_empty("test", "field").is_ok());
        assert!(validate_non_empty("", "field").is_err());
        assert!(validate_non_empty("   ", "field").is_err());
    }

    #[test]
    fn test_validate_lead_id() {
        assert_eq!(validate_lead_id("1"), Ok(1));
        assert_eq!(validate_lead_id("42"), Ok(42));
        assert!(validate_lead_id("0").is_err());
        assert!(validate_lead_id("-1").is_err());
        assert!(validate_lead_id("abc").is_err());
        assert!(validate_lead_id("").is_err());
    }

    #[test]
    fn test_validate_stage_key() {
        assert!(validate_stage_key("new").is_ok());
        assert!(validate_stage_key("demo-booked").is_ok());
        assert!(validate_stage_key("round2").is_ok());
        assert!(validate_stage_key("").is_err());
        assert!(validate_stage_key("Contacted").is_err());
        assert!(validate_stage_key("stage one").is_err());
    }

    #[test]
    fn test_parse_lead_status() {
        assert_eq!(parse_lead_status("Lost"), Ok(LeadStatus::Lost));
        assert!(parse_lead_status("pending").is_err());
    }
}
