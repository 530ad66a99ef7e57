//! Parsing of user-entered numeric text
//!
//! Values typed into an entry field (or passed on the command line as text)
//! are validated here before they reach the gateway or the analytics engine.
//! Surrounding whitespace is ignored; anything else that does not parse is an
//! [`Error::InvalidInput`], never a silent default.

use crate::error::{Error, Result};

/// Parse a finite decimal number.
pub fn parse_decimal(field: &str, text: &str) -> Result<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_input(format!("{field} is required")));
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| Error::invalid_input(format!("{field} must be a number, got '{trimmed}'")))?;

    if !value.is_finite() {
        return Err(Error::invalid_input(format!(
            "{field} must be a finite number, got '{trimmed}'"
        )));
    }

    Ok(value)
}

/// Parse a whole number of calendar days.
pub fn parse_days(field: &str, text: &str) -> Result<u32> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_input(format!("{field} is required")));
    }

    trimmed.parse().map_err(|_| {
        Error::invalid_input(format!(
            "{field} must be a whole number of days, got '{trimmed}'"
        ))
    })
}

/// Parse a TCP port.
pub fn parse_port(text: &str) -> Result<u16> {
    let trimmed = text.trim();
    match trimmed.parse::<u16>() {
        Ok(0) | Err(_) => Err(Error::invalid_input(format!(
            "port must be an integer between 1 and 65535, got '{trimmed}'"
        ))),
        Ok(port) => Ok(port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_decimal_accepts_padded_text() {
        assert_eq!(parse_decimal("spot", " 187.25").unwrap(), 187.25);
        assert_eq!(parse_decimal("iv", "42\n").unwrap(), 42.0);
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        assert_matches!(parse_decimal("spot", "abc"), Err(Error::InvalidInput(msg)) if msg.contains("spot"));
        assert_matches!(parse_decimal("spot", ""), Err(Error::InvalidInput(_)));
        assert_matches!(parse_decimal("spot", "NaN"), Err(Error::InvalidInput(_)));
        assert_matches!(parse_decimal("spot", "inf"), Err(Error::InvalidInput(_)));
    }

    #[test]
    fn test_parse_days() {
        assert_eq!(parse_days("days", "30").unwrap(), 30);
        assert_matches!(parse_days("days", "2.5"), Err(Error::InvalidInput(_)));
        assert_matches!(parse_days("days", "-1"), Err(Error::InvalidInput(_)));
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("7497").unwrap(), 7497);
        assert_matches!(parse_port("0"), Err(Error::InvalidInput(_)));
        assert_matches!(parse_port("70000"), Err(Error::InvalidInput(_)));
        assert_matches!(parse_port("tws"), Err(Error::InvalidInput(_)));
    }
}
