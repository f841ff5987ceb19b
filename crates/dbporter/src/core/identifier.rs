//! Identifier validation and quoting.
//!
//! SQL identifiers (table, column and constraint names) cannot be bound as
//! statement parameters, so every name that ends up in generated SQL is
//! wrapped in the dialect's quote character with embedded quotes doubled.
//! Values and default expressions are not passed through here.

use crate::error::{MigrateError, Result};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - SQL Server: 128 characters
/// - MySQL: 64 characters
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier supplied by a caller.
///
/// Rejects empty names, names containing null bytes, and names longer than
/// [`MAX_IDENTIFIER_LENGTH`] bytes.
///
/// # Errors
///
/// Returns `MigrateError::Config` for invalid identifiers with a descriptive message.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::Config("Identifier cannot be empty".to_string()));
    }

    if name.contains('\0') {
        return Err(MigrateError::Config(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Wrap `name` in `quote` and double any embedded `quote`.
///
/// ```
/// use dbporter::core::identifier::quote_with;
///
/// assert_eq!(quote_with("users", '"'), "\"users\"");
/// assert_eq!(quote_with("we\"ird", '"'), "\"we\"\"ird\"");
/// assert_eq!(quote_with("order`s", '`'), "`order``s`");
/// ```
pub fn quote_with(name: &str, quote: char) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push(quote);
    for ch in name.chars() {
        if ch == quote {
            out.push(quote);
        }
        out.push(ch);
    }
    out.push(quote);
    out
}

/// Reverse [`quote_with`].
///
/// Returns `None` when `quoted` is not a well-formed quoted identifier: not
/// wrapped in `quote`, or containing an undoubled `quote` inside.
pub fn unquote_with(quoted: &str, quote: char) -> Option<String> {
    let inner = quoted.strip_prefix(quote)?.strip_suffix(quote)?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == quote && chars.next() != Some(quote) {
            return None;
        }
        out.push(ch);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("bad\0name").is_err());
        assert!(validate_identifier(&"x".repeat(129)).is_err());
        assert!(validate_identifier(&"x".repeat(128)).is_ok());
    }

    #[test]
    fn test_quote_with_doubles_embedded_quote() {
        assert_eq!(quote_with("table\"name", '"'), "\"table\"\"name\"");
        assert_eq!(quote_with("\"", '"'), "\"\"\"\"");
        assert_eq!(quote_with("Users", '"'), "\"Users\"");
    }

    #[test]
    fn test_quote_round_trip() {
        for name in ["plain", "with space", "a\"b", "\"\"", "select", "Ünïcödé\"x"] {
            let quoted = quote_with(name, '"');
            assert_eq!(unquote_with(&quoted, '"').as_deref(), Some(name));
        }
    }

    #[test]
    fn test_unquote_rejects_malformed() {
        assert_eq!(unquote_with("users", '"'), None);
        assert_eq!(unquote_with("\"a\"b\"", '"'), None);
        assert_eq!(unquote_with("\"", '"'), None);
    }
}
