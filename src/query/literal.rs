//! Property literal typing
//!
//! Values written in property blocks and WHERE clauses are typed by their
//! text: booleans, then floats (anything containing a dot), then integers,
//! falling back to the raw string.

use crate::graph::PropertyValue;

/// Type a single literal
pub fn parse_literal(raw: &str) -> PropertyValue {
    let text = raw.trim().trim_matches('"').trim_matches('\'');

    if text.eq_ignore_ascii_case("true") {
        return PropertyValue::Boolean(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return PropertyValue::Boolean(false);
    }

    let numeric = text.trim();
    if numeric.contains('.') {
        if let Ok(f) = numeric.parse::<f64>() {
            return PropertyValue::Float(f);
        }
    } else if let Ok(i) = numeric.parse::<i64>() {
        return PropertyValue::Integer(i);
    }

    PropertyValue::String(text.to_string())
}

/// Strip one pair of matching quotes from a key
pub(crate) fn unquote(text: &str) -> &str {
    let text = text.trim();
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typing_order() {
        assert_eq!(parse_literal("true"), PropertyValue::Boolean(true));
        assert_eq!(parse_literal("FALSE"), PropertyValue::Boolean(false));
        assert_eq!(parse_literal("30"), PropertyValue::Integer(30));
        assert_eq!(parse_literal("-7"), PropertyValue::Integer(-7));
        assert_eq!(parse_literal("30.5"), PropertyValue::Float(30.5));
        assert_eq!(parse_literal("Alice"), PropertyValue::from("Alice"));
    }

    #[test]
    fn test_quotes_are_stripped_before_typing() {
        assert_eq!(parse_literal("\"Alice\""), PropertyValue::from("Alice"));
        assert_eq!(parse_literal("'Bob'"), PropertyValue::from("Bob"));
        assert_eq!(parse_literal("\"30\""), PropertyValue::Integer(30));
        assert_eq!(parse_literal("'true'"), PropertyValue::Boolean(true));
    }

    #[test]
    fn test_numeric_failures_stay_strings() {
        assert_eq!(parse_literal("1.2.3"), PropertyValue::from("1.2.3"));
        assert_eq!(parse_literal("12abc"), PropertyValue::from("12abc"));
        assert_eq!(parse_literal("1e5"), PropertyValue::from("1e5"));
        assert_eq!(parse_literal("  padded  "), PropertyValue::from("padded"));
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"name\""), "name");
        assert_eq!(unquote("'name'"), "name");
        assert_eq!(unquote("name"), "name");
        assert_eq!(unquote("\""), "\"");
    }
}
