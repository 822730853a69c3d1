//! # Input Validation
//!
//! Shape checks and lenient number parsing shared by the checkout and
//! inquiry flows. Form submissions arrive from browsers, so numbers may show
//! up as JSON numbers or as strings.

use serde_json::Value;

/// Basic `local@domain.tld` shape check.
///
/// Requires exactly one `@`, no whitespace, a non-empty local part, and a
/// domain ending in a dot followed by at least two ASCII letters.
pub fn is_valid_email(candidate: &str) -> bool {
    let candidate = candidate.trim();
    if candidate.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let Some((host, suffix)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && suffix.len() >= 2 && suffix.chars().all(|c| c.is_ascii_alphabetic())
}

/// Parse a JSON value as a whole number.
///
/// Accepts integers, floats without a fractional part, and strings holding
/// an integer. Anything else yields `None`.
pub fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Trimmed, non-empty string or `None`
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
