//! Syntactic coercion of user-supplied field values.
//!
//! Free-form field lists arrive as strings; the remote store types its
//! fields. Coercion is purely syntactic: a string shaped like an integer
//! becomes a JSON integer, one shaped like a plain decimal becomes a
//! double, everything else stays a string. No locale-aware or
//! exponential-notation parsing.

use serde_json::Value;

/// Coerce a raw string value into a typed JSON value.
///
/// Rules, in order:
/// 1. optional-sign digits → integer
/// 2. `-?digits.digits` → double
/// 3. anything else → the original string, unchanged
///
/// An integer-shaped string that overflows `i64` falls back to the string
/// variant; the remote store's own typing rules reject it with an
/// explainable failure instead of us truncating.
#[must_use]
pub fn coerce_field_value(raw: &str) -> Value {
    if is_integer_shaped(raw) {
        if let Ok(n) = raw.parse::<i64>() {
            return Value::from(n);
        }
        return Value::from(raw);
    }

    if is_decimal_shaped(raw) {
        if let Ok(d) = raw.parse::<f64>() {
            return Value::from(d);
        }
    }

    Value::from(raw)
}

/// Entire string is an optional sign followed by one or more digits.
fn is_integer_shaped(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Entire string is `-?digits.digits`: exactly one dot, digits on both sides.
fn is_decimal_shaped(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let Some((whole, frac)) = unsigned.split_once('.') else {
        return false;
    };
    !whole.is_empty()
        && !frac.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}
