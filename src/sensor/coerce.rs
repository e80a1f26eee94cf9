use serde_json::Value;

/// Loosely converts a JSON field to a number.
///
/// Strings are trimmed and parsed as decimal or `0x`/`0o`/`0b` literals, an
/// empty string is `0`, booleans are `1`/`0` and `null` is `0`. Missing
/// fields, arrays and objects yield `NaN`.
pub fn to_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => parse_numeric_str(s),
        Some(Value::Array(_) | Value::Object(_)) => f64::NAN,
    }
}

/// Like [`to_number`], but only returns finite values.
pub fn finite_number(value: Option<&Value>) -> Option<f64> {
    Some(to_number(value)).filter(|v| v.is_finite())
}

fn parse_numeric_str(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }

    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = s
            .strip_prefix(prefix)
            .or_else(|| s.strip_prefix(&prefix.to_uppercase()))
        {
            return parse_radix_digits(digits, radix);
        }
    }

    // f64::from_str also accepts "inf" and "nan", which are not numeric here.
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }

    s.parse().unwrap_or(f64::NAN)
}

// Accumulates in f64 so literals wider than u64 stay finite.
fn parse_radix_digits(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }

    digits
        .chars()
        .try_fold(0.0, |acc, c| c.to_digit(radix).map(|d| acc * radix as f64 + d as f64))
        .unwrap_or(f64::NAN)
}
