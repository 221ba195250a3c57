//! Number conversions with browser semantics.
//!
//! Attribute coercion has to agree with what a JavaScript client would
//! produce for the same JSON, so `"5"` parses to `5`, `"djkjkj"` to `NaN`,
//! and `34.0` formats as `"34"`.

/// Parses a string the way `Number(s)` does.
///
/// Surrounding whitespace is ignored, an empty string is `0`, `0x`/`0o`/`0b`
/// prefixes are honoured and anything unparseable is `NaN`.
#[must_use]
pub fn parse_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }

    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    if let Some(n) = parse_radix(t) {
        return n;
    }

    // Rust accepts "inf" and "nan" spellings that JavaScript rejects.
    if t
        .chars()
        .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
    {
        return f64::NAN;
    }

    t.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_radix(t: &str) -> Option<f64> {
    let (radix, digits) = match t.get(..2)? {
        "0x" | "0X" => (16, &t[2..]),
        "0o" | "0O" => (8, &t[2..]),
        "0b" | "0B" => (2, &t[2..]),
        _ => return None,
    };
    Some(
        u64::from_str_radix(digits, radix)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN),
    )
}

/// Formats a number the way `String(n)` does for the common range.
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        // Covers negative zero.
        return "0".to_string();
    }
    format!("{n}")
}

/// Truthiness of a number: everything except `0` and `NaN`.
#[must_use]
pub fn is_truthy(n: f64) -> bool {
    n != 0.0 && !n.is_nan()
}

/// Returns the number as an `i64` when it is integral and exactly representable.
#[must_use]
pub fn as_integer(n: f64) -> Option<i64> {
    const LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= LIMIT {
        Some(n as i64)
    } else {
        None
    }
}

/// Strict parse used by callers that want an error instead of `NaN`.
pub fn parse_number_strict(s: &str) -> crate::Result<f64> {
    let n = parse_number(s);
    if n.is_nan() && s.trim() != "NaN" {
        Err(crate::Error::InvalidNumber(s.to_string()))
    } else {
        Ok(n)
    }
}
