//! Free-text price parsing.

/// Parse a retailer price string into whole currency units.
///
/// Everything except digits, commas and periods is dropped, commas are
/// treated as thousands separators, and the leading decimal number of what
/// remains is rounded to the nearest integer.
///
/// ```
/// use compare_core::parse_price;
///
/// assert_eq!(parse_price(Some("₹1,299.50")), Some(1300));
/// assert_eq!(parse_price(Some("free")), None);
/// assert_eq!(parse_price(None), None);
/// ```
pub fn parse_price(raw: Option<&str>) -> Option<u64> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }

    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let number = leading_decimal(&cleaned)?;
    let value: f64 = number.parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    Some(value.round() as u64)
}

/// Longest prefix of the form `digits[.digits]` (a bare leading period is
/// allowed), or `None` when it holds no digit.
fn leading_decimal(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }

    seen_digit.then(|| &s[..end])
}
