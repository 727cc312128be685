//! Amount parsing for the locale-formatted strings DART puts in its term columns
//! (`"12,345,678,000"`, `"-1,234"`, `""`, `"-"`).

/// Parse a reported amount. Never fails: blank, dash-only or unparsable input is `0.0`.
pub fn parse_amount(raw: Option<&str>) -> f64 {
    parse_reported_amount(raw).unwrap_or(0.0)
}

/// Like [`parse_amount`] but distinguishes "nothing reported" (`None`) from a real zero.
///
/// Accepts thousands separators, surrounding or embedded whitespace, full-width minus signs
/// and accounting-style parentheses for negatives (`"(1,234)"`).
pub fn parse_reported_amount(raw: Option<&str>) -> Option<f64> {
    let raw = raw?;
    let mut cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .map(|c| match c {
            '－' | '−' => '-',
            other => other,
        })
        .collect();

    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }

    let mut negate = false;
    if cleaned.starts_with('(') && cleaned.ends_with(')') && cleaned.len() > 2 {
        cleaned = cleaned[1..cleaned.len() - 1].to_string();
        negate = true;
    }

    let value = cleaned.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(if negate { -value } else { value })
}
