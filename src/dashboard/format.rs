// =============================================================================
// Display formatting for dashboard cells
// =============================================================================
//
// Absent values always render as `N/A`. Large currency amounts use T/B/M
// suffixes, volumes B/M/K; anything smaller is printed in full with thousands
// separators.
// =============================================================================

pub const NOT_AVAILABLE: &str = "N/A";

/// `$2.95T`, `$812.40B`, `$15.00M`, `$950,123.45`.
pub fn format_currency(value: Option<f64>) -> String {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return NOT_AVAILABLE.to_string();
    };

    if v >= 1e12 {
        format!("${:.2}T", v / 1e12)
    } else if v >= 1e9 {
        format!("${:.2}B", v / 1e9)
    } else if v >= 1e6 {
        format!("${:.2}M", v / 1e6)
    } else {
        format!("${}", with_thousands(&format!("{v:.2}")))
    }
}

/// `1.20B`, `45.67M`, `12.30K`, `999`.
pub fn format_volume(value: Option<f64>) -> String {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return NOT_AVAILABLE.to_string();
    };

    if v >= 1e9 {
        format!("{:.2}B", v / 1e9)
    } else if v >= 1e6 {
        format!("{:.2}M", v / 1e6)
    } else if v >= 1e3 {
        format!("{:.2}K", v / 1e3)
    } else {
        with_thousands(&format!("{v:.0}"))
    }
}

/// `$123.45`
pub fn format_price(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("${v:.2}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// `+1.23` / `-0.50`
pub fn format_signed(value: f64) -> String {
    if value >= 0.0 {
        format!("+{:.2}", value.abs())
    } else {
        format!("{value:.2}")
    }
}

/// `+1.23%` / `-0.50%`
pub fn format_percent(value: f64) -> String {
    format!("{}%", format_signed(value))
}

/// Plain two-decimal ratio (P/E, EPS, PEG, P/B).
pub fn format_ratio(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("{v:.2}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Fraction rendered as a percentage: `0.0125` -> `1.25%`.
pub fn format_fraction_percent(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Insert `,` separators into the integer part of a formatted number.
fn with_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}
