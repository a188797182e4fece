// Parsing and formatting helpers.
//
// Spreadsheet exports write loss ratios as "3,5", "3.5" or "3,5%", so all
// numeric cleanup lives here and the classifier only ever sees `f64`.
use num_format::{Locale, ToFormattedString};

/// Parse a loss-ratio cell into `f64`.
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace and a trailing `%`.
/// - Rejects values that contain alphabetic characters (so `"nan"` and
///   `"inf"` do not sneak through `str::parse`).
/// - Treats `,` as the decimal separator and normalizes it to `.`.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_ratio(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    let s = s.strip_suffix('%').unwrap_or(s).trim_end();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    let s = s.replace(',', ".");
    s.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Share of `part` in `whole` as a percentage; 0 when `whole` is 0.
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
