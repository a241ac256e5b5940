use regex::Regex;
use std::sync::LazyLock;

use crate::constants::LANDLINE_AREA_CODES;

static NON_DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9]").expect("valid regex"));
static MANUAL_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,;\r\n]+").expect("valid regex"));

/// Strips everything that is not an ASCII digit. Digit order and count are
/// preserved.
pub fn format_number(raw: &str) -> String {
    NON_DIGIT.replace_all(raw, "").into_owned()
}

/// Landline guess from the first three digits. Anything shorter than ten
/// characters is never a landline.
pub fn is_landline(num: &str) -> bool {
    if num.len() < 10 {
        return false;
    }
    let Some(area_code) = num.get(..3) else {
        return false;
    };
    LANDLINE_AREA_CODES.contains(&area_code)
}

/// Splits free-form input the way the composer accepts it: one number per
/// comma, semicolon or line.
pub fn split_manual_input(text: &str) -> Vec<&str> {
    MANUAL_DELIMITER
        .split(text)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}
