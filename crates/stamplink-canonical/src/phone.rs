//! Phone numbers as the ledger stores them: digits only, country code first,
//! no `+` sign (e.g. `6287783235189`).

use crate::validation::ValidationError;

const DEFAULT_COUNTRY_CODE: &str = "62";

/// Country codes that are left untouched when a number is normalized for login.
const KNOWN_COUNTRY_PREFIXES: [&str; 3] = ["62", "1", "44"];

fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalizes a phone number typed at login so it matches the stored form.
///
/// A leading `0` becomes the default country code. A number of at least eight
/// digits without a recognized country prefix gets the default code prepended.
pub fn normalize_login(raw: &str) -> Result<String, ValidationError> {
    let mut digits = digits_only(raw);
    if digits.is_empty() {
        return Err(ValidationError::Empty { field: "phone" });
    }

    if let Some(rest) = digits.strip_prefix('0') {
        digits = format!("{DEFAULT_COUNTRY_CODE}{rest}");
    }

    let has_prefix = KNOWN_COUNTRY_PREFIXES
        .iter()
        .any(|prefix| digits.starts_with(prefix));
    if !has_prefix && digits.len() >= 8 {
        digits = format!("{DEFAULT_COUNTRY_CODE}{digits}");
    }

    Ok(digits)
}

/// Standardizes a phone number before registration.
///
/// Numbers of ten or more digits are assumed to already carry a country code.
pub fn standardize_registration(raw: &str) -> Result<String, ValidationError> {
    let digits = digits_only(raw);
    if digits.is_empty() {
        return Err(ValidationError::Empty { field: "phone" });
    }

    if let Some(rest) = digits.strip_prefix('0') {
        return Ok(format!("{DEFAULT_COUNTRY_CODE}{rest}"));
    }
    if digits.len() >= 10 {
        return Ok(digits);
    }
    if digits.len() >= 8 {
        return Ok(format!("{DEFAULT_COUNTRY_CODE}{digits}"));
    }
    Ok(digits)
}
