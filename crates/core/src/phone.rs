//! Notification-target normalization.
//!
//! The SMS gateway only accepts German numbers in the `0049...` form. Policies
//! are edited by hand, so targets arrive in a few common spellings.

use crate::error::CoreError;

const INTERNATIONAL_PREFIX: &str = "0049";

/// Normalize a German phone number to the `0049...` gateway form.
///
/// | Input              | Output             |
/// |--------------------|--------------------|
/// | `01701234567`      | `00491701234567`   |
/// | `+491701234567`    | `00491701234567`   |
/// | `00491701234567`   | unchanged          |
/// | anything else      | [`CoreError::InvalidFormat`] |
pub fn normalize_phone(raw: &str) -> Result<String, CoreError> {
    let phone = raw.trim();

    if phone.starts_with(INTERNATIONAL_PREFIX) {
        return Ok(phone.to_string());
    }
    if let Some(rest) = phone.strip_prefix("+49") {
        return Ok(format!("{INTERNATIONAL_PREFIX}{rest}"));
    }
    if phone.starts_with("01") {
        // Drop the national trunk zero.
        return Ok(format!("{INTERNATIONAL_PREFIX}{}", &phone[1..]));
    }

    Err(CoreError::InvalidFormat(format!(
        "unknown phone nr format: {raw:?}"
    )))
}
