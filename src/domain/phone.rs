use crate::error::ValidationError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Country calling code every outgoing number is rewritten to.
pub const COUNTRY_PREFIX: &str = "254";

static CANONICAL_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^254[17][0-9]{8}$").expect("Invalid phone regex"));

/// Rewrites a user-entered phone number to `254XXXXXXXXX`.
///
/// Rules apply in order and the first match wins:
/// 1. strip everything that is not a digit
/// 2. already prefixed with `254`: keep
/// 3. trunk prefix `0` with 10 digits: swap the `0` for `254`
/// 4. 9 digits: prepend `254`
///
/// Anything else comes back as the original input so that
/// [`NormalizedPhone::parse`] rejects it.
pub fn normalize(input: &str) -> String {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();

    if digits.starts_with(COUNTRY_PREFIX) {
        digits
    } else if digits.len() == 10 && digits.starts_with('0') {
        format!("{COUNTRY_PREFIX}{}", &digits[1..])
    } else if digits.len() == 9 {
        format!("{COUNTRY_PREFIX}{digits}")
    } else {
        input.to_string()
    }
}

/// A phone number in the single wire format the payments API accepts:
/// `254`, a carrier digit (`1` or `7`), then eight digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedPhone(String);

impl NormalizedPhone {
    /// Normalizes `input` and checks the result against the wire format.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let candidate = normalize(input);
        if CANONICAL_PHONE.is_match(&candidate) {
            Ok(Self(candidate))
        } else {
            Err(ValidationError::InvalidPhone)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedPhone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedPhone {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
