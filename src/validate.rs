//! Input normalization. Every function is total: `None` means the value was
//! missing or unacceptable, `Some` carries the normalized value.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::storage::RECORD_ID_LEN;

const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(
        r"^[-!#$%&'*+/0-9=?A-Z^_a-z{|}~](\.?[-!#$%&'*+/0-9=?A-Z^_a-z`{|}~])*@[a-zA-Z0-9](-*\.?[a-zA-Z0-9])*\.[a-zA-Z](-?[a-zA-Z0-9])+$"
    )
    .expect("email pattern compiles");
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn name(raw: Option<&str>) -> Option<String> {
    non_empty(raw)
}

pub fn street_address(raw: Option<&str>) -> Option<String> {
    non_empty(raw)
}

/// Case is preserved: `A@b.com` and `a@b.com` are different users.
pub fn email(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    EMAIL_RE.is_match(trimmed).then(|| trimmed.to_string())
}

pub fn password(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    let strong = trimmed.chars().count() > 8
        && trimmed.chars().any(|c| c.is_ascii_lowercase())
        && trimmed.chars().any(|c| c.is_ascii_uppercase())
        && trimmed.chars().any(|c| PASSWORD_SPECIALS.contains(c));
    strong.then(|| trimmed.to_string())
}

/// Token and cart ids.
pub fn fixed_id(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    (trimmed.chars().count() == RECORD_ID_LEN).then(|| trimmed.to_string())
}

/// Non-negative whole number; `2` and `2.0` both count, `2.5` does not.
fn whole_number(raw: &Value) -> Option<u64> {
    if let Some(n) = raw.as_u64() {
        return Some(n);
    }
    let f = raw.as_f64()?;
    (f.fract() == 0.0 && f >= 0.0 && f < u64::MAX as f64).then_some(f as u64)
}

/// Menu position.
pub fn item_id(raw: Option<&Value>) -> Option<u64> {
    whole_number(raw?)
}

pub fn quantity(raw: Option<&Value>) -> Option<u32> {
    whole_number(raw?)
        .filter(|q| *q > 0)
        .and_then(|q| u32::try_from(q).ok())
}

/// Only a literal JSON `true` counts.
pub fn extend_flag(raw: Option<&Value>) -> bool {
    matches!(raw, Some(Value::Bool(true)))
}
