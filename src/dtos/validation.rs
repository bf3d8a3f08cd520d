//! Shared validator rules

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use validator::ValidationError;

lazy_static! {
    /// Digits with an optional leading `+`, 7 to 15 long.
    pub static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9]{7,15}$").unwrap();
    /// Latin or Devanagari letters, digits, spaces and dashes.
    pub static ref PLATE_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9\p{Devanagari}][A-Za-z0-9\p{Devanagari} \-]{1,30}$").unwrap();
}

pub fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() || price.is_zero() {
        return Err(ValidationError::new("price_not_positive"));
    }
    if price.scale() > 2 {
        return Err(ValidationError::new("price_too_precise"));
    }
    Ok(())
}
