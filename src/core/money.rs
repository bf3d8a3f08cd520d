//! Decimal helpers. Amounts leave the API as strings so no client ever
//! sees a float.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Renders an amount with exactly two decimal places.
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

pub fn parse_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok()
}

/// eSewa echoes amounts back with thousands separators (`"1,000.0"`).
pub fn parse_gateway_amount(raw: &str) -> Option<Decimal> {
    parse_amount(&raw.replace(',', ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    #[test]
    fn formats_with_two_places() {
        assert_eq!(format_amount(Decimal::new(500, 0)), "500.00");
        assert_eq!(format_amount(Decimal::new(19999, 2)), "199.99");
        assert_eq!(format_amount(Decimal::new(12345, 3)), "12.35");
    }

    #[test]
    fn parses_gateway_amounts() {
        assert_eq!(parse_gateway_amount("1,000.0"), Decimal::from_i32(1000));
        assert_eq!(parse_gateway_amount("100"), Decimal::from_i32(100));
        assert!(parse_gateway_amount("abc").is_none());
    }
}
