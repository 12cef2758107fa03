//! Decimal price helpers.
//!
//! Prices travel as JSON numbers in the remote data service, so entities
//! (de)serialize them through `rust_decimal::serde::float`; arithmetic stays in
//! `Decimal` to keep cart and order totals exact.

use rust_decimal::Decimal;

/// Price of `quantity` units at `unit_price`.
#[must_use]
pub fn line_total(unit_price: Decimal, quantity: u32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Format an amount with exactly two decimal places (e.g. `"23.50"`).
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(Decimal::new(1175, 2), 2), Decimal::new(2350, 2));
        assert_eq!(line_total(Decimal::new(1175, 2), 0), Decimal::ZERO);
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(Decimal::new(235, 1)), "23.50");
        assert_eq!(format_price(Decimal::new(5, 0)), "5.00");
        assert_eq!(format_price(Decimal::new(19999, 3)), "20.00");
    }
}
