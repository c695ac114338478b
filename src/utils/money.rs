use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Decimal places every persisted or reported amount is rounded to.
pub const MONEY_SCALE: u32 = 2;

/// Largest amount a `DECIMAL(12, 2)` column holds.
pub const MAX_AMOUNT: Decimal = dec!(9999999999.99);

/// Commercial rounding to cents: 0.005 goes up, -0.005 goes down. The result
/// always carries exactly two places so it serializes as e.g. `"20000.00"`.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Converts a model output back into money. Non-finite input becomes zero.
pub fn money_from_f64(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .map(round_money)
        .unwrap_or(Decimal::ZERO)
}

pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Rounds a ratio or score to two places for reporting.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
