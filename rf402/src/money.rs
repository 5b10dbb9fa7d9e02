//! USD, cents and USDC base-unit conversions.
//!
//! USDC has 6 decimals on every supported chain, so one cent is 10 000 base
//! units. All conversions go through [`Decimal`] and round half away from zero.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimals of the USDC token.
pub const USDC_DECIMALS: u32 = 6;

/// USDC base units per cent.
pub const BASE_UNITS_PER_CENT: u64 = 10_000;

fn round_to_u64(value: Decimal) -> u64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .max(Decimal::ZERO)
        .to_u64()
        .unwrap_or(u64::MAX)
}

/// Converts a USD amount to whole cents. Negative amounts become zero.
#[must_use]
pub fn usd_to_cents(usd: Decimal) -> u64 {
    round_to_u64(usd * Decimal::ONE_HUNDRED)
}

/// Converts cents to a USD amount with two decimal places.
#[must_use]
pub fn cents_to_usd(cents: u64) -> Decimal {
    Decimal::from(cents) / Decimal::ONE_HUNDRED
}

/// Converts USDC base units, given as a decimal string, to cents.
///
/// Returns `None` if the string is not a number.
#[must_use]
pub fn base_units_to_cents(base_units: &str) -> Option<u64> {
    let units = Decimal::from_str(base_units.trim()).ok()?;
    Some(round_to_u64(units / Decimal::from(BASE_UNITS_PER_CENT)))
}

/// Converts cents to USDC base units.
#[must_use]
pub const fn cents_to_base_units(cents: u64) -> u64 {
    cents.saturating_mul(BASE_UNITS_PER_CENT)
}
