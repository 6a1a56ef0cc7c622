//! Fixed-point amount arithmetic.
//!
//! Every monetary quantity in the ledger is a `u128` count of base units,
//! scaled by an explicit per-asset decimal count. Floats never touch
//! balances. Division floors, so conversion paths that credit a
//! counterparty round in the fund's favor.

use crate::core::error::{LedgerError, LedgerResult};

/// Basis-point denominator: 10000 bps = 100%.
pub const BPS_DENOM: u128 = 10_000;

pub fn pow10(decimals: u32) -> u128 {
    10u128.pow(decimals)
}

/// `a * b / denom`, flooring, with overflow and zero-denominator checks.
pub fn mul_div_floor(a: u128, b: u128, denom: u128) -> LedgerResult<u128> {
    if denom == 0 {
        return Err(LedgerError::AmountOverflow);
    }
    a.checked_mul(b)
        .map(|p| p / denom)
        .ok_or(LedgerError::AmountOverflow)
}

/// Applies a basis-point fraction to an amount, flooring.
pub fn apply_bps(amount: u128, bps: u32) -> LedgerResult<u128> {
    mul_div_floor(amount, bps as u128, BPS_DENOM)
}

/// Rescales an amount between decimal precisions, flooring when precision
/// is dropped.
pub fn rescale(amount: u128, from_decimals: u32, to_decimals: u32) -> LedgerResult<u128> {
    if from_decimals == to_decimals {
        return Ok(amount);
    }
    if to_decimals > from_decimals {
        amount
            .checked_mul(pow10(to_decimals - from_decimals))
            .ok_or(LedgerError::AmountOverflow)
    } else {
        Ok(amount / pow10(from_decimals - to_decimals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_floors() {
        assert_eq!(mul_div_floor(10, 3, 4).unwrap(), 7); // 30 / 4 = 7.5
        assert_eq!(mul_div_floor(0, 3, 4).unwrap(), 0);
    }

    #[test]
    fn test_mul_div_rejects_zero_denominator() {
        assert_eq!(
            mul_div_floor(1, 1, 0).unwrap_err(),
            LedgerError::AmountOverflow
        );
    }

    #[test]
    fn test_mul_div_rejects_overflow() {
        assert_eq!(
            mul_div_floor(u128::MAX, 2, 1).unwrap_err(),
            LedgerError::AmountOverflow
        );
    }

    #[test]
    fn test_apply_bps() {
        assert_eq!(apply_bps(1_000_000, 1250).unwrap(), 125_000);
        assert_eq!(apply_bps(1_000_000, 10_000).unwrap(), 1_000_000);
        assert_eq!(apply_bps(1_000_000, 0).unwrap(), 0);
        // 99 * 1% floors to 0
        assert_eq!(apply_bps(99, 100).unwrap(), 0);
    }

    #[test]
    fn test_rescale() {
        assert_eq!(rescale(1_500_000, 6, 8).unwrap(), 150_000_000);
        assert_eq!(rescale(150_000_000, 8, 6).unwrap(), 1_500_000);
        assert_eq!(rescale(123, 6, 6).unwrap(), 123);
        // flooring when dropping precision
        assert_eq!(rescale(199, 8, 6).unwrap(), 1);
    }
}
