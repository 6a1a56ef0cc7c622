//! Typed failures for ledger and settlement operations.
//!
//! Callers need to tell "fix your input" apart from "try later", so every
//! externally visible failure carries a distinct variant rather than an
//! opaque message. Providers and the CLI still use `anyhow`; this type
//! implements `std::error::Error` so it crosses that boundary cleanly.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    NotInitialized,
    AlreadyInitialized,
    InvalidSeedAmount { expected: u128, got: u128 },
    InvalidAsset(String),
    AllocationExceeded { total_bps: u32 },
    BasketIncomplete { registered: usize, required: usize },
    BelowMinimum { minimum: u128, got: u128 },
    InvalidShareAmount,
    InsufficientShares { available: u128, requested: u128 },
    InsufficientAllowance,
    TransferFailed(String),
    PriceUnavailable { asset: String, reason: String },
    SlippageExceeded { asset: String, quoted: u128, realized: u128 },
    ZeroShareSupply,
    AmountOverflow,
    Paused,
    Unauthorized,
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::NotInitialized => write!(f, "fund is not initialized"),
            LedgerError::AlreadyInitialized => write!(f, "fund is already initialized"),
            LedgerError::InvalidSeedAmount { expected, got } => {
                write!(f, "seed amount {got} rejected, fund accepts exactly {expected}")
            }
            LedgerError::InvalidAsset(id) => write!(f, "invalid asset: {id}"),
            LedgerError::AllocationExceeded { total_bps } => {
                write!(f, "target allocations would total {total_bps} bps, limit is 10000")
            }
            LedgerError::BasketIncomplete {
                registered,
                required,
            } => {
                write!(
                    f,
                    "basket has {registered} assets, initialization requires {required}"
                )
            }
            LedgerError::BelowMinimum { minimum, got } => {
                write!(f, "investment of {got} is below the minimum of {minimum}")
            }
            LedgerError::InvalidShareAmount => write!(f, "share amount must be non-zero"),
            LedgerError::InsufficientShares {
                available,
                requested,
            } => {
                write!(f, "holder has {available} shares, {requested} requested")
            }
            LedgerError::InsufficientAllowance => {
                write!(f, "reference-asset allowance is insufficient")
            }
            LedgerError::TransferFailed(msg) => write!(f, "token transfer failed: {msg}"),
            LedgerError::PriceUnavailable { asset, reason } => {
                write!(f, "no usable price for {asset}: {reason}")
            }
            LedgerError::SlippageExceeded {
                asset,
                quoted,
                realized,
            } => {
                write!(
                    f,
                    "swap for {asset} realized {realized} against a quote of {quoted}"
                )
            }
            LedgerError::ZeroShareSupply => write!(f, "share supply is zero"),
            LedgerError::AmountOverflow => write!(f, "amount arithmetic overflowed"),
            LedgerError::Paused => write!(f, "fund is paused"),
            LedgerError::Unauthorized => write!(f, "caller is not the fund owner"),
        }
    }
}

impl std::error::Error for LedgerError {}

pub type LedgerResult<T> = Result<T, LedgerError>;
