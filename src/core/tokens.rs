//! Fungible-token bookkeeping interface.
//!
//! The ledger uses standard transfer/mint/burn semantics for the reference
//! asset and the share token but does not reimplement a token standard.
//! `MemoryTokens` is the in-memory implementation backing tests and the
//! lifecycle simulation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    InsufficientBalance { available: u128, requested: u128 },
    InsufficientAllowance { available: u128, requested: u128 },
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::InsufficientBalance {
                available,
                requested,
            } => write!(f, "balance {available} below requested {requested}"),
            TokenError::InsufficientAllowance {
                available,
                requested,
            } => write!(f, "allowance {available} below requested {requested}"),
        }
    }
}

impl std::error::Error for TokenError {}

pub trait TokenBank: Send + Sync {
    fn transfer(&self, token: &str, from: &str, to: &str, amount: u128) -> Result<(), TokenError>;

    /// Spends `owner`'s tokens on behalf of `spender`, consuming allowance.
    fn transfer_from(
        &self,
        token: &str,
        owner: &str,
        spender: &str,
        to: &str,
        amount: u128,
    ) -> Result<(), TokenError>;

    fn approve(&self, token: &str, owner: &str, spender: &str, amount: u128);

    fn allowance(&self, token: &str, owner: &str, spender: &str) -> u128;

    fn mint(&self, token: &str, to: &str, amount: u128);

    fn burn(&self, token: &str, from: &str, amount: u128) -> Result<(), TokenError>;

    fn balance_of(&self, token: &str, holder: &str) -> u128;

    fn total_supply(&self, token: &str) -> u128;
}

#[derive(Default)]
struct TokenState {
    balances: HashMap<(String, String), u128>,
    allowances: HashMap<(String, String, String), u128>,
    supplies: HashMap<String, u128>,
}

/// In-memory token bank keyed by (token, holder).
#[derive(Default)]
pub struct MemoryTokens {
    state: Mutex<TokenState>,
}

impl MemoryTokens {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenBank for MemoryTokens {
    fn transfer(&self, token: &str, from: &str, to: &str, amount: u128) -> Result<(), TokenError> {
        let mut state = self.state.lock().unwrap();
        let from_key = (token.to_string(), from.to_string());
        let available = *state.balances.get(&from_key).unwrap_or(&0);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        state.balances.insert(from_key, available - amount);
        *state
            .balances
            .entry((token.to_string(), to.to_string()))
            .or_insert(0) += amount;
        debug!(token, from, to, amount, "transfer");
        Ok(())
    }

    fn transfer_from(
        &self,
        token: &str,
        owner: &str,
        spender: &str,
        to: &str,
        amount: u128,
    ) -> Result<(), TokenError> {
        {
            let mut state = self.state.lock().unwrap();
            let key = (token.to_string(), owner.to_string(), spender.to_string());
            let allowance = *state.allowances.get(&key).unwrap_or(&0);
            if allowance < amount {
                return Err(TokenError::InsufficientAllowance {
                    available: allowance,
                    requested: amount,
                });
            }
            state.allowances.insert(key, allowance - amount);
        }
        self.transfer(token, owner, to, amount)
    }

    fn approve(&self, token: &str, owner: &str, spender: &str, amount: u128) {
        let mut state = self.state.lock().unwrap();
        state.allowances.insert(
            (token.to_string(), owner.to_string(), spender.to_string()),
            amount,
        );
    }

    fn allowance(&self, token: &str, owner: &str, spender: &str) -> u128 {
        let state = self.state.lock().unwrap();
        *state
            .allowances
            .get(&(token.to_string(), owner.to_string(), spender.to_string()))
            .unwrap_or(&0)
    }

    fn mint(&self, token: &str, to: &str, amount: u128) {
        let mut state = self.state.lock().unwrap();
        *state
            .balances
            .entry((token.to_string(), to.to_string()))
            .or_insert(0) += amount;
        *state.supplies.entry(token.to_string()).or_insert(0) += amount;
        debug!(token, to, amount, "mint");
    }

    fn burn(&self, token: &str, from: &str, amount: u128) -> Result<(), TokenError> {
        let mut state = self.state.lock().unwrap();
        let key = (token.to_string(), from.to_string());
        let available = *state.balances.get(&key).unwrap_or(&0);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        state.balances.insert(key, available - amount);
        *state.supplies.entry(token.to_string()).or_insert(0) -= amount;
        debug!(token, from, amount, "burn");
        Ok(())
    }

    fn balance_of(&self, token: &str, holder: &str) -> u128 {
        let state = self.state.lock().unwrap();
        *state
            .balances
            .get(&(token.to_string(), holder.to_string()))
            .unwrap_or(&0)
    }

    fn total_supply(&self, token: &str) -> u128 {
        let state = self.state.lock().unwrap();
        *state.supplies.get(token).unwrap_or(&0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_transfer_burn() {
        let bank = MemoryTokens::new();
        bank.mint("USDQ", "alice", 1_000);
        assert_eq!(bank.balance_of("USDQ", "alice"), 1_000);
        assert_eq!(bank.total_supply("USDQ"), 1_000);

        bank.transfer("USDQ", "alice", "bob", 400).unwrap();
        assert_eq!(bank.balance_of("USDQ", "alice"), 600);
        assert_eq!(bank.balance_of("USDQ", "bob"), 400);

        bank.burn("USDQ", "bob", 400).unwrap();
        assert_eq!(bank.total_supply("USDQ"), 600);
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let bank = MemoryTokens::new();
        bank.mint("USDQ", "alice", 10);
        let err = bank.transfer("USDQ", "alice", "bob", 11).unwrap_err();
        assert_eq!(
            err,
            TokenError::InsufficientBalance {
                available: 10,
                requested: 11
            }
        );
        // nothing moved
        assert_eq!(bank.balance_of("USDQ", "alice"), 10);
        assert_eq!(bank.balance_of("USDQ", "bob"), 0);
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let bank = MemoryTokens::new();
        bank.mint("USDQ", "alice", 1_000);

        let err = bank
            .transfer_from("USDQ", "alice", "fund", "fund", 100)
            .unwrap_err();
        assert!(matches!(err, TokenError::InsufficientAllowance { .. }));

        bank.approve("USDQ", "alice", "fund", 150);
        assert_eq!(bank.allowance("USDQ", "alice", "fund"), 150);
        bank.transfer_from("USDQ", "alice", "fund", "fund", 100)
            .unwrap();
        assert_eq!(bank.balance_of("USDQ", "fund"), 100);
        assert_eq!(bank.allowance("USDQ", "alice", "fund"), 50);

        // only 50 allowance left
        let err = bank
            .transfer_from("USDQ", "alice", "fund", "fund", 100)
            .unwrap_err();
        assert_eq!(
            err,
            TokenError::InsufficientAllowance {
                available: 50,
                requested: 100
            }
        );
    }
}
