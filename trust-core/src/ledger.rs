//! Reputation/karma ledger.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::types::Points;

/// Error types for ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Ledger could not be reached
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// Ledger refused the credit
    #[error("Credit rejected for {actor}: {reason}")]
    Rejected { actor: String, reason: String },
}

/// External karma ledger keyed by actor (wallet address).
#[async_trait]
pub trait ReputationLedger: Send + Sync {
    /// Add `amount` to the actor's balance.
    async fn credit(&self, actor: &str, amount: Points) -> Result<(), LedgerError>;

    /// Current balance for the actor. Unknown actors read as zero.
    async fn read(&self, actor: &str) -> Result<Points, LedgerError>;
}

/// In-process ledger.
pub struct MemoryLedger {
    balances: DashMap<String, Points>,
    available: AtomicBool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            balances: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Toggle availability; an unavailable ledger fails every call.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), LedgerError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::Unavailable("memory ledger disabled".to_string()))
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReputationLedger for MemoryLedger {
    async fn credit(&self, actor: &str, amount: Points) -> Result<(), LedgerError> {
        self.ensure_available()?;

        let balance = {
            let mut entry = self.balances.entry(actor.to_string()).or_default();
            *entry += amount;
            *entry
        };

        debug!(actor = %actor, amount = %amount, balance = %balance, "Karma credited");
        Ok(())
    }

    async fn read(&self, actor: &str) -> Result<Points, LedgerError> {
        self.ensure_available()?;
        Ok(self
            .balances
            .get(actor)
            .map(|b| *b)
            .unwrap_or(Points::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_credit_is_additive() {
        let ledger = MemoryLedger::new();

        ledger.credit("0xabc", Points::from(1.5)).await.unwrap();
        ledger.credit("0xabc", Points::from(2.25)).await.unwrap();

        assert_eq!(ledger.read("0xabc").await.unwrap(), Points::from(3.75));
        assert_eq!(ledger.read("0xother").await.unwrap(), Points::ZERO);
    }

    #[tokio::test]
    async fn test_unavailable_ledger() {
        let ledger = MemoryLedger::new();
        ledger.set_available(false);

        let result = ledger.credit("0xabc", Points::from_whole(1)).await;
        assert!(matches!(result, Err(LedgerError::Unavailable(_))));
    }
}
