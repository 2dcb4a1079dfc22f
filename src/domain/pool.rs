use super::money::{Amount, Balance};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum PoolTier {
    #[default]
    Free,
    Premium,
}

/// Snapshot of a pool as returned by the pool detail endpoint.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Funds available for withdrawal.
    pub balance: Balance,
    #[serde(default)]
    pub tier: PoolTier,
}

impl Pool {
    pub fn new(id: impl Into<String>, balance: Balance) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            balance,
            tier: PoolTier::Free,
        }
    }
}

/// What a refreshed pool must show before a push payment counts as settled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Confirmation {
    /// Deposit landed: balance reached the pre-payment balance plus the amount.
    BalanceAtLeast(Balance),
    /// Upgrade landed: the pool reports the given tier.
    Tier(PoolTier),
}

impl Confirmation {
    pub fn deposit(baseline: Balance, amount: Amount) -> Result<Self, ValidationError> {
        baseline
            .checked_add(amount.into())
            .map(Self::BalanceAtLeast)
            .ok_or(ValidationError::AmountTooLarge)
    }

    pub fn is_met(&self, pool: &Pool) -> bool {
        match self {
            Self::BalanceAtLeast(target) => pool.balance >= *target,
            Self::Tier(tier) => pool.tier == *tier,
        }
    }
}
