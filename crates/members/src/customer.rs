use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clubledger_core::{CustomerId, DomainError, DomainResult, Entity, Money};

/// Club member with a prepaid account.
///
/// The balance is mutated only inside a committed sale, cancellation, or
/// explicit top-up; the store enforces name uniqueness on write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    id: CustomerId,
    name: String,
    balance: Money,
    last_activity: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(id: CustomerId, name: impl Into<String>, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("customer name cannot be empty"));
        }

        Ok(Self {
            id,
            name,
            balance: Money::ZERO,
            last_activity: now,
            created_at: now,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Charge the account for a sale total. Rejects when the balance does
    /// not cover the amount, carrying both numbers for the caller's message.
    pub fn debit(&mut self, amount: Money) -> DomainResult<()> {
        if self.balance < amount {
            return Err(DomainError::InsufficientBalance {
                available: self.balance,
                required: amount,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// Credit the account (refunds).
    pub fn credit(&mut self, amount: Money) {
        self.balance += amount;
    }

    /// Explicit top-up at the till. Must be positive.
    pub fn top_up(&mut self, amount: Money, now: DateTime<Utc>) -> DomainResult<()> {
        if !amount.is_positive() {
            return Err(DomainError::validation("top-up amount must be positive"));
        }
        self.balance += amount;
        self.last_activity = now;
        Ok(())
    }

    /// Bump the last-activity timestamp.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
