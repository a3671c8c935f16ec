use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clubledger_core::{DocumentId, DomainError, DomainResult, Money};

/// Supplier purchase document (the expense side of profit/loss).
///
/// Only paid documents enter the profit/loss computation, dated by their
/// payment timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseDocument {
    pub id: DocumentId,
    pub supplier: String,
    pub category: String,
    pub amount: Money,
    pub paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PurchaseDocument {
    pub fn new(
        id: DocumentId,
        supplier: impl Into<String>,
        category: impl Into<String>,
        amount: Money,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if !amount.is_positive() {
            return Err(DomainError::validation(
                "purchase document amount must be positive",
            ));
        }
        Ok(Self {
            id,
            supplier: supplier.into(),
            category: category.into(),
            amount,
            paid: false,
            paid_at: None,
            created_at: now,
        })
    }

    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.paid {
            return Err(DomainError::invalid_state("purchase document already paid"));
        }
        self.paid = true;
        self.paid_at = Some(now);
        Ok(())
    }
}

/// Outgoing invoice issued by the club (the extra-income side of
/// profit/loss, e.g. renting out the club room).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingInvoice {
    pub id: DocumentId,
    pub debtor: String,
    pub amount: Money,
    pub paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OutgoingInvoice {
    pub fn new(
        id: DocumentId,
        debtor: impl Into<String>,
        amount: Money,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if !amount.is_positive() {
            return Err(DomainError::validation("invoice amount must be positive"));
        }
        Ok(Self {
            id,
            debtor: debtor.into(),
            amount,
            paid: false,
            paid_at: None,
            created_at: now,
        })
    }

    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.paid {
            return Err(DomainError::invalid_state("invoice already paid"));
        }
        self.paid = true;
        self.paid_at = Some(now);
        Ok(())
    }
}
