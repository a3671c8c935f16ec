use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clubledger_core::{
    CustomerId, DomainError, DomainResult, Money, Quantity, TransactionId, UserId,
};
use clubledger_core::ArticleId;

/// Transaction kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Sale,
    Refund,
}

/// How the sale was paid.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Account,
}

/// Persisted transaction row.
///
/// Immutable once created, except for the one-way cancelled transition
/// driven by [`Transaction::mark_cancelled`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub kind: TransactionType,
    pub payment_method: PaymentMethod,
    /// Signed total; negative on refund rows.
    pub total_amount: Money,
    /// Absent on anonymous cash sales.
    pub customer_id: Option<CustomerId>,
    /// Operator who booked the transaction.
    pub user_id: UserId,
    pub cancelled: bool,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<UserId>,
    /// Set on refund rows: the sale this refund reverses.
    pub original_transaction_id: Option<TransactionId>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn sale(
        id: TransactionId,
        payment_method: PaymentMethod,
        customer_id: Option<CustomerId>,
        total_amount: Money,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind: TransactionType::Sale,
            payment_method,
            total_amount,
            customer_id,
            user_id,
            cancelled: false,
            cancelled_at: None,
            cancelled_by: None,
            original_transaction_id: None,
            created_at: now,
        }
    }

    /// Build the counter-transaction for a cancellation.
    ///
    /// Every amount is the exact negation of the stored original, never
    /// recomputed from current prices.
    pub fn refund_of(
        original: &Transaction,
        id: TransactionId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind: TransactionType::Refund,
            payment_method: original.payment_method,
            total_amount: -original.total_amount,
            customer_id: original.customer_id,
            user_id,
            cancelled: false,
            cancelled_at: None,
            cancelled_by: None,
            original_transaction_id: Some(original.id),
            created_at: now,
        }
    }

    /// Flip the cancelled flag, exactly once.
    ///
    /// The second attempt fails rather than silently no-opping; the caller
    /// runs this inside the same unit of work that books the refund.
    pub fn mark_cancelled(&mut self, by: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        if self.cancelled {
            return Err(DomainError::invalid_state("transaction already cancelled"));
        }
        self.cancelled = true;
        self.cancelled_at = Some(now);
        self.cancelled_by = Some(by);
        Ok(())
    }
}

/// One line of a transaction: article, quantity, and the price snapshot
/// taken at sale time. The snapshot is never re-read from the live article,
/// so historical reports stay stable across price changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionItem {
    pub transaction_id: TransactionId,
    pub article_id: ArticleId,
    /// Signed; negative on refund rows.
    pub quantity: Quantity,
    pub price_per_unit: Money,
    pub total_price: Money,
}

impl TransactionItem {
    /// The refund counterpart: same article and snapshot price, negated
    /// quantity and total.
    pub fn negated(&self, refund_id: TransactionId) -> Self {
        Self {
            transaction_id: refund_id,
            article_id: self.article_id,
            quantity: -self.quantity,
            price_per_unit: self.price_per_unit,
            total_price: -self.total_price,
        }
    }
}

/// Sum of line totals; must equal the transaction's `total_amount`.
pub fn items_total(items: &[TransactionItem]) -> Money {
    items.iter().map(|i| i.total_price).sum()
}
