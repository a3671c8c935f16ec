//! Sale cancellation.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use clubledger_core::{DomainError, DomainResult, TransactionId, UserId};
use clubledger_catalog::StockPolicy;
use clubledger_events::{AuditRecord, AuditSink, LedgerNotice, NoticeSink};
use clubledger_ledger::{
    apply_stock_delta, LedgerStore, MovementType, PaymentMethod, Transaction, TransactionItem,
    TransactionType,
};

/// The two rows a cancellation leaves behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationOutcome {
    /// The original sale with its cancelled flag set.
    pub original: Transaction,
    /// The compensating refund row.
    pub refund: Transaction,
    pub refund_items: Vec<TransactionItem>,
}

/// Cancels committed sales by booking an exact inverse.
///
/// Cancellation never deletes: the original row stays, flagged cancelled,
/// and a refund row negates every stored amount. Stock comes back, account
/// payments are re-credited. A transaction cancels at most once; refunds
/// themselves cannot be cancelled.
pub struct CancellationEngine<S> {
    store: S,
    notices: Option<Arc<dyn NoticeSink>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl<S: LedgerStore> CancellationEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            notices: None,
            audit: None,
        }
    }

    pub fn with_notices(mut self, notices: Arc<dyn NoticeSink>) -> Self {
        self.notices = Some(notices);
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn cancel(
        &self,
        transaction_id: TransactionId,
        acting_user: UserId,
    ) -> DomainResult<CancellationOutcome> {
        let now = Utc::now();
        let refund_id = TransactionId::new();

        let outcome = self.store.execute(|tx| {
            let mut original = tx
                .transaction(transaction_id)?
                .ok_or(DomainError::not_found("transaction"))?;
            if original.kind == TransactionType::Refund {
                return Err(DomainError::invalid_state("refunds cannot be cancelled"));
            }
            original.mark_cancelled(acting_user, now)?;

            let items = tx.items_for(transaction_id)?;
            let refund = Transaction::refund_of(&original, refund_id, acting_user, now);
            let refund_items: Vec<_> = items.iter().map(|i| i.negated(refund_id)).collect();

            // Stock restoration must never fail the cancellation, whatever
            // the configured policy.
            for item in &items {
                apply_stock_delta(
                    tx,
                    item.article_id,
                    item.quantity,
                    format!("cancellation of {transaction_id}"),
                    MovementType::Correction,
                    StockPolicy::AllowNegative,
                    now,
                )?;
            }

            if original.payment_method == PaymentMethod::Account {
                let customer_id = original
                    .customer_id
                    .ok_or(DomainError::not_found("customer"))?;
                let mut customer = tx
                    .customer(customer_id)?
                    .ok_or(DomainError::not_found("customer"))?;
                customer.credit(original.total_amount);
                customer.touch(now);
                tx.put_customer(customer)?;
            }

            tx.update_transaction(original.clone())?;
            tx.insert_transaction(refund.clone(), refund_items.clone())?;

            Ok(CancellationOutcome {
                original,
                refund,
                refund_items,
            })
        })?;

        info!(
            transaction_id = %transaction_id,
            refund_id = %outcome.refund.id,
            "sale cancelled"
        );
        if let Some(notices) = &self.notices {
            notices.notify(LedgerNotice::SaleCancelled {
                original_id: transaction_id,
                refund_id: outcome.refund.id,
                customer_id: outcome.original.customer_id,
                occurred_at: now,
            });
        }
        if let Some(audit) = &self.audit {
            audit.record(AuditRecord {
                actor: acting_user,
                action: "sale.cancel",
                entity_type: "transaction",
                entity_id: transaction_id.to_string(),
                detail: json!({
                    "refund_id": outcome.refund.id,
                    "refunded_cents": outcome.refund.total_amount.cents(),
                }),
                occurred_at: now,
            });
        }

        Ok(outcome)
    }
}
