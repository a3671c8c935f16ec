//! Sale booking.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use clubledger_core::{ArticleId, CustomerId, DomainError, DomainResult, Quantity, TransactionId, UserId};
use clubledger_catalog::StockPolicy;
use clubledger_events::{AuditRecord, AuditSink, LedgerNotice, NoticeSink};
use clubledger_ledger::{
    apply_stock_delta, items_total, LedgerStore, MovementType, PaymentMethod, Transaction,
    TransactionItem,
};

/// One requested line of a sale: which article, how much.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub article_id: ArticleId,
    pub quantity: Quantity,
}

/// What the caller gets back from a committed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleReceipt {
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
}

/// Books sales against the ledger.
///
/// A sale decrements stock, snapshots prices into line items, debits the
/// member account for account payments, and persists the transaction row,
/// all inside one unit of work. Any failed step leaves the ledger untouched.
pub struct SaleEngine<S> {
    store: S,
    policy: StockPolicy,
    notices: Option<Arc<dyn NoticeSink>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl<S: LedgerStore> SaleEngine<S> {
    pub fn new(store: S, policy: StockPolicy) -> Self {
        Self {
            store,
            policy,
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

    /// Book a sale.
    ///
    /// `customer_id` is required for account payment and optional for cash;
    /// an attributed cash sale still counts towards the buyer's highscore
    /// and bumps their activity timestamp.
    pub fn create_sale(
        &self,
        payment_method: PaymentMethod,
        customer_id: Option<CustomerId>,
        lines: &[SaleLine],
        user_id: UserId,
    ) -> DomainResult<SaleReceipt> {
        if lines.is_empty() {
            return Err(DomainError::validation("a sale needs at least one line"));
        }
        if let Some(line) = lines.iter().find(|l| !l.quantity.is_positive()) {
            return Err(DomainError::validation(format!(
                "sale quantity must be positive, got {}",
                line.quantity
            )));
        }
        if payment_method == PaymentMethod::Account && customer_id.is_none() {
            return Err(DomainError::validation(
                "account payment requires a customer",
            ));
        }

        let now = Utc::now();
        let transaction_id = TransactionId::new();
        let policy = self.policy;

        let receipt = self.store.execute(|tx| {
            let mut customer = match customer_id {
                Some(id) => Some(
                    tx.customer(id)?
                        .ok_or(DomainError::not_found("customer"))?,
                ),
                None => None,
            };

            let mut items = Vec::with_capacity(lines.len());
            for line in lines {
                let article = tx
                    .article(line.article_id)?
                    .ok_or(DomainError::not_found("article"))?;
                if !article.is_sellable() {
                    return Err(DomainError::invalid_state(format!(
                        "article '{}' is not sellable",
                        article.name()
                    )));
                }

                let price_per_unit = article.price();
                let total_price = price_per_unit.mul_quantity(line.quantity);
                apply_stock_delta(
                    tx,
                    line.article_id,
                    -line.quantity,
                    format!("sale {transaction_id}"),
                    MovementType::Sale,
                    policy,
                    now,
                )?;

                items.push(TransactionItem {
                    transaction_id,
                    article_id: line.article_id,
                    quantity: line.quantity,
                    price_per_unit,
                    total_price,
                });
            }

            let total = items_total(&items);

            if let Some(customer) = customer.as_mut() {
                if payment_method == PaymentMethod::Account {
                    customer.debit(total)?;
                }
                customer.touch(now);
                tx.put_customer(customer.clone())?;
            }

            let transaction = Transaction::sale(
                transaction_id,
                payment_method,
                customer_id,
                total,
                user_id,
                now,
            );
            tx.insert_transaction(transaction.clone(), items.clone())?;

            Ok(SaleReceipt { transaction, items })
        })?;

        info!(
            transaction_id = %receipt.transaction.id,
            total = %receipt.transaction.total_amount,
            lines = receipt.items.len(),
            "sale committed"
        );
        if let Some(notices) = &self.notices {
            notices.notify(LedgerNotice::SaleCommitted {
                transaction_id: receipt.transaction.id,
                customer_id: receipt.transaction.customer_id,
                total: receipt.transaction.total_amount,
                occurred_at: receipt.transaction.created_at,
            });
        }
        if let Some(audit) = &self.audit {
            audit.record(AuditRecord {
                actor: user_id,
                action: "sale.create",
                entity_type: "transaction",
                entity_id: receipt.transaction.id.to_string(),
                detail: json!({
                    "payment_method": receipt.transaction.payment_method,
                    "total_cents": receipt.transaction.total_amount.cents(),
                    "lines": receipt.items.len(),
                }),
                occurred_at: now,
            });
        }

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stock::tests_support::UnreachableStore;

    fn engine() -> SaleEngine<UnreachableStore> {
        SaleEngine::new(UnreachableStore, StockPolicy::ForbidNegative)
    }

    // Request validation happens before any store access; UnreachableStore
    // fails loudly if an engine reaches for it anyway.

    #[test]
    fn rejects_empty_sale() {
        let err = engine()
            .create_sale(PaymentMethod::Cash, None, &[], UserId::new())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let lines = [SaleLine {
            article_id: ArticleId::new(),
            quantity: Quantity::ZERO,
        }];
        let err = engine()
            .create_sale(PaymentMethod::Cash, None, &lines, UserId::new())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn account_payment_requires_customer() {
        let lines = [SaleLine {
            article_id: ArticleId::new(),
            quantity: Quantity::ONE,
        }];
        let err = engine()
            .create_sale(PaymentMethod::Account, None, &lines, UserId::new())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
