//! Back-office stock operations: manual corrections, delivery receipt,
//! and physical inventory counts.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use clubledger_core::{ArticleId, DomainError, DomainResult, Entity, Quantity, UserId};
use clubledger_catalog::{Article, StockPolicy};
use clubledger_events::{AuditRecord, AuditSink, LedgerNotice, NoticeSink};
use clubledger_ledger::{apply_stock_delta, LedgerStore, MovementType};

/// Result of booking a physical count against system stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCountOutcome {
    pub article: Article,
    /// `counted - system` at the time of the count; zero means the ledger
    /// already agreed with the shelf.
    pub variance: Quantity,
}

/// Stock mutations that do not come from a sale.
pub struct StockOps<S> {
    store: S,
    policy: StockPolicy,
    notices: Option<Arc<dyn NoticeSink>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl<S: LedgerStore> StockOps<S> {
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

    /// Manual signed adjustment, e.g. breakage or a found crate.
    pub fn adjust(
        &self,
        article_id: ArticleId,
        delta: Quantity,
        reason: impl Into<String>,
        kind: MovementType,
        acting_user: UserId,
    ) -> DomainResult<Article> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(DomainError::validation(
                "a stock adjustment needs a reason",
            ));
        }
        self.book(
            article_id,
            delta,
            reason,
            kind,
            self.policy,
            acting_user,
            "stock.adjust",
        )
    }

    /// Book an incoming delivery, given in purchase units (crates, boxes).
    /// The article's purchase-unit factor converts to stock units.
    pub fn receive_delivery(
        &self,
        article_id: ArticleId,
        purchase_units: Quantity,
        acting_user: UserId,
    ) -> DomainResult<Article> {
        if !purchase_units.is_positive() {
            return Err(DomainError::validation(
                "delivery quantity must be positive",
            ));
        }
        let now = Utc::now();
        let policy = self.policy;

        // Factor lookup and the stock write share one unit of work so a
        // concurrent factor change cannot slip between them.
        let (article, delta) = self.store.execute(|tx| {
            let article = tx
                .article(article_id)?
                .ok_or(DomainError::not_found("article"))?;
            let delta = article.purchase_to_stock_units(purchase_units);
            let article = apply_stock_delta(
                tx,
                article_id,
                delta,
                format!("delivery of {purchase_units} purchase units"),
                MovementType::Delivery,
                policy,
                now,
            )?;
            Ok((article, delta))
        })?;

        self.report(
            &article,
            delta,
            MovementType::Delivery,
            acting_user,
            "stock.delivery",
            format!("delivery of {purchase_units} purchase units"),
            now,
        );
        Ok(article)
    }

    /// Reconcile system stock with a physical count. When the count matches,
    /// nothing is written; otherwise one inventory movement closes the gap.
    pub fn record_inventory_count(
        &self,
        article_id: ArticleId,
        counted: Quantity,
        acting_user: UserId,
    ) -> DomainResult<InventoryCountOutcome> {
        if counted.is_negative() {
            return Err(DomainError::validation(
                "counted stock cannot be negative",
            ));
        }
        let now = Utc::now();

        // Variance must be computed against the same stock value the
        // correction applies to, so both live in one unit of work; a
        // concurrent writer cannot slip between the read and the write.
        let (article, variance) = self.store.execute(|tx| {
            let article = tx
                .article(article_id)?
                .ok_or(DomainError::not_found("article"))?;
            let variance = counted - article.stock();
            if variance.is_zero() {
                return Ok((article, variance));
            }
            let article = apply_stock_delta(
                tx,
                article_id,
                variance,
                "physical inventory count",
                MovementType::Inventory,
                StockPolicy::AllowNegative,
                now,
            )?;
            Ok((article, variance))
        })?;

        if !variance.is_zero() {
            self.report(
                &article,
                variance,
                MovementType::Inventory,
                acting_user,
                "stock.inventory",
                "physical inventory count".to_owned(),
                now,
            );
        }
        Ok(InventoryCountOutcome { article, variance })
    }

    fn book(
        &self,
        article_id: ArticleId,
        delta: Quantity,
        reason: impl Into<String>,
        kind: MovementType,
        policy: StockPolicy,
        acting_user: UserId,
        action: &'static str,
    ) -> DomainResult<Article> {
        let now = Utc::now();
        let reason = reason.into();
        let audit_reason = reason.clone();

        let article = self
            .store
            .execute(|tx| apply_stock_delta(tx, article_id, delta, reason, kind, policy, now))?;

        self.report(&article, delta, kind, acting_user, action, audit_reason, now);
        Ok(article)
    }

    #[allow(clippy::too_many_arguments)]
    fn report(
        &self,
        article: &Article,
        delta: Quantity,
        kind: MovementType,
        acting_user: UserId,
        action: &'static str,
        reason: String,
        now: chrono::DateTime<Utc>,
    ) {
        info!(
            article_id = %article.id(),
            delta = %delta,
            new_stock = %article.stock(),
            ?kind,
            "stock adjusted"
        );
        if let Some(notices) = &self.notices {
            notices.notify(LedgerNotice::StockAdjusted {
                article_id: *article.id(),
                delta,
                new_stock: article.stock(),
                occurred_at: now,
            });
        }
        if let Some(audit) = &self.audit {
            audit.record(AuditRecord {
                actor: acting_user,
                action,
                entity_type: "article",
                entity_id: article.id().to_string(),
                detail: json!({
                    "delta_thousandths": delta.thousandths(),
                    "new_stock_thousandths": article.stock().thousandths(),
                    "reason": reason,
                }),
                occurred_at: now,
            });
        }
    }
}
