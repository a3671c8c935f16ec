//! Fiscal-year lifecycle: opening a year and the one-way close that
//! freezes a year-end report.
//!
//! Closing flips the year's flag and persists the report inside one unit
//! of work, so a crash can never leave a closed year without its report or
//! the reverse. The inventory snapshot in the report records count
//! variances but never rewrites stock; corrections stay an explicit
//! back-office operation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use clubledger_core::{
    ArticleId, DomainError, DomainResult, Entity, FiscalYearId, Money, Quantity, UserId,
};
use clubledger_events::{AuditRecord, AuditSink};
use clubledger_ledger::{
    BankAccountBalance, FiscalYear, InventoryLine, LedgerStore, YearEndReport,
};
use clubledger_reporting::profit_loss;

/// One physically counted article, supplied by the caller at closing time.
/// Articles without a count default to their system stock (zero variance).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalCount {
    pub article_id: ArticleId,
    pub counted: Quantity,
}

pub struct ClosingEngine<S> {
    store: S,
    audit: Option<Arc<dyn AuditSink>>,
}

impl<S: LedgerStore> ClosingEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store, audit: None }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Open a new fiscal year.
    pub fn open_year(
        &self,
        label: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        acting_user: UserId,
    ) -> DomainResult<FiscalYear> {
        let year = FiscalYear::new(FiscalYearId::new(), label, start, end)?;

        let opened = year.clone();
        self.store.execute(move |tx| tx.put_fiscal_year(year))?;

        info!(fiscal_year_id = %opened.id, label = %opened.label, "fiscal year opened");
        if let Some(audit) = &self.audit {
            audit.record(AuditRecord {
                actor: acting_user,
                action: "fiscal_year.open",
                entity_type: "fiscal_year",
                entity_id: opened.id.to_string(),
                detail: json!({ "label": opened.label }),
                occurred_at: Utc::now(),
            });
        }
        Ok(opened)
    }

    /// Close a fiscal year and freeze its year-end report.
    ///
    /// The second attempt on the same year fails; the report of a closed
    /// year never changes afterwards.
    pub fn close(
        &self,
        fiscal_year_id: FiscalYearId,
        cash_on_hand: Money,
        bank_accounts: Vec<BankAccountBalance>,
        physical: &[PhysicalCount],
        acting_user: UserId,
    ) -> DomainResult<YearEndReport> {
        let now = Utc::now();

        let report = self.store.execute(|tx| {
            let mut year = tx
                .fiscal_year(fiscal_year_id)?
                .ok_or(DomainError::not_found("fiscal year"))?;
            year.close(acting_user, now)?;

            let result = profit_loss::compute(tx, year.start, year.end)?;

            let member_liability: Money =
                tx.customers()?.iter().map(|c| c.balance()).sum();

            let mut inventory = Vec::new();
            for article in tx.articles()? {
                let system = article.stock();
                let counted = physical
                    .iter()
                    .find(|p| p.article_id == *article.id())
                    .map(|p| p.counted)
                    .unwrap_or(system);
                inventory.push(InventoryLine {
                    article_id: *article.id(),
                    article_name: article.name().to_owned(),
                    system,
                    counted,
                    variance: counted - system,
                });
            }

            let report = YearEndReport {
                fiscal_year_id,
                generated_at: now,
                income: result.income,
                expenses: result.expenses,
                extra_income: result.extra_income,
                profit: result.profit,
                cash_on_hand,
                bank_accounts: bank_accounts.clone(),
                member_liability,
                inventory,
            };

            tx.put_fiscal_year(year)?;
            tx.insert_report(report.clone())?;
            Ok(report)
        })?;

        info!(
            fiscal_year_id = %fiscal_year_id,
            profit = %report.profit,
            "fiscal year closed"
        );
        if let Some(audit) = &self.audit {
            audit.record(AuditRecord {
                actor: acting_user,
                action: "fiscal_year.close",
                entity_type: "fiscal_year",
                entity_id: fiscal_year_id.to_string(),
                detail: json!({
                    "profit_cents": report.profit.cents(),
                    "member_liability_cents": report.member_liability.cents(),
                }),
                occurred_at: now,
            });
        }
        Ok(report)
    }

    /// The frozen report of a closed year, if any.
    pub fn report_for(&self, fiscal_year_id: FiscalYearId) -> DomainResult<Option<YearEndReport>> {
        self.store.read(|tx| tx.report_for(fiscal_year_id))
    }
}
