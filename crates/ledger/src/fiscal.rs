use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clubledger_core::{
    ArticleId, DomainError, DomainResult, FiscalYearId, Money, Quantity, UserId,
};

/// Fiscal year: `OPEN → CLOSED`, one way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYear {
    pub id: FiscalYearId,
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub closed: bool,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<UserId>,
}

impl FiscalYear {
    pub fn new(
        id: FiscalYearId,
        label: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if start >= end {
            return Err(DomainError::validation(
                "fiscal year start must precede its end",
            ));
        }
        Ok(Self {
            id,
            label: label.into(),
            start,
            end,
            closed: false,
            closed_at: None,
            closed_by: None,
        })
    }

    /// Flip to CLOSED, exactly once. The closing engine runs this inside
    /// the same unit of work that persists the year-end report.
    pub fn close(&mut self, by: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        if self.closed {
            return Err(DomainError::invalid_state("fiscal year already closed"));
        }
        self.closed = true;
        self.closed_at = Some(now);
        self.closed_by = Some(by);
        Ok(())
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

/// Bank account snapshot supplied by the caller at closing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccountBalance {
    pub name: String,
    pub balance: Money,
}

/// Per-article inventory line of a year-end report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLine {
    pub article_id: ArticleId,
    pub article_name: String,
    /// Stock according to the ledger at closing time.
    pub system: Quantity,
    /// Physically counted stock (defaults to `system` when not supplied).
    pub counted: Quantity,
    /// `counted - system`.
    pub variance: Quantity,
}

/// Immutable year-end snapshot, persisted when the fiscal year closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearEndReport {
    pub fiscal_year_id: FiscalYearId,
    pub generated_at: DateTime<Utc>,
    pub income: Money,
    pub expenses: Money,
    pub extra_income: Money,
    pub profit: Money,
    pub cash_on_hand: Money,
    pub bank_accounts: Vec<BankAccountBalance>,
    /// Sum of member balances: what the club owes its members.
    pub member_liability: Money,
    pub inventory: Vec<InventoryLine>,
}
