//! Read-side reports: leaderboard, daily summary, profit/loss, and the
//! shared sale queries they build on.
//!
//! The module-level `compute` functions take `&dyn LedgerTx` so the
//! closing engine can reuse them inside its own unit of work; the
//! [`ReportingEngine`] wraps them behind a store for everyday callers.

pub mod daily;
pub mod highscore;
pub mod profit_loss;
pub mod query;

use chrono::{DateTime, NaiveDate, Utc};

use clubledger_core::DomainResult;
use clubledger_ledger::LedgerStore;

pub use daily::{DailySummary, TOP_ARTICLES};
pub use highscore::{HighscoreBoard, HighscoreConfig, HighscoreEntry, HighscorePeriod, ScoreMode};
pub use profit_loss::ProfitLoss;
pub use query::{ArticleSales, SaleRow};

/// Default number of leaderboard rows.
pub const HIGHSCORE_LIMIT: usize = 10;

/// Read-only report facade over a ledger store.
pub struct ReportingEngine<S> {
    store: S,
    highscore: HighscoreConfig,
}

impl<S: LedgerStore> ReportingEngine<S> {
    pub fn new(store: S, highscore: HighscoreConfig) -> Self {
        Self { store, highscore }
    }

    pub fn highscore(
        &self,
        period: HighscorePeriod,
        mode: ScoreMode,
    ) -> DomainResult<HighscoreBoard> {
        let now = Utc::now();
        let window_start = self.highscore.window_start(period, now);
        let entries = self.store.read(|tx| {
            highscore::compute(tx, &self.highscore, period, mode, now, HIGHSCORE_LIMIT)
        })?;
        Ok(HighscoreBoard {
            window_start,
            entries,
        })
    }

    pub fn daily_summary(&self, day: NaiveDate) -> DomainResult<DailySummary> {
        self.store.read(|tx| daily::compute(tx, day))
    }

    pub fn profit_loss(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<ProfitLoss> {
        self.store.read(|tx| profit_loss::compute(tx, from, to))
    }

    pub fn sales_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<SaleRow>> {
        self.store.read(|tx| query::active_sales_between(tx, from, to))
    }
}
