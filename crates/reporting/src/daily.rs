//! End-of-day summary.
//!
//! Unlike the highscore, the summary covers the calendar day (UTC
//! midnight to midnight); bookkeeping wants days that match the calendar
//! even when club evenings straddle midnight.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use clubledger_core::{DomainError, DomainResult, Money};
use clubledger_ledger::{LedgerTx, PaymentMethod};

use crate::query::{self, ArticleSales};

/// How many best-selling articles a summary lists.
pub const TOP_ARTICLES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    pub day: NaiveDate,
    pub transaction_count: usize,
    pub total_revenue: Money,
    pub cash_revenue: Money,
    pub account_revenue: Money,
    /// Sales of the day that were later cancelled. Not part of revenue;
    /// listed so the day's till count can be explained.
    pub cancelled_count: usize,
    pub cancelled_total: Money,
    /// Best sellers by revenue, at most [`TOP_ARTICLES`] entries.
    pub top_articles: Vec<ArticleSales>,
    /// Revenue per UTC hour of day.
    pub hourly_revenue: [Money; 24],
}

pub fn compute(tx: &dyn LedgerTx, day: NaiveDate) -> DomainResult<DailySummary> {
    let (from, to) = day_bounds(day)?;
    let sales = query::active_sales_between(tx, from, to)?;

    let mut cash_revenue = Money::ZERO;
    let mut account_revenue = Money::ZERO;
    for sale in &sales {
        match sale.transaction.payment_method {
            PaymentMethod::Cash => cash_revenue += sale.transaction.total_amount,
            PaymentMethod::Account => account_revenue += sale.transaction.total_amount,
        }
    }

    let mut top_articles = query::revenue_by_article(tx, &sales)?;
    top_articles.truncate(TOP_ARTICLES);

    let cancelled = query::cancelled_sales_between(tx, from, to)?;

    Ok(DailySummary {
        day,
        transaction_count: sales.len(),
        total_revenue: cash_revenue + account_revenue,
        cash_revenue,
        account_revenue,
        cancelled_count: cancelled.len(),
        cancelled_total: cancelled.iter().map(|t| t.total_amount).sum(),
        top_articles,
        hourly_revenue: query::hourly_revenue(&sales),
    })
}

fn day_bounds(day: NaiveDate) -> DomainResult<(DateTime<Utc>, DateTime<Utc>)> {
    let start = day
        .and_hms_opt(0, 0, 0)
        .and_then(|dt| Utc.from_local_datetime(&dt).single())
        .ok_or_else(|| DomainError::validation("invalid summary day"))?;
    Ok((start, start + chrono::Duration::days(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_bounds_cover_one_calendar_day() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
        let (from, to) = day_bounds(day).unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2025, 6, 14, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap());
    }
}
