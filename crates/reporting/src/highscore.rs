//! Member leaderboard.
//!
//! Scores only count attributed, non-cancelled sales of articles flagged
//! for the highscore, so water and deposit articles stay out of the
//! ranking. Cancelling a sale lowers the buyer's score the next time the
//! board is computed.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use clubledger_core::{ArticleId, CustomerId, DomainError, DomainResult, Entity, Money, Quantity};
use clubledger_ledger::LedgerTx;

use crate::query::{self, SaleRow};

/// Which window the board covers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighscorePeriod {
    Daily,
    Yearly,
}

/// What a score measures.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    /// Money spent on qualifying articles.
    Amount,
    /// Units of qualifying articles bought.
    Count,
}

/// Leaderboard tuning.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighscoreConfig {
    /// Hour (UTC) at which the daily board resets. A club evening runs past
    /// midnight, so the daily window deliberately does not start at 00:00.
    pub daily_reset_hour: u32,
}

impl Default for HighscoreConfig {
    fn default() -> Self {
        Self {
            daily_reset_hour: 12,
        }
    }
}

impl HighscoreConfig {
    pub fn new(daily_reset_hour: u32) -> DomainResult<Self> {
        if daily_reset_hour >= 24 {
            return Err(DomainError::validation(
                "daily reset hour must be below 24",
            ));
        }
        Ok(Self { daily_reset_hour })
    }

    /// Start of the window containing `now`.
    ///
    /// Daily: the most recent reset-hour boundary at or before `now`.
    /// Yearly: January 1st, midnight, of the current year.
    pub fn window_start(&self, period: HighscorePeriod, now: DateTime<Utc>) -> DateTime<Utc> {
        match period {
            HighscorePeriod::Daily => {
                let today = now
                    .date_naive()
                    .and_hms_opt(self.daily_reset_hour, 0, 0)
                    .and_then(|dt| Utc.from_local_datetime(&dt).single())
                    .unwrap_or(now);
                if now.hour() >= self.daily_reset_hour {
                    today
                } else {
                    today - chrono::Duration::days(1)
                }
            }
            HighscorePeriod::Yearly => Utc
                .with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0)
                .single()
                .unwrap_or(now),
        }
    }
}

/// A computed leaderboard together with the window it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighscoreBoard {
    pub window_start: DateTime<Utc>,
    pub entries: Vec<HighscoreEntry>,
}

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighscoreEntry {
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub amount: Money,
    pub count: Quantity,
}

impl HighscoreEntry {
    fn score(&self, mode: ScoreMode) -> i64 {
        match mode {
            ScoreMode::Amount => self.amount.cents(),
            ScoreMode::Count => self.count.thousandths(),
        }
    }
}

/// Compute the board over the period's window ending at `now`.
///
/// Sort is stable with ties kept in first-scored order, so the member who
/// reached a score earlier ranks above a later arrival at the same score.
pub fn compute(
    tx: &dyn LedgerTx,
    config: &HighscoreConfig,
    period: HighscorePeriod,
    mode: ScoreMode,
    now: DateTime<Utc>,
    limit: usize,
) -> DomainResult<Vec<HighscoreEntry>> {
    let from = config.window_start(period, now);
    let sales = query::active_sales_between(tx, from, now)?;

    let qualifying: Vec<ArticleId> = tx
        .articles()?
        .iter()
        .filter(|a| a.counts_for_highscore())
        .map(|a| *a.id())
        .collect();
    let customers = tx.customers()?;

    let mut entries: Vec<HighscoreEntry> = Vec::new();
    for SaleRow { transaction, items } in &sales {
        let Some(customer_id) = transaction.customer_id else {
            continue;
        };
        for item in items {
            if !qualifying.contains(&item.article_id) {
                continue;
            }
            match entries.iter_mut().find(|e| e.customer_id == customer_id) {
                Some(entry) => {
                    entry.amount += item.total_price;
                    entry.count += item.quantity;
                }
                None => {
                    let name = customers
                        .iter()
                        .find(|c| *c.id() == customer_id)
                        .map(|c| c.name().to_owned())
                        .unwrap_or_else(|| customer_id.to_string());
                    entries.push(HighscoreEntry {
                        customer_id,
                        customer_name: name,
                        amount: item.total_price,
                        count: item.quantity,
                    });
                }
            }
        }
    }

    entries.sort_by(|a, b| b.score(mode).cmp(&a.score(mode)));
    entries.truncate(limit);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_window_starts_at_reset_hour() {
        let config = HighscoreConfig::default();
        let afternoon = Utc.with_ymd_and_hms(2025, 6, 14, 15, 0, 0).unwrap();
        assert_eq!(
            config.window_start(HighscorePeriod::Daily, afternoon),
            Utc.with_ymd_and_hms(2025, 6, 14, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn daily_window_before_reset_reaches_into_yesterday() {
        let config = HighscoreConfig::default();
        let small_hours = Utc.with_ymd_and_hms(2025, 6, 14, 2, 0, 0).unwrap();
        assert_eq!(
            config.window_start(HighscorePeriod::Daily, small_hours),
            Utc.with_ymd_and_hms(2025, 6, 13, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn yearly_window_starts_january_first() {
        let config = HighscoreConfig::default();
        let now = Utc.with_ymd_and_hms(2025, 6, 14, 2, 0, 0).unwrap();
        assert_eq!(
            config.window_start(HighscorePeriod::Yearly, now),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn reset_hour_must_be_a_valid_hour() {
        assert!(HighscoreConfig::new(24).is_err());
        assert_eq!(
            HighscoreConfig::new(18).unwrap().daily_reset_hour,
            18
        );
    }
}
