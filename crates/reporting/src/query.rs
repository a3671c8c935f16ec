//! Shared read-side queries over the transaction log.
//!
//! Every report builds on the same notion of an "active sale": a sale row
//! that has not been cancelled. Refund rows never enter statistics, and a
//! cancelled sale drops out together with its refund, so cancellation
//! removes the pair from every report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clubledger_core::{ArticleId, DomainResult, Entity, Money, Quantity};
use clubledger_ledger::{LedgerTx, Transaction, TransactionItem, TransactionType};

/// A sale transaction joined with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRow {
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
}

/// Per-article aggregate over a set of sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSales {
    pub article_id: ArticleId,
    pub article_name: String,
    pub quantity: Quantity,
    pub revenue: Money,
}

/// Active (non-cancelled) sales with `created_at` in `[from, to)`, in
/// commit order.
pub fn active_sales_between(
    tx: &dyn LedgerTx,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> DomainResult<Vec<SaleRow>> {
    let mut rows = Vec::new();
    for transaction in tx.transactions()? {
        if transaction.kind != TransactionType::Sale
            || transaction.cancelled
            || transaction.created_at < from
            || transaction.created_at >= to
        {
            continue;
        }
        let items = tx.items_for(transaction.id)?;
        rows.push(SaleRow { transaction, items });
    }
    Ok(rows)
}

/// Cancelled sales with `created_at` in `[from, to)`, for audit views.
pub fn cancelled_sales_between(
    tx: &dyn LedgerTx,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> DomainResult<Vec<Transaction>> {
    Ok(tx
        .transactions()?
        .into_iter()
        .filter(|t| {
            t.kind == TransactionType::Sale
                && t.cancelled
                && t.created_at >= from
                && t.created_at < to
        })
        .collect())
}

/// Quantity and revenue per article across `sales`, ordered by revenue
/// descending. Articles sharing a revenue keep first-sold order.
pub fn revenue_by_article(
    tx: &dyn LedgerTx,
    sales: &[SaleRow],
) -> DomainResult<Vec<ArticleSales>> {
    let articles = tx.articles()?;
    let name_of = |id: ArticleId| {
        articles
            .iter()
            .find(|a| *a.id() == id)
            .map(|a| a.name().to_owned())
            .unwrap_or_else(|| id.to_string())
    };

    let mut totals: Vec<ArticleSales> = Vec::new();
    for sale in sales {
        for item in &sale.items {
            match totals.iter_mut().find(|t| t.article_id == item.article_id) {
                Some(entry) => {
                    entry.quantity += item.quantity;
                    entry.revenue += item.total_price;
                }
                None => totals.push(ArticleSales {
                    article_id: item.article_id,
                    article_name: name_of(item.article_id),
                    quantity: item.quantity,
                    revenue: item.total_price,
                }),
            }
        }
    }
    totals.sort_by(|a, b| b.revenue.cmp(&a.revenue));
    Ok(totals)
}

/// Revenue bucketed by UTC hour of day.
pub fn hourly_revenue(sales: &[SaleRow]) -> [Money; 24] {
    use chrono::Timelike;

    let mut buckets = [Money::ZERO; 24];
    for sale in sales {
        let hour = sale.transaction.created_at.hour() as usize;
        buckets[hour] += sale.transaction.total_amount;
    }
    buckets
}
