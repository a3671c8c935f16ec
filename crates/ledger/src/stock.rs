//! Stock-ledger primitive.

use chrono::{DateTime, Utc};

use clubledger_core::{ArticleId, DomainError, DomainResult, MovementId, Quantity};
use clubledger_catalog::{Article, StockPolicy};

use crate::movement::{MovementType, StockMovement};
use crate::store::LedgerTx;

/// Apply one signed stock delta: write the new stock level and append the
/// matching movement row, always as a pair inside the caller's unit of
/// work. The article row and its movement append are never visible
/// independently.
///
/// Used by delivery receipt, physical-inventory correction, and internally
/// by the sale/cancellation engines.
pub fn apply_stock_delta(
    tx: &mut dyn LedgerTx,
    article_id: ArticleId,
    delta: Quantity,
    reason: impl Into<String>,
    kind: MovementType,
    policy: StockPolicy,
    now: DateTime<Utc>,
) -> DomainResult<Article> {
    if delta.is_zero() {
        return Err(DomainError::validation("stock delta cannot be zero"));
    }

    let mut article = tx
        .article(article_id)?
        .ok_or(DomainError::not_found("article"))?;
    article.apply_delta(delta, policy)?;
    tx.put_article(article.clone())?;
    tx.append_movement(StockMovement::new(
        MovementId::new(),
        article_id,
        kind,
        delta,
        reason,
        now,
    ))?;

    Ok(article)
}
