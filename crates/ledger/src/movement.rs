use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clubledger_core::{ArticleId, MovementId, Quantity};

/// Why stock moved.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Sale,
    Delivery,
    Inventory,
    Correction,
}

/// Append-only stock movement row.
///
/// The sum of all movements for an article equals its current stock; that
/// is the core conservation invariant of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub article_id: ArticleId,
    pub kind: MovementType,
    /// Signed delta in stock units.
    pub quantity: Quantity,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn new(
        id: MovementId,
        article_id: ArticleId,
        kind: MovementType,
        quantity: Quantity,
        reason: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            article_id,
            kind,
            quantity,
            reason: reason.into(),
            occurred_at,
        }
    }
}
