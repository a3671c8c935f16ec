use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clubledger_core::{ArticleId, CustomerId, Money, Quantity, TransactionId};

/// Post-commit notification pushed to subscribers (signage viewers,
/// the highscore refresher, ...).
///
/// Notices are published only after the originating unit of work has
/// committed; they are outside the consistency boundary and carry just
/// enough data for a consumer to decide whether to re-read the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerNotice {
    SaleCommitted {
        transaction_id: TransactionId,
        customer_id: Option<CustomerId>,
        total: Money,
        occurred_at: DateTime<Utc>,
    },
    SaleCancelled {
        original_id: TransactionId,
        refund_id: TransactionId,
        customer_id: Option<CustomerId>,
        occurred_at: DateTime<Utc>,
    },
    StockAdjusted {
        article_id: ArticleId,
        delta: Quantity,
        new_stock: Quantity,
        occurred_at: DateTime<Utc>,
    },
    HighscoreChanged {
        occurred_at: DateTime<Utc>,
    },
}

impl LedgerNotice {
    /// Stable notice name (e.g. "ledger.sale.committed").
    pub fn notice_type(&self) -> &'static str {
        match self {
            LedgerNotice::SaleCommitted { .. } => "ledger.sale.committed",
            LedgerNotice::SaleCancelled { .. } => "ledger.sale.cancelled",
            LedgerNotice::StockAdjusted { .. } => "ledger.stock.adjusted",
            LedgerNotice::HighscoreChanged { .. } => "ledger.highscore.changed",
        }
    }

    /// When the underlying operation committed (business time).
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerNotice::SaleCommitted { occurred_at, .. }
            | LedgerNotice::SaleCancelled { occurred_at, .. }
            | LedgerNotice::StockAdjusted { occurred_at, .. }
            | LedgerNotice::HighscoreChanged { occurred_at } => *occurred_at,
        }
    }
}

/// Best-effort sink for post-commit notices.
///
/// Implementations must swallow their own failures (log and drop); callers
/// invoke this after commit and must never see an error from it.
pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: LedgerNotice);
}
