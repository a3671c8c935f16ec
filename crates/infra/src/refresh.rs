//! Highscore refresher: keeps a cached leaderboard current by listening
//! for post-commit notices.

use std::sync::{Arc, RwLock};

use tracing::debug;

use clubledger_core::{DomainError, DomainResult};
use clubledger_events::{
    InMemoryEventBus, LedgerNotice, NoticeSink, NoticeWorker, WorkerHandle,
};
use clubledger_ledger::LedgerStore;
use clubledger_reporting::{
    highscore, HighscoreConfig, HighscoreEntry, HighscorePeriod, ScoreMode, HIGHSCORE_LIMIT,
};

/// Shared, always-readable snapshot of the current daily board.
#[derive(Debug, Default)]
pub struct HighscoreCache {
    entries: RwLock<Vec<HighscoreEntry>>,
}

impl HighscoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Vec<HighscoreEntry> {
        self.entries
            .read()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    fn replace(&self, entries: Vec<HighscoreEntry>) {
        if let Ok(mut slot) = self.entries.write() {
            *slot = entries;
        }
    }
}

/// Spawn a worker that recomputes the daily board whenever a sale commits
/// or is cancelled, then announces the change on the same bus.
///
/// `HighscoreChanged` notices are ignored on the way in, so the worker's
/// own announcements never feed back into it.
pub fn spawn_highscore_refresher<S>(
    store: S,
    bus: Arc<InMemoryEventBus<LedgerNotice>>,
    cache: Arc<HighscoreCache>,
    config: HighscoreConfig,
    mode: ScoreMode,
) -> WorkerHandle
where
    S: LedgerStore + 'static,
{
    let announce = Arc::clone(&bus);
    NoticeWorker::spawn("highscore-refresher", bus, move |notice: LedgerNotice| {
        match notice {
            LedgerNotice::SaleCommitted { .. } | LedgerNotice::SaleCancelled { .. } => {}
            LedgerNotice::StockAdjusted { .. } | LedgerNotice::HighscoreChanged { .. } => {
                return Ok(());
            }
        }

        let entries = recompute(&store, &config, mode)?;
        debug!(rows = entries.len(), "daily highscore refreshed");
        cache.replace(entries);
        announce.notify(LedgerNotice::HighscoreChanged {
            occurred_at: chrono::Utc::now(),
        });
        Ok::<(), DomainError>(())
    })
}

fn recompute<S: LedgerStore>(
    store: &S,
    config: &HighscoreConfig,
    mode: ScoreMode,
) -> DomainResult<Vec<HighscoreEntry>> {
    store.read(|tx| {
        highscore::compute(
            tx,
            config,
            HighscorePeriod::Daily,
            mode,
            chrono::Utc::now(),
            HIGHSCORE_LIMIT,
        )
    })
}
