//! Runtime configuration, injected at wiring time.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use clubledger_catalog::StockPolicy;
use clubledger_reporting::HighscoreConfig;

/// Everything tunable about a ledger deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Whether sales may drive stock negative.
    pub stock_policy: StockPolicy,
    pub highscore: HighscoreConfig,
    /// How long a writer waits for the store lock before giving up with a
    /// retryable conflict.
    pub lock_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            stock_policy: StockPolicy::default(),
            highscore: HighscoreConfig::default(),
            lock_timeout_ms: 2_000,
        }
    }
}

impl LedgerConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}
