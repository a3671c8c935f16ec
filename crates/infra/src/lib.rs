//! Infrastructure: the in-memory store backend, deployment configuration,
//! and the background highscore refresher.

pub mod config;
pub mod refresh;
pub mod store;

pub use config::LedgerConfig;
pub use refresh::{spawn_highscore_refresher, HighscoreCache};
pub use store::InMemoryLedgerStore;

#[cfg(test)]
mod integration_tests;
