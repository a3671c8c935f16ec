//! Catalog domain module: articles and the stock policy.
//!
//! Pure business rules, no IO. Stock mutation itself goes through the
//! stock-ledger primitive in `clubledger-ledger`; this crate only decides
//! whether a given delta is admissible.

pub mod article;

pub use article::{Article, StockPolicy};
