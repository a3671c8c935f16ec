//! Ledger domain module: the persisted record types, the persistence
//! boundary (atomic unit of work), and the stock-ledger primitive.
//!
//! Current stock and balances are always reconstructible from the
//! append-only movement/transaction history; the store keeps both in sync
//! inside one unit of work.

pub mod document;
pub mod fiscal;
pub mod movement;
pub mod stock;
pub mod store;
pub mod transaction;

pub use document::{OutgoingInvoice, PurchaseDocument};
pub use fiscal::{BankAccountBalance, FiscalYear, InventoryLine, YearEndReport};
pub use movement::{MovementType, StockMovement};
pub use stock::apply_stock_delta;
pub use store::{LedgerStore, LedgerTx};
pub use transaction::{
    PaymentMethod, Transaction, TransactionItem, TransactionType, items_total,
};
