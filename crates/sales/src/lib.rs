//! Write-side engines: sale booking, cancellation, stock operations, and
//! member account operations.
//!
//! Each engine wraps its whole operation into one `LedgerStore::execute`
//! unit of work and only afterwards emits notices and audit records, so a
//! subscriber can never observe a sale that did not commit.

mod account;
mod cancel;
mod sale;
mod stock;

pub use account::AccountOps;
pub use cancel::{CancellationEngine, CancellationOutcome};
pub use sale::{SaleEngine, SaleLine, SaleReceipt};
pub use stock::{InventoryCountOutcome, StockOps};
