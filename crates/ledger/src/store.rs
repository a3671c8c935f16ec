//! Persistence boundary: atomic multi-row read-modify-write.
//!
//! The traits here are the only way any engine touches persisted state.
//! `LedgerStore::execute` wraps one sale, cancellation, stock adjustment,
//! or closing into an all-or-nothing unit of work; partial application
//! (stock decremented but transaction row missing) is structurally
//! impossible, not just unlikely.

use clubledger_core::{ArticleId, CustomerId, DomainResult, FiscalYearId, TransactionId};
use clubledger_catalog::Article;
use clubledger_members::Customer;

use crate::document::{OutgoingInvoice, PurchaseDocument};
use crate::fiscal::{FiscalYear, YearEndReport};
use crate::movement::StockMovement;
use crate::transaction::{Transaction, TransactionItem};

/// Row-level access inside one unit of work.
///
/// Reads observe every write staged earlier in the same unit; nothing
/// becomes visible to other callers until the unit commits. List methods
/// return rows in commit order, which is what lets a reader reconstruct the
/// exact stock trajectory from the movement log.
pub trait LedgerTx {
    fn article(&self, id: ArticleId) -> DomainResult<Option<Article>>;
    fn put_article(&mut self, article: Article) -> DomainResult<()>;
    fn articles(&self) -> DomainResult<Vec<Article>>;

    fn customer(&self, id: CustomerId) -> DomainResult<Option<Customer>>;
    /// Insert or update; implementations enforce name uniqueness here.
    fn put_customer(&mut self, customer: Customer) -> DomainResult<()>;
    fn customers(&self) -> DomainResult<Vec<Customer>>;

    fn transaction(&self, id: TransactionId) -> DomainResult<Option<Transaction>>;
    /// Persist a new transaction together with its line items.
    fn insert_transaction(
        &mut self,
        transaction: Transaction,
        items: Vec<TransactionItem>,
    ) -> DomainResult<()>;
    /// Update an existing transaction (the cancelled-flag transition).
    fn update_transaction(&mut self, transaction: Transaction) -> DomainResult<()>;
    fn transactions(&self) -> DomainResult<Vec<Transaction>>;
    fn items_for(&self, id: TransactionId) -> DomainResult<Vec<TransactionItem>>;

    fn append_movement(&mut self, movement: StockMovement) -> DomainResult<()>;
    fn movements_for(&self, article_id: ArticleId) -> DomainResult<Vec<StockMovement>>;

    fn fiscal_year(&self, id: FiscalYearId) -> DomainResult<Option<FiscalYear>>;
    fn put_fiscal_year(&mut self, year: FiscalYear) -> DomainResult<()>;
    fn insert_report(&mut self, report: YearEndReport) -> DomainResult<()>;
    fn report_for(&self, id: FiscalYearId) -> DomainResult<Option<YearEndReport>>;

    fn put_purchase_document(&mut self, document: PurchaseDocument) -> DomainResult<()>;
    fn purchase_documents(&self) -> DomainResult<Vec<PurchaseDocument>>;
    fn put_outgoing_invoice(&mut self, invoice: OutgoingInvoice) -> DomainResult<()>;
    fn outgoing_invoices(&self) -> DomainResult<Vec<OutgoingInvoice>>;
}

/// Atomic unit-of-work boundary over the shared ledger state.
///
/// Implementations may block on lock acquisition but must bound the wait
/// and surface a retryable `ConcurrencyConflict` rather than blocking
/// indefinitely.
pub trait LedgerStore: Send + Sync {
    /// Run `f` as one atomic unit of work. Writes commit only when `f`
    /// returns `Ok`; on `Err` no staged write becomes visible.
    fn execute<R>(
        &self,
        f: impl FnOnce(&mut dyn LedgerTx) -> DomainResult<R>,
    ) -> DomainResult<R>;

    /// Run `f` against a consistent committed snapshot. The `&dyn` receiver
    /// makes writes uncallable, so this can never mutate persisted state.
    fn read<R>(&self, f: impl FnOnce(&dyn LedgerTx) -> DomainResult<R>) -> DomainResult<R>;
}

impl<S> LedgerStore for std::sync::Arc<S>
where
    S: LedgerStore,
{
    fn execute<R>(
        &self,
        f: impl FnOnce(&mut dyn LedgerTx) -> DomainResult<R>,
    ) -> DomainResult<R> {
        (**self).execute(f)
    }

    fn read<R>(&self, f: impl FnOnce(&dyn LedgerTx) -> DomainResult<R>) -> DomainResult<R> {
        (**self).read(f)
    }
}
