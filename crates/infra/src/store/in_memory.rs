//! In-memory ledger store (single-process deployments and tests).
//!
//! Commit protocol: `execute` clones the committed state, runs the unit of
//! work against the clone, and swaps the clone in only on `Ok`. A failing
//! unit of work therefore leaves the committed state untouched without any
//! undo logic. Writers serialize on one lock with a bounded wait; a writer
//! that cannot acquire it in time gets a retryable `ConcurrencyConflict`
//! instead of blocking forever.

use std::sync::{Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use clubledger_core::{
    ArticleId, CustomerId, DomainError, DomainResult, Entity, FiscalYearId, TransactionId,
};
use clubledger_catalog::Article;
use clubledger_ledger::{
    FiscalYear, LedgerStore, LedgerTx, OutgoingInvoice, PurchaseDocument, StockMovement,
    Transaction, TransactionItem, YearEndReport, items_total,
};
use clubledger_members::Customer;

const LOCK_RETRY_PAUSE: Duration = Duration::from_micros(250);

/// Committed ledger state. Also serves as the staged state during a unit
/// of work, which is what makes staged writes visible to later reads in
/// the same unit.
#[derive(Debug, Default, Clone)]
struct LedgerState {
    articles: Vec<Article>,
    customers: Vec<Customer>,
    transactions: Vec<Transaction>,
    items: Vec<TransactionItem>,
    movements: Vec<StockMovement>,
    fiscal_years: Vec<FiscalYear>,
    reports: Vec<YearEndReport>,
    purchases: Vec<PurchaseDocument>,
    invoices: Vec<OutgoingInvoice>,
}

impl LedgerTx for LedgerState {
    fn article(&self, id: ArticleId) -> DomainResult<Option<Article>> {
        Ok(self.articles.iter().find(|a| *a.id() == id).cloned())
    }

    fn put_article(&mut self, article: Article) -> DomainResult<()> {
        match self.articles.iter_mut().find(|a| a.id() == article.id()) {
            Some(slot) => *slot = article,
            None => self.articles.push(article),
        }
        Ok(())
    }

    fn articles(&self) -> DomainResult<Vec<Article>> {
        Ok(self.articles.clone())
    }

    fn customer(&self, id: CustomerId) -> DomainResult<Option<Customer>> {
        Ok(self.customers.iter().find(|c| *c.id() == id).cloned())
    }

    fn put_customer(&mut self, customer: Customer) -> DomainResult<()> {
        let taken = self
            .customers
            .iter()
            .any(|c| c.id() != customer.id() && c.name() == customer.name());
        if taken {
            return Err(DomainError::validation(format!(
                "customer name '{}' is already taken",
                customer.name()
            )));
        }
        match self.customers.iter_mut().find(|c| c.id() == customer.id()) {
            Some(slot) => *slot = customer,
            None => self.customers.push(customer),
        }
        Ok(())
    }

    fn customers(&self) -> DomainResult<Vec<Customer>> {
        Ok(self.customers.clone())
    }

    fn transaction(&self, id: TransactionId) -> DomainResult<Option<Transaction>> {
        Ok(self.transactions.iter().find(|t| t.id == id).cloned())
    }

    fn insert_transaction(
        &mut self,
        transaction: Transaction,
        items: Vec<TransactionItem>,
    ) -> DomainResult<()> {
        if self.transactions.iter().any(|t| t.id == transaction.id) {
            return Err(DomainError::invalid_state("transaction already exists"));
        }
        if items_total(&items) != transaction.total_amount {
            return Err(DomainError::validation(
                "transaction total does not match its line items",
            ));
        }
        if items.iter().any(|i| i.transaction_id != transaction.id) {
            return Err(DomainError::validation(
                "line item belongs to a different transaction",
            ));
        }
        self.transactions.push(transaction);
        self.items.extend(items);
        Ok(())
    }

    fn update_transaction(&mut self, transaction: Transaction) -> DomainResult<()> {
        let slot = self
            .transactions
            .iter_mut()
            .find(|t| t.id == transaction.id)
            .ok_or(DomainError::not_found("transaction"))?;
        *slot = transaction;
        Ok(())
    }

    fn transactions(&self) -> DomainResult<Vec<Transaction>> {
        Ok(self.transactions.clone())
    }

    fn items_for(&self, id: TransactionId) -> DomainResult<Vec<TransactionItem>> {
        Ok(self
            .items
            .iter()
            .filter(|i| i.transaction_id == id)
            .cloned()
            .collect())
    }

    fn append_movement(&mut self, movement: StockMovement) -> DomainResult<()> {
        self.movements.push(movement);
        Ok(())
    }

    fn movements_for(&self, article_id: ArticleId) -> DomainResult<Vec<StockMovement>> {
        Ok(self
            .movements
            .iter()
            .filter(|m| m.article_id == article_id)
            .cloned()
            .collect())
    }

    fn fiscal_year(&self, id: FiscalYearId) -> DomainResult<Option<FiscalYear>> {
        Ok(self.fiscal_years.iter().find(|y| y.id == id).cloned())
    }

    fn put_fiscal_year(&mut self, year: FiscalYear) -> DomainResult<()> {
        match self.fiscal_years.iter_mut().find(|y| y.id == year.id) {
            Some(slot) => *slot = year,
            None => self.fiscal_years.push(year),
        }
        Ok(())
    }

    fn insert_report(&mut self, report: YearEndReport) -> DomainResult<()> {
        if self
            .reports
            .iter()
            .any(|r| r.fiscal_year_id == report.fiscal_year_id)
        {
            return Err(DomainError::invalid_state(
                "fiscal year already has a report",
            ));
        }
        self.reports.push(report);
        Ok(())
    }

    fn report_for(&self, id: FiscalYearId) -> DomainResult<Option<YearEndReport>> {
        Ok(self.reports.iter().find(|r| r.fiscal_year_id == id).cloned())
    }

    fn put_purchase_document(&mut self, document: PurchaseDocument) -> DomainResult<()> {
        match self.purchases.iter_mut().find(|d| d.id == document.id) {
            Some(slot) => *slot = document,
            None => self.purchases.push(document),
        }
        Ok(())
    }

    fn purchase_documents(&self) -> DomainResult<Vec<PurchaseDocument>> {
        Ok(self.purchases.clone())
    }

    fn put_outgoing_invoice(&mut self, invoice: OutgoingInvoice) -> DomainResult<()> {
        match self.invoices.iter_mut().find(|i| i.id == invoice.id) {
            Some(slot) => *slot = invoice,
            None => self.invoices.push(invoice),
        }
        Ok(())
    }

    fn outgoing_invoices(&self) -> DomainResult<Vec<OutgoingInvoice>> {
        Ok(self.invoices.clone())
    }
}

/// Lock-based in-memory store.
#[derive(Debug)]
pub struct InMemoryLedgerStore {
    state: Mutex<LedgerState>,
    lock_timeout: Duration,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(Duration::from_secs(2))
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            lock_timeout,
        }
    }

    fn lock(&self) -> DomainResult<MutexGuard<'_, LedgerState>> {
        let deadline = Instant::now() + self.lock_timeout;
        loop {
            match self.state.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::Poisoned(_)) => {
                    return Err(DomainError::persistence("ledger state lock poisoned"));
                }
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return Err(DomainError::ConcurrencyConflict);
                    }
                    thread::sleep(LOCK_RETRY_PAUSE);
                }
            }
        }
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn execute<R>(
        &self,
        f: impl FnOnce(&mut dyn LedgerTx) -> DomainResult<R>,
    ) -> DomainResult<R> {
        let mut committed = self.lock()?;
        let mut staged = committed.clone();
        let result = f(&mut staged)?;
        *committed = staged;
        Ok(result)
    }

    fn read<R>(&self, f: impl FnOnce(&dyn LedgerTx) -> DomainResult<R>) -> DomainResult<R> {
        let committed = self.lock()?;
        f(&*committed)
    }
}
