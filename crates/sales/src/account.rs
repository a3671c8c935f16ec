//! Member account operations: registration, prepaid top-ups, balance
//! lookups.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;

use clubledger_core::{CustomerId, DomainError, DomainResult, Entity, Money, UserId};
use clubledger_events::{AuditRecord, AuditSink};
use clubledger_ledger::LedgerStore;
use clubledger_members::Customer;

pub struct AccountOps<S> {
    store: S,
    audit: Option<Arc<dyn AuditSink>>,
}

impl<S: LedgerStore> AccountOps<S> {
    pub fn new(store: S) -> Self {
        Self { store, audit: None }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Register a new member with a zero balance. Names are unique; the
    /// store rejects a duplicate.
    pub fn register_customer(
        &self,
        name: impl Into<String>,
        acting_user: UserId,
    ) -> DomainResult<Customer> {
        let now = Utc::now();
        let customer = Customer::new(CustomerId::new(), name, now)?;

        let registered = customer.clone();
        self.store.execute(move |tx| tx.put_customer(customer))?;

        info!(customer_id = %registered.id(), "customer registered");
        if let Some(audit) = &self.audit {
            audit.record(AuditRecord {
                actor: acting_user,
                action: "customer.register",
                entity_type: "customer",
                entity_id: registered.id().to_string(),
                detail: json!({ "name": registered.name() }),
                occurred_at: now,
            });
        }
        Ok(registered)
    }

    /// Load cash onto a member's prepaid account.
    pub fn top_up(
        &self,
        customer_id: CustomerId,
        amount: Money,
        acting_user: UserId,
    ) -> DomainResult<Customer> {
        let now = Utc::now();

        let customer = self.store.execute(|tx| {
            let mut customer = tx
                .customer(customer_id)?
                .ok_or(DomainError::not_found("customer"))?;
            customer.top_up(amount, now)?;
            tx.put_customer(customer.clone())?;
            Ok(customer)
        })?;

        info!(
            customer_id = %customer_id,
            amount = %amount,
            balance = %customer.balance(),
            "account topped up"
        );
        if let Some(audit) = &self.audit {
            audit.record(AuditRecord {
                actor: acting_user,
                action: "account.top_up",
                entity_type: "customer",
                entity_id: customer_id.to_string(),
                detail: json!({
                    "amount_cents": amount.cents(),
                    "balance_cents": customer.balance().cents(),
                }),
                occurred_at: now,
            });
        }
        Ok(customer)
    }

    /// Current prepaid balance.
    pub fn balance_of(&self, customer_id: CustomerId) -> DomainResult<Money> {
        self.store.read(|tx| {
            let customer = tx
                .customer(customer_id)?
                .ok_or(DomainError::not_found("customer"))?;
            Ok(customer.balance())
        })
    }
}
