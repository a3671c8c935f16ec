//! Profit and loss over an arbitrary window.
//!
//! Income is sale revenue (active sales only). Expenses are paid purchase
//! documents, dated by payment, not by creation; an unpaid invoice is a
//! commitment, not yet a cost. Extra income is paid outgoing invoices,
//! e.g. renting out the club room.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clubledger_core::{DomainError, DomainResult, Money};
use clubledger_ledger::{LedgerTx, PaymentMethod};

use crate::query::{self, ArticleSales};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitLoss {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub income: Money,
    pub cash_income: Money,
    pub account_income: Money,
    pub expenses: Money,
    pub extra_income: Money,
    /// `income + extra_income - expenses`.
    pub profit: Money,
    pub income_by_article: Vec<ArticleSales>,
    pub expenses_by_supplier: Vec<(String, Money)>,
    pub expenses_by_category: Vec<(String, Money)>,
}

pub fn compute(
    tx: &dyn LedgerTx,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> DomainResult<ProfitLoss> {
    if from >= to {
        return Err(DomainError::validation(
            "profit/loss window start must precede its end",
        ));
    }

    let sales = query::active_sales_between(tx, from, to)?;
    let mut cash_income = Money::ZERO;
    let mut account_income = Money::ZERO;
    for sale in &sales {
        match sale.transaction.payment_method {
            PaymentMethod::Cash => cash_income += sale.transaction.total_amount,
            PaymentMethod::Account => account_income += sale.transaction.total_amount,
        }
    }
    let income = cash_income + account_income;
    let income_by_article = query::revenue_by_article(tx, &sales)?;

    let mut expenses = Money::ZERO;
    let mut expenses_by_supplier: Vec<(String, Money)> = Vec::new();
    let mut expenses_by_category: Vec<(String, Money)> = Vec::new();
    for document in tx.purchase_documents()? {
        let Some(paid_at) = document.paid_at else {
            continue;
        };
        if paid_at < from || paid_at >= to {
            continue;
        }
        expenses += document.amount;
        bump(&mut expenses_by_supplier, &document.supplier, document.amount);
        bump(&mut expenses_by_category, &document.category, document.amount);
    }
    expenses_by_supplier.sort_by(|a, b| b.1.cmp(&a.1));
    expenses_by_category.sort_by(|a, b| b.1.cmp(&a.1));

    let extra_income: Money = tx
        .outgoing_invoices()?
        .iter()
        .filter(|i| i.paid_at.is_some_and(|p| p >= from && p < to))
        .map(|i| i.amount)
        .sum();

    Ok(ProfitLoss {
        from,
        to,
        income,
        cash_income,
        account_income,
        expenses,
        extra_income,
        profit: income + extra_income - expenses,
        income_by_article,
        expenses_by_supplier,
        expenses_by_category,
    })
}

fn bump(totals: &mut Vec<(String, Money)>, key: &str, amount: Money) {
    match totals.iter_mut().find(|(k, _)| k == key) {
        Some((_, sum)) => *sum += amount,
        None => totals.push((key.to_owned(), amount)),
    }
}
