use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clubledger_core::{ArticleId, DomainError, DomainResult, Entity, Money, Quantity};

/// Non-negative-stock policy.
///
/// `ForbidNegative` is the default for a club bar: you cannot sell what is
/// not on the shelf. `AllowNegative` exists for setups where the count lags
/// behind reality and is corrected later via physical inventory.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    #[default]
    ForbidNegative,
    AllowNegative,
}

/// Catalog article: something the club sells.
///
/// Articles are never deleted; they are deactivated so historical
/// transactions keep a valid reference. `stock` is mutated exclusively
/// through stock-ledger operations so it can never drift from the sum of
/// the article's movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    id: ArticleId,
    name: String,
    price: Money,
    stock: Quantity,
    min_stock: Quantity,
    /// Retail unit label (e.g. "bottle").
    unit: String,
    /// Stock units per purchase unit (e.g. 20 bottles per crate).
    purchase_unit_factor: Quantity,
    active: bool,
    counts_for_highscore: bool,
    created_at: DateTime<Utc>,
}

impl Article {
    pub fn new(
        id: ArticleId,
        name: impl Into<String>,
        price: Money,
        unit: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("article name cannot be empty"));
        }
        if price.is_negative() {
            return Err(DomainError::validation("article price cannot be negative"));
        }

        Ok(Self {
            id,
            name,
            price,
            stock: Quantity::ZERO,
            min_stock: Quantity::ZERO,
            unit: unit.into(),
            purchase_unit_factor: Quantity::ONE,
            active: true,
            counts_for_highscore: true,
            created_at: now,
        })
    }

    pub fn with_min_stock(mut self, min_stock: Quantity) -> Self {
        self.min_stock = min_stock;
        self
    }

    pub fn with_purchase_unit_factor(mut self, factor: Quantity) -> Self {
        self.purchase_unit_factor = factor;
        self
    }

    pub fn with_counts_for_highscore(mut self, counts: bool) -> Self {
        self.counts_for_highscore = counts;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn stock(&self) -> Quantity {
        self.stock
    }

    pub fn min_stock(&self) -> Quantity {
        self.min_stock
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn purchase_unit_factor(&self) -> Quantity {
        self.purchase_unit_factor
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn counts_for_highscore(&self) -> bool {
        self.counts_for_highscore
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the article can appear on a new sale.
    pub fn is_sellable(&self) -> bool {
        self.active
    }

    pub fn is_below_min_stock(&self) -> bool {
        self.stock < self.min_stock
    }

    /// Update the retail price. Historical transaction items keep their
    /// snapshot, so this never rewrites past reports.
    pub fn set_price(&mut self, price: Money) -> DomainResult<()> {
        if price.is_negative() {
            return Err(DomainError::validation("article price cannot be negative"));
        }
        self.price = price;
        Ok(())
    }

    /// Take the article off sale. Never deletes.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn reactivate(&mut self) {
        self.active = true;
    }

    /// Convert a purchase-unit quantity (crates) into stock units (bottles).
    pub fn purchase_to_stock_units(&self, purchase_qty: Quantity) -> Quantity {
        purchase_qty.mul_fixed(self.purchase_unit_factor)
    }

    /// The stock level a delta would produce, rejecting it under the
    /// non-negative policy. Does not mutate.
    pub fn stock_after(&self, delta: Quantity, policy: StockPolicy) -> DomainResult<Quantity> {
        let new_stock = self.stock + delta;
        if policy == StockPolicy::ForbidNegative && new_stock.is_negative() {
            return Err(DomainError::InsufficientStock {
                available: self.stock,
                required: -delta,
            });
        }
        Ok(new_stock)
    }

    /// Apply a stock delta under the given policy.
    ///
    /// Callers must append the matching movement row in the same unit of
    /// work; the stock-ledger primitive does both.
    pub fn apply_delta(&mut self, delta: Quantity, policy: StockPolicy) -> DomainResult<()> {
        self.stock = self.stock_after(delta, policy)?;
        Ok(())
    }
}

impl Entity for Article {
    type Id = ArticleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
