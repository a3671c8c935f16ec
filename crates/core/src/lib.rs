//! `clubledger-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure
//! concerns): typed identifiers, the fixed-point money/quantity value
//! objects, and the shared error taxonomy.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod quantity;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ArticleId, CustomerId, DocumentId, FiscalYearId, MovementId, TransactionId, UserId};
pub use money::Money;
pub use quantity::Quantity;
pub use value_object::ValueObject;
