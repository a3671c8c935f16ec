//! Members domain module: customer accounts and balance rules.

pub mod customer;

pub use customer::Customer;
