//! `comptoir-customers` — customer records for the back office.

pub mod customer;

pub use customer::{Customer, CustomerFields};
