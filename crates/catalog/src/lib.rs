//! `comptoir-catalog` — products and the categories that group them.
//!
//! Records here are plain data with validating constructors; persistence and
//! the order workflow live in `comptoir-infra`.

pub mod category;
pub mod product;

pub use category::{Category, CategoryFields};
pub use product::{Product, ProductFields, StockAdjustment};
