//! Product records for the back-office catalog.
//!
//! A product belongs to exactly one category and carries the on-hand stock
//! that the order workflow reserves and releases. Prices are held in the
//! smallest currency unit so arithmetic stays integral.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use comptoir_core::{CategoryId, DomainError, DomainResult, ProductId};

/// A sellable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit price in the smallest currency unit (cents).
    pub price: i64,
    /// Units available for new orders. Never negative once stored.
    pub quantity: i64,
    pub description: String,
    /// Reference to an externally hosted image, when one was supplied.
    pub image: Option<String>,
    pub category_id: CategoryId,
    pub created_at: DateTime<Utc>,
}

/// The caller-editable attributes of a [`Product`], shared by create and
/// full-replace update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFields {
    pub name: String,
    pub price: i64,
    pub quantity: i64,
    pub description: String,
    pub image: Option<String>,
    pub category_id: CategoryId,
}

impl ProductFields {
    fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if self.price < 0 {
            return Err(DomainError::validation("price cannot be negative"));
        }
        if self.quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        Ok(())
    }
}

impl Product {
    pub fn new(
        id: ProductId,
        fields: ProductFields,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        fields.validate()?;
        Ok(Self {
            id,
            name: fields.name,
            price: fields.price,
            quantity: fields.quantity,
            description: fields.description,
            image: fields.image,
            category_id: fields.category_id,
            created_at,
        })
    }

    /// Replaces every caller-editable attribute, keeping id and creation time.
    /// The record is untouched when validation fails.
    pub fn apply_fields(&mut self, fields: ProductFields) -> DomainResult<()> {
        fields.validate()?;
        self.name = fields.name;
        self.price = fields.price;
        self.quantity = fields.quantity;
        self.description = fields.description;
        self.image = fields.image;
        self.category_id = fields.category_id;
        Ok(())
    }

    /// Whether `requested` units can be taken from stock. A product with
    /// nothing on hand can never be ordered, and a request must not exceed
    /// what is available.
    pub fn has_stock_for(&self, requested: i64) -> bool {
        self.quantity != 0 && requested <= self.quantity
    }
}

/// A signed stock movement against one product. Negative deltas reserve
/// stock for an order, positive deltas give it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub product_id: ProductId,
    pub delta: i64,
}

impl StockAdjustment {
    pub fn new(product_id: ProductId, delta: i64) -> Self {
        Self { product_id, delta }
    }
}
