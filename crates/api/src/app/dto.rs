//! Request DTOs.
//!
//! Ids arrive as strings and are parsed in the handlers so a malformed id
//! answers 400 instead of a serde error. List endpoints take `page` and
//! `per_page` query params with a per-resource default page size.

use chrono::NaiveDate;
use serde::Deserialize;

use comptoir_infra::Page;

/// `?page=&per_page=` with a per-resource default page size.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    pub fn to_page(self, default_per_page: u32) -> Page {
        Page::new(
            self.page.unwrap_or(1),
            self.per_page.unwrap_or(default_per_page),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    /// Unit price in the smallest currency unit.
    pub price: i64,
    pub quantity: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    pub category_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CustomerRequest {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct LineItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub customer_id: String,
    pub order_date: NaiveDate,
    pub line_items: Vec<LineItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    pub customer_id: String,
    pub order_date: NaiveDate,
    pub line_items: Vec<LineItemRequest>,
}
