//! Customer records.
//!
//! Orders reference a customer by id; a customer with orders on file cannot
//! be deleted. Address and phone feed the order-entry snapshot endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use comptoir_core::{CustomerId, DomainError, DomainResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// Caller-editable attributes of a [`Customer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerFields {
    pub name: String,
    pub address: String,
    pub phone: String,
}

impl CustomerFields {
    fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("customer name cannot be empty"));
        }
        Ok(())
    }
}

impl Customer {
    pub fn new(
        id: CustomerId,
        fields: CustomerFields,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        fields.validate()?;
        Ok(Self {
            id,
            name: fields.name,
            address: fields.address,
            phone: fields.phone,
            created_at,
        })
    }

    pub fn apply_fields(&mut self, fields: CustomerFields) -> DomainResult<()> {
        fields.validate()?;
        self.name = fields.name;
        self.address = fields.address;
        self.phone = fields.phone;
        Ok(())
    }
}
