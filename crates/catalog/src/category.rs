//! Categories group products in the back office.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use comptoir_core::{CategoryId, DomainError, DomainResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Caller-editable attributes of a [`Category`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFields {
    pub name: String,
}

impl CategoryFields {
    fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("category name cannot be empty"));
        }
        Ok(())
    }
}

impl Category {
    pub fn new(
        id: CategoryId,
        fields: CategoryFields,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        fields.validate()?;
        Ok(Self {
            id,
            name: fields.name,
            created_at,
        })
    }

    pub fn apply_fields(&mut self, fields: CategoryFields) -> DomainResult<()> {
        fields.validate()?;
        self.name = fields.name;
        Ok(())
    }
}
