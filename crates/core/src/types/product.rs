//! Catalog product types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Errors raised when validating product input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductError {
    /// Product name is blank.
    #[error("product name cannot be empty")]
    EmptyName,
    /// Price is below zero.
    #[error("product price cannot be negative")]
    NegativePrice,
}

/// A catalog product.
///
/// The same shape is served by the API and snapshotted into client carts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Server-assigned identifier.
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Unit price, never negative.
    pub price: Decimal,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image_url: String,
}

/// Product fields supplied by an administrator; the id is assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image_url: String,
}

impl NewProduct {
    /// Check the invariants the catalog relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ProductError`] for a blank name or a negative price.
    pub fn validate(&self) -> Result<(), ProductError> {
        if self.name.trim().is_empty() {
            return Err(ProductError::EmptyName);
        }
        if self.price < Decimal::ZERO {
            return Err(ProductError::NegativePrice);
        }
        Ok(())
    }

    /// Attach a server-assigned id.
    #[must_use]
    pub fn with_id(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            category: self.category,
            image_url: self.image_url,
        }
    }
}

impl From<Product> for NewProduct {
    fn from(product: Product) -> Self {
        Self {
            name: product.name,
            description: product.description,
            price: product.price,
            category: product.category,
            image_url: product.image_url,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lube() -> NewProduct {
        NewProduct {
            name: "Water Based Lube".to_owned(),
            description: "Natural feel".to_owned(),
            price: Decimal::new(999, 2),
            category: "Essentials".to_owned(),
            image_url: String::new(),
        }
    }

    #[test]
    fn test_validate() {
        assert!(lube().validate().is_ok());

        let mut free = lube();
        free.price = Decimal::ZERO;
        assert!(free.validate().is_ok());

        let mut negative = lube();
        negative.price = Decimal::new(-1, 2);
        assert_eq!(negative.validate(), Err(ProductError::NegativePrice));

        let mut blank = lube();
        blank.name = "   ".to_owned();
        assert_eq!(blank.validate(), Err(ProductError::EmptyName));
    }

    #[test]
    fn test_json_uses_camel_case_and_accepts_numeric_price() {
        let product: Product = serde_json::from_str(
            r#"{"id":3,"name":"Blindfold","price":7.5,"imageUrl":"https://img/b.png"}"#,
        )
        .unwrap();
        assert_eq!(product.id, ProductId::new(3));
        assert_eq!(product.price, Decimal::new(75, 1));
        assert_eq!(product.image_url, "https://img/b.png");
        assert!(product.category.is_empty());
    }
}
