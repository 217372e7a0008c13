//! Cart line item persisted by clients.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::product::Product;

/// One cart line: a product snapshot and how many of it.
///
/// `product` is optional so that a partially corrupted persisted cart still
/// loads; such lines contribute nothing to totals and match no product id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(default)]
    pub product: Option<Product>,
    pub quantity: u32,
}

impl CartItem {
    /// A fresh line holding a single unit of `product`.
    #[must_use]
    pub const fn new(product: Product) -> Self {
        Self {
            product: Some(product),
            quantity: 1,
        }
    }

    /// The id of the product on this line, if there is one.
    #[must_use]
    pub fn product_id(&self) -> Option<ProductId> {
        self.product.as_ref().map(|p| p.id)
    }

    /// Unit price times quantity; zero when the product is missing.
    ///
    /// `None` if the product overflows `Decimal`, which only a tampered
    /// persisted cart can produce.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.product.as_ref().map_or(Some(Decimal::ZERO), |p| {
            p.price.checked_mul(Decimal::from(self.quantity))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total_without_product_is_zero() {
        let item: CartItem = serde_json::from_str(r#"{"product":null,"quantity":4}"#).unwrap();
        assert_eq!(item.product_id(), None);
        assert_eq!(item.line_total(), Some(Decimal::ZERO));
    }

    #[test]
    fn test_line_total_overflow_is_none() {
        let item: CartItem = serde_json::from_str(
            r#"{"product":{"id":1,"name":"x","price":"79000000000000000000000000000"},"quantity":2}"#,
        )
        .unwrap();
        assert_eq!(item.line_total(), None);

        let single = CartItem {
            quantity: 1,
            ..item
        };
        assert_eq!(
            single.line_total(),
            Some(Decimal::from_str_exact("79000000000000000000000000000").unwrap())
        );
    }
}
