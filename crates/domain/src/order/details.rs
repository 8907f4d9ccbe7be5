use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{AccountId, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::product::Product;

use super::Order;

/// Display metadata for a product, fetched fresh from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub name: String,
    pub description: String,
}

impl From<&Product> for ProductInfo {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
        }
    }
}

/// A stored line joined with current catalog metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDetails {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Frozen unit price from the stored order, never the current catalog price.
    pub price: Money,
    /// `None` when the catalog could not resolve the product.
    pub product: Option<ProductInfo>,
}

/// A stored order with its lines enriched for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub id: OrderId,
    pub account_id: AccountId,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<LineDetails>,
    pub total_price: Money,
}

impl OrderDetails {
    /// Joins an order with whatever catalog products are available.
    pub fn enrich(order: Order, catalog: &HashMap<ProductId, Product>) -> Self {
        let lines = order
            .lines
            .into_iter()
            .map(|line| LineDetails {
                product: catalog.get(&line.product_id).map(ProductInfo::from),
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.price,
            })
            .collect();

        Self {
            id: order.id,
            account_id: order.account_id,
            created_at: order.created_at,
            lines,
            total_price: order.total_price,
        }
    }

    /// Returns true if every line has catalog metadata attached.
    pub fn is_fully_enriched(&self) -> bool {
        self.lines.iter().all(|line| line.product.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderedLine;

    #[test]
    fn test_enrich_keeps_frozen_price_and_tolerates_gaps() {
        let order = Order::new(
            AccountId::new("acc-1"),
            vec![
                OrderedLine::new("prod-1", 2, Money::from_cents(999)),
                OrderedLine::new("gone", 1, Money::from_cents(500)),
            ],
        )
        .unwrap();

        let mut catalog = HashMap::new();
        catalog.insert(
            ProductId::new("prod-1"),
            Product::new("prod-1", "Widget", "A widget", Money::from_cents(1299)),
        );

        let details = OrderDetails::enrich(order.clone(), &catalog);

        assert_eq!(details.id, order.id);
        assert_eq!(details.total_price, order.total_price);
        assert_eq!(details.lines[0].price, Money::from_cents(999));
        assert_eq!(details.lines[0].product.as_ref().unwrap().name, "Widget");
        assert!(details.lines[1].product.is_none());
        assert!(!details.is_fully_enriched());
    }
}
