//! Orders owned by the order service.
//!
//! An [`Order`] is assembled once, from lines whose prices were frozen at
//! creation time, and is never mutated afterwards.

mod details;
mod request;

use chrono::{DateTime, SubsecRound, Utc};
use common::{AccountId, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

pub use details::{LineDetails, OrderDetails, ProductInfo};
pub use request::{OrderLineRequest, validate_request};

/// Largest quantity a single line may carry.
pub const MAX_QUANTITY: u32 = i32::MAX as u32;

/// A single product line with its price snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedLine {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price copied from the catalog when the order was created.
    pub price: Money,
}

impl OrderedLine {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32, price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            price,
        }
    }

    /// Returns `price * quantity`, or `None` if it overflows.
    pub fn line_total(&self) -> Option<Money> {
        self.price.checked_mul(self.quantity)
    }
}

/// A persisted order.
///
/// Invariants: `lines` is non-empty, every quantity is positive and
/// `total_price` equals the sum of the line totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub account_id: AccountId,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderedLine>,
    pub total_price: Money,
}

impl Order {
    /// Assembles a new order from priced lines, stamping a fresh id and time.
    ///
    /// The timestamp is truncated to microseconds, the precision the store keeps.
    pub fn new(account_id: AccountId, lines: Vec<OrderedLine>) -> Result<Self, DomainError> {
        let created_at = Utc::now().trunc_subsecs(6);
        Self::from_parts(OrderId::new(), account_id, created_at, lines)
    }

    /// Rebuilds an order from stored parts, re-checking every invariant.
    pub fn from_parts(
        id: OrderId,
        account_id: AccountId,
        created_at: DateTime<Utc>,
        lines: Vec<OrderedLine>,
    ) -> Result<Self, DomainError> {
        if lines.is_empty() {
            return Err(DomainError::NoLines);
        }

        let mut total_price = Money::zero();
        for line in &lines {
            if line.quantity == 0 || line.quantity > MAX_QUANTITY {
                return Err(DomainError::InvalidQuantity {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                });
            }
            if line.price.is_negative() {
                return Err(DomainError::InvalidPrice {
                    product_id: line.product_id.clone(),
                    price: line.price,
                });
            }
            total_price = line
                .line_total()
                .and_then(|line_total| total_price.checked_add(line_total))
                .ok_or_else(|| DomainError::AmountOverflow(line.product_id.clone()))?;
        }

        if !total_price.is_positive() {
            return Err(DomainError::NonPositiveTotal(total_price));
        }

        Ok(Self {
            id,
            account_id,
            created_at,
            lines,
            total_price,
        })
    }

    /// Returns the product ids on this order, in line order.
    pub fn product_ids(&self) -> impl Iterator<Item = &ProductId> {
        self.lines.iter().map(|line| &line.product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn account() -> AccountId {
        AccountId::new("acc-1")
    }

    #[test]
    fn test_total_is_sum_of_line_totals() {
        let order = Order::new(
            account(),
            vec![
                OrderedLine::new("prod-1", 2, Money::new(dec!(9.99))),
                OrderedLine::new("prod-2", 1, Money::new(dec!(5.00))),
            ],
        )
        .unwrap();

        assert_eq!(order.total_price, Money::new(dec!(24.98)));
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.account_id, account());
    }

    #[test]
    fn test_empty_order_rejected() {
        assert_eq!(Order::new(account(), vec![]), Err(DomainError::NoLines));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let result = Order::new(
            account(),
            vec![OrderedLine::new("prod-1", 0, Money::from_cents(100))],
        );
        assert!(matches!(result, Err(DomainError::InvalidQuantity { .. })));
    }

    #[test]
    fn test_zero_total_rejected() {
        let result = Order::new(
            account(),
            vec![OrderedLine::new("free", 3, Money::zero())],
        );
        assert_eq!(result, Err(DomainError::NonPositiveTotal(Money::zero())));
    }

    #[test]
    fn test_negative_price_rejected() {
        let result = Order::new(
            account(),
            vec![
                OrderedLine::new("prod-1", 1, Money::from_cents(1000)),
                OrderedLine::new("refund", 1, Money::from_cents(-100)),
            ],
        );
        assert!(matches!(result, Err(DomainError::InvalidPrice { .. })));
    }

    #[test]
    fn test_overflowing_total_rejected() {
        let huge = Money::new(rust_decimal::Decimal::MAX / rust_decimal::Decimal::from(2));
        let result = Order::new(account(), vec![OrderedLine::new("big", 3, huge)]);
        assert_eq!(
            result,
            Err(DomainError::AmountOverflow(ProductId::new("big")))
        );

        let result = Order::new(
            account(),
            vec![
                OrderedLine::new("big-1", 1, huge),
                OrderedLine::new("big-2", 1, huge),
                OrderedLine::new("big-3", 1, huge),
            ],
        );
        assert!(matches!(result, Err(DomainError::AmountOverflow(_))));
    }

    #[test]
    fn test_quantity_above_storable_range_rejected() {
        let result = Order::new(
            account(),
            vec![OrderedLine::new("prod-1", MAX_QUANTITY + 1, Money::from_cents(1))],
        );
        assert!(matches!(result, Err(DomainError::InvalidQuantity { .. })));
    }

    #[test]
    fn test_created_at_has_microsecond_precision() {
        let order = Order::new(
            account(),
            vec![OrderedLine::new("prod-1", 1, Money::from_cents(100))],
        )
        .unwrap();
        assert_eq!(order.created_at.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn test_from_parts_keeps_identity() {
        let id = OrderId::new();
        let created_at = Utc::now();
        let order = Order::from_parts(
            id,
            account(),
            created_at,
            vec![OrderedLine::new("prod-1", 1, Money::from_cents(250))],
        )
        .unwrap();

        assert_eq!(order.id, id);
        assert_eq!(order.created_at, created_at);
        assert_eq!(order.product_ids().count(), 1);
    }
}
