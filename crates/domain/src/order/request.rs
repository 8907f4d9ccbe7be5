use std::collections::HashSet;

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

use super::MAX_QUANTITY;

/// A line as requested by a caller, before prices are known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl OrderLineRequest {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Checks the shape of a create-order request.
///
/// Lines must be non-empty, quantities in `1..=MAX_QUANTITY` and product
/// ids unique.
pub fn validate_request(lines: &[OrderLineRequest]) -> Result<(), DomainError> {
    if lines.is_empty() {
        return Err(DomainError::NoLines);
    }

    let mut seen = HashSet::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 || line.quantity > MAX_QUANTITY {
            return Err(DomainError::InvalidQuantity {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
            });
        }
        if !seen.insert(&line.product_id) {
            return Err(DomainError::DuplicateProduct(line.product_id.clone()));
        }
    }

    Ok(())
}
