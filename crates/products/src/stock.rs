//! Stock movements.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tillstack_core::{DomainError, DomainResult};

use crate::ProductId;

/// Take `quantity` units out of `available`.
pub fn withdraw(product_name: &str, available: i64, quantity: i64) -> DomainResult<i64> {
    if quantity < 1 {
        return Err(DomainError::invariant("quantity must be at least 1"));
    }
    if available < quantity {
        return Err(DomainError::invariant(format!(
            "insufficient stock for product: {product_name}"
        )));
    }
    Ok(available - quantity)
}

/// Put `quantity` units back into stock.
pub fn restock(available: i64, quantity: i64) -> DomainResult<i64> {
    if quantity < 1 {
        return Err(DomainError::invariant("quantity must be at least 1"));
    }
    available
        .checked_add(quantity)
        .ok_or_else(|| DomainError::invariant("stock overflow"))
}

/// One requested movement of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Merge duplicate product lines by summing quantities.
///
/// The result is ordered by product id, which is also the row lock order.
pub fn merge_requests(
    requests: impl IntoIterator<Item = StockRequest>,
) -> DomainResult<Vec<StockRequest>> {
    let mut merged: BTreeMap<ProductId, i64> = BTreeMap::new();
    for r in requests {
        let q = merged.entry(r.product_id).or_insert(0);
        *q = q
            .checked_add(r.quantity)
            .ok_or_else(|| DomainError::invariant("quantity overflow"))?;
    }
    Ok(merged
        .into_iter()
        .map(|(product_id, quantity)| StockRequest {
            product_id,
            quantity,
        })
        .collect())
}
