//! Pure stock arithmetic for the order workflow.
//!
//! Everything here folds line items or detail rows into per-product signed
//! movements ([`StockAdjustment`]); applying them to product rows is the
//! store's job. Folding first means a request that names the same product
//! twice is checked and applied against the combined quantity.

use std::collections::BTreeMap;

use comptoir_catalog::StockAdjustment;
use comptoir_core::ProductId;

use crate::order::{LineItem, OrderDetail};

/// Sums requested quantities per product. Ordering is by product id so the
/// resulting movements are deterministic.
pub fn fold_line_items(items: &[LineItem]) -> BTreeMap<ProductId, i64> {
    let mut totals = BTreeMap::new();
    for item in items {
        *totals.entry(item.product_id).or_insert(0) += item.quantity;
    }
    totals
}

/// Movements that reserve stock for the given line items. Lines naming the
/// same product fold into a single negative delta.
pub fn reservation_deltas(items: &[LineItem]) -> Vec<StockAdjustment> {
    fold_line_items(items)
        .into_iter()
        .map(|(product_id, quantity)| StockAdjustment::new(product_id, -quantity))
        .collect()
}

/// Movements that give back everything the given detail rows reserved.
pub fn restoration_deltas(details: &[OrderDetail]) -> Vec<StockAdjustment> {
    let mut totals: BTreeMap<ProductId, i64> = BTreeMap::new();
    for detail in details {
        *totals.entry(detail.product_id).or_insert(0) += detail.order_quantity;
    }
    totals
        .into_iter()
        .map(|(product_id, quantity)| StockAdjustment::new(product_id, quantity))
        .collect()
}

/// Movements that turn the reservation held by `current` into the one
/// `requested` asks for. A product kept at the same quantity produces no
/// movement; a dropped product produces a positive delta, an added or grown
/// one a negative delta.
pub fn stock_deltas(current: &[OrderDetail], requested: &[LineItem]) -> Vec<StockAdjustment> {
    let mut deltas: BTreeMap<ProductId, i64> = BTreeMap::new();
    for detail in current {
        *deltas.entry(detail.product_id).or_insert(0) += detail.order_quantity;
    }
    for item in requested {
        *deltas.entry(item.product_id).or_insert(0) -= item.quantity;
    }
    deltas
        .into_iter()
        .filter(|(_, delta)| *delta != 0)
        .map(|(product_id, delta)| StockAdjustment::new(product_id, delta))
        .collect()
}

#[cfg(test)]
mod tests {
    use comptoir_core::OrderId;
    use uuid::Uuid;

    use super::*;

    fn pid(n: u128) -> ProductId {
        ProductId::from_uuid(Uuid::from_u128(n))
    }

    fn line(product: ProductId, quantity: i64) -> LineItem {
        LineItem {
            product_id: product,
            quantity,
        }
    }

    fn detail(order_id: OrderId, product: ProductId, quantity: i64) -> OrderDetail {
        OrderDetail::from_line_item(order_id, &line(product, quantity))
    }

    #[test]
    fn duplicate_lines_fold_into_one_reservation() {
        let p = pid(1);
        let deltas = reservation_deltas(&[line(p, 2), line(p, 3)]);
        assert_eq!(deltas, vec![StockAdjustment::new(p, -5)]);
    }

    #[test]
    fn unchanged_lines_produce_no_movement() {
        let order_id = OrderId::new();
        let p = pid(1);
        let current = vec![detail(order_id, p, 4)];
        let requested = vec![line(p, 4)];
        assert!(stock_deltas(&current, &requested).is_empty());
    }

    #[test]
    fn grown_dropped_and_added_products_each_get_their_delta() {
        let order_id = OrderId::new();
        let (kept, dropped, added) = (pid(1), pid(2), pid(3));
        let current = vec![detail(order_id, kept, 2), detail(order_id, dropped, 5)];
        let requested = vec![line(kept, 6), line(added, 1)];

        let deltas = stock_deltas(&current, &requested);
        assert_eq!(
            deltas,
            vec![
                StockAdjustment::new(kept, -4),
                StockAdjustment::new(dropped, 5),
                StockAdjustment::new(added, -1),
            ]
        );
    }

    #[test]
    fn restoration_gives_back_every_reserved_unit() {
        let order_id = OrderId::new();
        let p = pid(1);
        let q = pid(2);
        let details = vec![
            detail(order_id, p, 2),
            detail(order_id, p, 3),
            detail(order_id, q, 1),
        ];
        let deltas = restoration_deltas(&details);
        assert_eq!(
            deltas,
            vec![StockAdjustment::new(p, 5), StockAdjustment::new(q, 1)]
        );
    }
}

#[cfg(test)]
mod proptest_tests {
    use comptoir_core::OrderId;
    use proptest::prelude::*;
    use uuid::Uuid;

    use super::*;

    fn pid(n: usize) -> ProductId {
        ProductId::from_uuid(Uuid::from_u128(n as u128 + 1))
    }

    /// (product index, quantity) pairs over a pool of four products.
    fn lines() -> impl Strategy<Value = Vec<(usize, i64)>> {
        prop::collection::vec((0usize..4, 1i64..20), 0..8)
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 1000, ..ProptestConfig::default() })]

        #[test]
        fn update_deltas_conserve_units(current in lines(), requested in lines()) {
            let order_id = OrderId::new();
            let details: Vec<OrderDetail> = current
                .iter()
                .map(|(idx, qty)| OrderDetail {
                    id: comptoir_core::OrderDetailId::new(),
                    order_id,
                    product_id: pid(*idx),
                    order_quantity: *qty,
                })
                .collect();
            let items: Vec<LineItem> = requested
                .iter()
                .map(|(idx, qty)| LineItem { product_id: pid(*idx), quantity: *qty })
                .collect();

            // Expected per-product delta: reserved now minus reserved after.
            let mut expected: std::collections::BTreeMap<ProductId, i64> =
                std::collections::BTreeMap::new();
            for (idx, qty) in &current {
                *expected.entry(pid(*idx)).or_insert(0) += qty;
            }
            for (idx, qty) in &requested {
                *expected.entry(pid(*idx)).or_insert(0) -= qty;
            }

            let mut remaining = expected;
            for adj in stock_deltas(&details, &items) {
                prop_assert_eq!(remaining.remove(&adj.product_id), Some(adj.delta));
                prop_assert_ne!(adj.delta, 0);
            }
            // Products without a movement must have netted out to zero.
            prop_assert!(remaining.values().all(|d| *d == 0));
        }

        #[test]
        fn reservations_never_hand_stock_back(requested in lines()) {
            let items: Vec<LineItem> = requested
                .iter()
                .map(|(idx, qty)| LineItem { product_id: pid(*idx), quantity: *qty })
                .collect();
            let total: i64 = items.iter().map(|i| i.quantity).sum();

            let deltas = reservation_deltas(&items);
            prop_assert!(deltas.iter().all(|a| a.delta < 0));
            prop_assert_eq!(deltas.iter().map(|a| a.delta).sum::<i64>(), -total);
        }
    }
}
