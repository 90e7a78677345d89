//! Sibling order values.
//!
//! At rest, the `order` values of a container's N members are exactly 1..N,
//! and so are those of the workspace's roots. Every function here returns a
//! new sequence satisfying that, even when its input has gaps or duplicates:
//! input is stably sorted by `order` first, so ties keep their incoming
//! relative position.

use uuid::Uuid;

use crate::models::{Member, Root};

/// Anything kept in a dense 1..N sequence.
pub trait Ordered: Clone {
    fn id(&self) -> Uuid;
    fn order(&self) -> u32;
    fn set_order(&mut self, order: u32);
}

impl Ordered for Member {
    fn id(&self) -> Uuid {
        self.id
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

impl Ordered for Root {
    fn id(&self) -> Uuid {
        self.id
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

/// Stable sort by `order`.
pub fn sorted<T: Ordered>(mut items: Vec<T>) -> Vec<T> {
    items.sort_by_key(Ordered::order);
    items
}

/// Assign 1..N by position, ignoring the current `order` values.
pub fn renumber<T: Ordered>(mut items: Vec<T>) -> Vec<T> {
    for (index, item) in items.iter_mut().enumerate() {
        item.set_order(index as u32 + 1);
    }
    items
}

/// Assign 1..N following the items' current relative order.
pub fn densify<T: Ordered>(items: Vec<T>) -> Vec<T> {
    renumber(sorted(items))
}

/// Whether the `order` values are exactly {1..N}.
pub fn is_dense<T: Ordered>(items: &[T]) -> bool {
    let mut orders: Vec<u32> = items.iter().map(Ordered::order).collect();
    orders.sort_unstable();
    orders
        .iter()
        .enumerate()
        .all(|(index, order)| *order == index as u32 + 1)
}

/// Insert `new_item` so it ends up at `index` (clamped), then densify.
///
/// With dense input, items before `index` keep their order and items from
/// `index` on move up by one.
pub fn insert_at<T: Ordered>(items: &[T], new_item: T, index: usize) -> Vec<T> {
    let mut ordered = sorted(items.to_vec());
    let index = index.min(ordered.len());
    ordered.insert(index, new_item);
    renumber(ordered)
}

/// Append `new_item` as the last sibling (`order = len + 1` for dense input).
pub fn append<T: Ordered>(items: &[T], new_item: T) -> Vec<T> {
    insert_at(items, new_item, items.len())
}

/// Remove `removed` and close the gap it leaves.
///
/// Only siblings whose prior order was strictly greater than the removed
/// item's are decremented; lower siblings are untouched. Returns `None` when
/// `removed` is not among `items`.
pub fn remove_and_shift<T: Ordered>(items: &[T], removed: Uuid) -> Option<Vec<T>> {
    let removed_order = items.iter().find(|item| item.id() == removed)?.order();

    let remaining: Vec<T> = items
        .iter()
        .filter(|item| item.id() != removed)
        .cloned()
        .map(|mut item| {
            if item.order() > removed_order {
                item.set_order(item.order() - 1);
            }
            item
        })
        .collect();

    let remaining = sorted(remaining);
    if is_dense(&remaining) {
        Some(remaining)
    } else {
        Some(renumber(remaining))
    }
}
