//! Cart state store.
//!
//! Holds the one authoritative [`CartSnapshot`] of the session. The item
//! count is what every badge renders; line items are refreshed whenever the
//! server hands back a full cart.

use std::sync::Arc;

use freshcart_core::{CartId, Price, ProductId};
use tokio::sync::watch;

/// One product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub title: String,
    pub unit_price: Price,
    /// Always at least 1; removing a line is a separate operation.
    pub quantity: u32,
    /// Units in stock, when the server reported it.
    pub stock: Option<u32>,
    pub image: Option<String>,
}

impl CartLine {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// Server-confirmed cart, or its optimistic variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    pub cart_id: Option<CartId>,
    pub num_of_items: u32,
    pub items: Vec<CartLine>,
    pub total_price: Price,
}

impl Default for CartSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl CartSnapshot {
    /// A session with no cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            cart_id: None,
            num_of_items: 0,
            items: Vec::new(),
            total_price: Price::zero(),
        }
    }

    /// Find the line for a product.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.items.iter().find(|line| &line.product_id == product_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Observable cart state, shared by every clone.
///
/// Writes are visible to all subscribers as soon as they return.
#[derive(Debug, Clone)]
pub struct CartStore {
    tx: Arc<watch::Sender<CartSnapshot>>,
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CartStore {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(CartSnapshot::empty());
        Self { tx: Arc::new(tx) }
    }

    /// Current item count.
    #[must_use]
    pub fn read(&self) -> u32 {
        self.tx.borrow().num_of_items
    }

    /// Replace the item count, leaving line items alone.
    ///
    /// Used for optimistic writes and rollbacks.
    pub fn write(&self, count: u32) {
        self.tx.send_if_modified(|snapshot| {
            let changed = snapshot.num_of_items != count;
            snapshot.num_of_items = count;
            changed
        });
    }

    /// Copy of the whole snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.tx.borrow().clone()
    }

    /// Replace the snapshot wholesale with a server-confirmed cart.
    pub fn replace(&self, snapshot: CartSnapshot) {
        self.tx.send_replace(snapshot);
    }

    /// Forget everything (signed out, or the cart was cleared).
    pub fn reset(&self) {
        self.replace(CartSnapshot::empty());
    }

    /// Watch the snapshot, e.g. to re-render a badge on every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn line(id: &str, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::parse(id).unwrap(),
            title: id.to_string(),
            unit_price: Price::store(Decimal::from(20)),
            quantity,
            stock: None,
            image: None,
        }
    }

    #[test]
    fn test_write_only_touches_count() {
        let store = CartStore::new();
        store.replace(CartSnapshot {
            cart_id: None,
            num_of_items: 2,
            items: vec![line("p1", 2)],
            total_price: Price::store(Decimal::from(40)),
        });

        store.write(5);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.num_of_items, 5);
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(store.read(), 5);
    }

    #[tokio::test]
    async fn test_subscribers_see_writes() {
        let store = CartStore::new();
        let mut badge = store.subscribe();

        store.clone().write(3);

        assert!(badge.has_changed().unwrap());
        assert_eq!(badge.borrow_and_update().num_of_items, 3);

        // Writing the same value does not wake subscribers.
        store.write(3);
        assert!(!badge.has_changed().unwrap());
    }

    #[test]
    fn test_reset_and_line_lookup() {
        let store = CartStore::new();
        store.replace(CartSnapshot {
            cart_id: None,
            num_of_items: 1,
            items: vec![line("p1", 1)],
            total_price: Price::zero(),
        });
        let snapshot = store.snapshot();
        let id = ProductId::parse("p1").unwrap();
        assert_eq!(snapshot.line(&id).map(|l| l.quantity), Some(1));
        assert_eq!(
            snapshot.line(&id).map(CartLine::line_total),
            Some(Price::store(Decimal::from(20)))
        );

        store.reset();
        assert_eq!(store.snapshot(), CartSnapshot::empty());
    }
}
