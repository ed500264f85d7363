//! Wishlist state store.

use std::collections::HashSet;
use std::sync::Arc;

use freshcart_core::ProductId;
use tokio::sync::watch;

/// Wishlist count plus the set of wishlisted product ids.
///
/// The set makes "is this product wishlisted" O(1) for every product card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WishlistMembership {
    pub count: u32,
    pub product_ids: HashSet<ProductId>,
}

impl WishlistMembership {
    /// Build from server ids; duplicates collapse and the count follows.
    pub fn from_ids(ids: impl IntoIterator<Item = ProductId>) -> Self {
        let product_ids: HashSet<ProductId> = ids.into_iter().collect();
        Self {
            count: u32::try_from(product_ids.len()).unwrap_or(u32::MAX),
            product_ids,
        }
    }

    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.product_ids.contains(product_id)
    }

    /// The membership with `product_id` flipped.
    ///
    /// Removing floors the count at zero.
    #[must_use]
    pub fn toggled(&self, product_id: &ProductId) -> Self {
        let mut next = self.clone();
        if next.product_ids.remove(product_id) {
            next.count = next.count.saturating_sub(1);
        } else {
            next.product_ids.insert(product_id.clone());
            next.count = next.count.saturating_add(1);
        }
        next
    }
}

/// Observable wishlist state, shared by every clone.
#[derive(Debug, Clone)]
pub struct WishlistStore {
    tx: Arc<watch::Sender<WishlistMembership>>,
}

impl Default for WishlistStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WishlistStore {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(WishlistMembership::default());
        Self { tx: Arc::new(tx) }
    }

    #[must_use]
    pub fn read(&self) -> WishlistMembership {
        self.tx.borrow().clone()
    }

    pub fn write(&self, count: u32, product_ids: HashSet<ProductId>) {
        self.tx.send_replace(WishlistMembership { count, product_ids });
    }

    pub fn replace(&self, membership: WishlistMembership) {
        self.tx.send_replace(membership);
    }

    #[must_use]
    pub fn is_member(&self, product_id: &ProductId) -> bool {
        self.tx.borrow().contains(product_id)
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        self.tx.borrow().count
    }

    pub fn reset(&self) {
        self.replace(WishlistMembership::default());
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WishlistMembership> {
        self.tx.subscribe()
    }
}
