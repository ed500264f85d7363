//! Optimistic wishlist toggle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use freshcart_core::ProductId;
use tracing::instrument;

use super::compensation::Compensation;
use super::require_token;
use crate::error::{MutationError, add_breadcrumb};
use crate::state::Storefront;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// Another toggle on the same control was still in flight.
    Ignored,
}

/// Wishlist toggle for one control (e.g. one heart button).
///
/// While a toggle is in flight, further toggles on the same instance are
/// ignored. Separate instances do not block each other.
#[derive(Debug, Clone)]
pub struct WishlistToggle {
    storefront: Storefront,
    in_flight: Arc<AtomicBool>,
}

struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl WishlistToggle {
    #[must_use]
    pub fn new(storefront: Storefront) -> Self {
        Self {
            storefront,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Flip the product's membership.
    ///
    /// The store shows the new membership at once and is restored exactly
    /// if the service refuses.
    ///
    /// # Errors
    ///
    /// `AuthRequired` when signed out, `NetworkOrServer` after a rollback.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn toggle(&self, product_id: &ProductId) -> Result<ToggleOutcome, MutationError> {
        let token = require_token(&self.storefront, "Please sign in to use your wishlist")?;

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("toggle already in flight, ignoring");
            return Ok(ToggleOutcome::Ignored);
        }
        let _in_flight = InFlight(Arc::clone(&self.in_flight));

        let wishlist = self.storefront.wishlist();
        let mut compensation = Compensation::capture(wishlist);
        let was_member = compensation.original().contains(product_id);
        let next = compensation.original().toggled(product_id);
        compensation.apply(next);

        let notices = self.storefront.notices();
        let api = self.storefront.api();
        let (notice, result) = if was_member {
            let notice = notices.loading("Removing from wishlist...");
            (notice, api.remove_from_wishlist(&token, product_id).await)
        } else {
            let notice = notices.loading("Adding to wishlist...");
            (notice, api.add_to_wishlist(&token, product_id).await)
        };

        match result {
            Ok(ids) => {
                tracing::debug!(server_count = ids.len(), "wishlist toggle confirmed");
                compensation.commit(|_| {});
                let message = if was_member {
                    "Removed from wishlist"
                } else {
                    "Added to wishlist"
                };
                add_breadcrumb("wishlist", message, Some(&[("product_id", product_id.as_str())]));
                if was_member {
                    notices.success(notice, "Removed from wishlist");
                    Ok(ToggleOutcome::Removed)
                } else {
                    notices.success(notice, "Added to wishlist");
                    Ok(ToggleOutcome::Added)
                }
            }
            Err(e) => {
                compensation.rollback();
                let err = MutationError::from(e);
                err.report("toggle_wishlist");
                notices.error(notice, "Could not update wishlist");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::state::WishlistMembership;
    use crate::testing::{FakeCommerce, Op, product, signed_in, storefront_with};

    #[tokio::test]
    async fn test_toggle_adds_then_removes() {
        let (storefront, _fake) = signed_in(FakeCommerce::new());
        let heart = WishlistToggle::new(storefront.clone());
        let y = product("y");

        assert_eq!(heart.toggle(&y).await.unwrap(), ToggleOutcome::Added);
        assert!(storefront.wishlist().is_member(&y));
        assert_eq!(storefront.wishlist().count(), 1);

        assert_eq!(heart.toggle(&y).await.unwrap(), ToggleOutcome::Removed);
        assert!(!storefront.wishlist().is_member(&y));
        assert_eq!(storefront.wishlist().count(), 0);
    }

    #[tokio::test]
    async fn test_failed_toggle_restores_membership() {
        let fake = FakeCommerce::new();
        fake.hold(Op::AddToWishlist);
        fake.fail(Op::AddToWishlist);
        let (storefront, fake) = signed_in(fake);
        let heart = WishlistToggle::new(storefront.clone());

        let task = tokio::spawn({
            let heart = heart.clone();
            async move { heart.toggle(&product("y")).await }
        });
        while fake.count(Op::AddToWishlist) == 0 {
            tokio::task::yield_now().await;
        }

        // Optimistic: already a member.
        assert_eq!(storefront.wishlist().count(), 1);
        assert!(storefront.wishlist().is_member(&product("y")));

        fake.release(1);
        let err = task.await.unwrap().unwrap_err();

        assert!(matches!(err, MutationError::NetworkOrServer(_)));
        assert_eq!(storefront.wishlist().read(), WishlistMembership::default());
    }

    #[tokio::test]
    async fn test_failed_remove_restores_exact_snapshot() {
        let fake = FakeCommerce::new().with_wishlist(&["a", "b"]);
        fake.fail(Op::RemoveFromWishlist);
        let (storefront, _fake) = signed_in(fake);
        storefront
            .wishlist()
            .replace(WishlistMembership::from_ids([product("a"), product("b")]));
        let before = storefront.wishlist().read();

        let heart = WishlistToggle::new(storefront.clone());
        assert!(heart.toggle(&product("a")).await.is_err());
        assert_eq!(storefront.wishlist().read(), before);
    }

    #[tokio::test]
    async fn test_second_toggle_while_in_flight_is_ignored() {
        let fake = FakeCommerce::new();
        fake.hold(Op::AddToWishlist);
        let (storefront, fake) = signed_in(fake);
        let heart = WishlistToggle::new(storefront.clone());

        let first = tokio::spawn({
            let heart = heart.clone();
            async move { heart.toggle(&product("y")).await }
        });
        while fake.count(Op::AddToWishlist) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(heart.is_loading());

        assert_eq!(heart.toggle(&product("y")).await.unwrap(), ToggleOutcome::Ignored);

        fake.release(1);
        assert_eq!(first.await.unwrap().unwrap(), ToggleOutcome::Added);
        assert!(!heart.is_loading());
        assert_eq!(storefront.wishlist().count(), 1);
        assert_eq!(fake.count(Op::AddToWishlist), 1);
        assert_eq!(fake.count(Op::RemoveFromWishlist), 0);
    }

    #[tokio::test]
    async fn test_signed_out_toggle_makes_no_calls() {
        let (storefront, fake) = storefront_with(FakeCommerce::new());
        let heart = WishlistToggle::new(storefront.clone());

        assert!(matches!(
            heart.toggle(&product("y")).await,
            Err(MutationError::AuthRequired)
        ));
        assert!(fake.calls().is_empty());
        assert_eq!(storefront.wishlist().read(), WishlistMembership::default());
    }
}
