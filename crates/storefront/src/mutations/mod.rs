//! Optimistic cart and wishlist mutations.
//!
//! # Architecture
//!
//! - Each mutation writes the shared store first, then calls the service
//! - Success reconciles the store with server values; failure restores the
//!   pre-mutation snapshot through a [`Compensation`]
//! - Completion paths write only to the shared stores and the notice board,
//!   never to per-caller state, so they stay valid after the caller is gone
//! - A missing session short-circuits before any store write or network call
//!
//! # Example
//!
//! ```rust,ignore
//! use freshcart_storefront::mutations::{CartActions, WishlistToggle};
//!
//! let cart = CartActions::new(storefront.clone());
//! cart.add_to_cart(&product_id, 3, product.quantity).await?;
//!
//! let heart = WishlistToggle::new(storefront.clone());
//! heart.toggle(&product_id).await?;
//! ```

mod cart;
mod compensation;
mod quantity;
mod wishlist;

pub use cart::{AddToCartOutcome, CartActions};
pub use compensation::{Compensation, MutationPhase, Snapshotting};
pub use quantity::QuantityStepper;
pub use wishlist::{ToggleOutcome, WishlistToggle};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::MutationError;
use crate::session::AccessToken;
use crate::state::Storefront;

/// Whether any operation started through one caller is still in flight.
///
/// Never times out: a hung call keeps it set.
#[derive(Debug, Clone, Default)]
pub struct LoadingFlag(Arc<AtomicUsize>);

impl LoadingFlag {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.0.load(Ordering::Acquire) > 0
    }

    fn start(&self) -> LoadingGuard {
        self.0.fetch_add(1, Ordering::AcqRel);
        LoadingGuard(Arc::clone(&self.0))
    }
}

struct LoadingGuard(Arc<AtomicUsize>);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// The session token, or `AuthRequired` with a notice.
fn require_token(storefront: &Storefront, prompt: &str) -> Result<AccessToken, MutationError> {
    storefront.session().token().ok_or_else(|| {
        storefront.notices().error_now(prompt);
        let err = MutationError::AuthRequired;
        err.report(prompt);
        err
    })
}
