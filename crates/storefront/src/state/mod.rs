//! Application state shared by every mutation and view.
//!
//! [`Storefront`] is cheaply cloneable via `Arc` and owns the session, the
//! cart and wishlist stores, and the notice board. Nothing here is global:
//! each `Storefront` is an independent shopper context.

mod cart;
mod wishlist;

pub use cart::{CartLine, CartSnapshot, CartStore};
pub use wishlist::{WishlistMembership, WishlistStore};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use freshcart_core::{Email, ProductId};
use secrecy::SecretString;
use tracing::instrument;

use crate::commerce::{ApiError, AuthUser, CommerceApi, CommerceClient};
use crate::config::StorefrontConfig;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::notice::NoticeBoard;
use crate::session::{AccessToken, Identity, SessionHandle};

/// Shopper context shared across all mutations.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    api: Arc<dyn CommerceApi>,
    session: SessionHandle,
    cart: CartStore,
    wishlist: WishlistStore,
    notices: NoticeBoard,
    product_locks: Mutex<HashMap<ProductId, Arc<tokio::sync::Mutex<()>>>>,
}

impl Storefront {
    /// Create a signed-out storefront with empty stores.
    pub fn new(config: StorefrontConfig, api: Arc<dyn CommerceApi>) -> Self {
        let notices = NoticeBoard::with_linger(config.cart.notice_linger);
        Self {
            inner: Arc::new(StorefrontInner {
                config,
                api,
                session: SessionHandle::new(),
                cart: CartStore::new(),
                wishlist: WishlistStore::new(),
                notices,
                product_locks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the cart/wishlist API.
    #[must_use]
    pub fn api(&self) -> &dyn CommerceApi {
        self.inner.api.as_ref()
    }

    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.inner.session
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn wishlist(&self) -> &WishlistStore {
        &self.inner.wishlist
    }

    #[must_use]
    pub fn notices(&self) -> &NoticeBoard {
        &self.inner.notices
    }

    /// Lock serializing add-to-cart for one product.
    pub(crate) fn product_lock(&self, product_id: &ProductId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .inner
            .product_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Drop locks nobody is holding or waiting on.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(product_id.clone()).or_default())
    }

    // =========================================================================
    // Session transitions
    // =========================================================================

    /// Exchange credentials for a token and authenticate the session.
    ///
    /// The session is `Loading` while the exchange is in flight and falls
    /// back to `Unauthenticated` if it fails.
    ///
    /// # Errors
    ///
    /// Returns the API error when the credentials are refused or the call
    /// fails.
    #[instrument(skip(self, client, password), fields(email = %email))]
    pub async fn sign_in(
        &self,
        client: &CommerceClient,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthUser, ApiError> {
        self.session().begin_sign_in();
        match client.sign_in(email, password).await {
            Ok(response) => {
                self.resume(
                    AccessToken::new(response.token),
                    Some(response.user.name.clone()),
                    Some(response.user.email.clone()),
                );
                Ok(response.user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sign-in failed");
                self.session().sign_out();
                Err(e)
            }
        }
    }

    /// Authenticate with a token obtained earlier.
    pub fn resume(&self, token: AccessToken, name: Option<String>, email: Option<String>) {
        if let Some(user_id) = token.user_id() {
            set_sentry_user(&user_id, email.as_deref());
        }
        self.session().authenticate(Identity { token, name, email });
    }

    pub fn sign_out(&self) {
        clear_sentry_user();
        self.session().sign_out();
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("config", &self.inner.config)
            .field("session", &self.inner.session.status())
            .field("cart_count", &self.inner.cart.read())
            .field("wishlist_count", &self.inner.wishlist.count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use freshcart_core::SessionStatus;

    use super::*;
    use crate::testing::{FakeCommerce, storefront_with};

    #[test]
    fn test_product_locks_are_shared_per_product() {
        let (storefront, _fake) = storefront_with(FakeCommerce::new());
        let a = ProductId::parse("a").unwrap();
        let b = ProductId::parse("b").unwrap();

        let first = storefront.product_lock(&a);
        let again = storefront.product_lock(&a);
        let other = storefront.product_lock(&b);

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn test_unused_locks_are_pruned() {
        let (storefront, _fake) = storefront_with(FakeCommerce::new());
        let a = ProductId::parse("a").unwrap();

        drop(storefront.product_lock(&a));
        let _b = storefront.product_lock(&ProductId::parse("b").unwrap());

        let locks = storefront.inner.product_locks.lock().unwrap();
        assert!(!locks.contains_key(&a));
    }

    #[test]
    fn test_resume_and_sign_out() {
        let (storefront, _fake) = storefront_with(FakeCommerce::new());
        storefront.resume(AccessToken::new("t"), Some("Mona".to_string()), None);
        assert_eq!(storefront.session().status(), SessionStatus::Authenticated);

        storefront.sign_out();
        assert_eq!(storefront.session().status(), SessionStatus::Unauthenticated);
        assert!(storefront.session().token().is_none());
    }
}
