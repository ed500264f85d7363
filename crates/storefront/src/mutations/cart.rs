//! Cart mutations: add, set quantity, remove, clear.

use freshcart_core::ProductId;
use tracing::instrument;

use super::compensation::Compensation;
use super::{LoadingFlag, require_token};
use crate::error::{MutationError, Rejection, add_breadcrumb};
use crate::state::Storefront;

const SIGN_IN_PROMPT: &str = "Please sign in to manage your cart";

/// How an add-to-cart settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddToCartOutcome {
    /// Everything requested is in the cart.
    Added { count: u32 },
    /// One unit went in but the follow-up to reach the requested quantity
    /// failed. `count` is what the server confirmed after the first unit.
    PartialSuccess { count: u32, requested: u32 },
}

impl AddToCartOutcome {
    /// Cart count after the operation settled.
    #[must_use]
    pub const fn count(self) -> u32 {
        match self {
            Self::Added { count } | Self::PartialSuccess { count, .. } => count,
        }
    }
}

/// Cart mutations for one caller, with its own loading flag.
#[derive(Debug, Clone)]
pub struct CartActions {
    storefront: Storefront,
    loading: LoadingFlag,
}

impl CartActions {
    #[must_use]
    pub fn new(storefront: Storefront) -> Self {
        Self {
            storefront,
            loading: LoadingFlag::default(),
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    #[must_use]
    pub const fn storefront(&self) -> &Storefront {
        &self.storefront
    }

    /// Add `quantity` units of a product.
    ///
    /// The count goes up by `quantity` at once. The service only adds one
    /// unit per call, so a larger quantity takes a second call setting the
    /// line to its final size. Calls for the same product run one at a time.
    ///
    /// # Errors
    ///
    /// - `AuthRequired` when signed out.
    /// - `ValidationRejected` for a zero quantity, or when the line would
    ///   end up above `stock`.
    /// - `NetworkOrServer` when the first unit could not be added; the count
    ///   is back where it started.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        product_id: &ProductId,
        quantity: u32,
        stock: Option<u32>,
    ) -> Result<AddToCartOutcome, MutationError> {
        let token = require_token(&self.storefront, SIGN_IN_PROMPT)?;

        let _loading = self.loading.start();
        let lock = self.storefront.product_lock(product_id);
        let _serial = lock.lock().await;

        let in_cart = self
            .storefront
            .cart()
            .snapshot()
            .line(product_id)
            .map_or(0, |line| line.quantity);
        check_requested_quantity(quantity, stock, in_cart)?;

        let notices = self.storefront.notices();
        let notice = notices.loading("Adding to cart...");
        let api = self.storefront.api();

        let mut compensation = Compensation::capture(self.storefront.cart());
        let optimistic = compensation.original().saturating_add(quantity);
        compensation.apply(optimistic);

        let first = match api.add_to_cart(&token, product_id).await {
            Ok(cart) => cart,
            Err(e) => {
                compensation.rollback();
                let err = MutationError::from(e);
                err.report("add_to_cart");
                notices.error(notice, "Could not add to cart");
                return Err(err);
            }
        };

        if quantity == 1 {
            let count = first.num_of_items;
            compensation.commit(|cart| cart.replace(first));
            notices.success(notice, "Added to cart");
            cart_breadcrumb("Added to cart", product_id, 1);
            return Ok(AddToCartOutcome::Added { count });
        }

        let line_quantity = first.line(product_id).map_or(1, |line| line.quantity);
        let target = line_quantity.saturating_add(quantity - 1);
        match api.update_cart_quantity(&token, product_id, target).await {
            Ok(confirmed) => {
                let count = confirmed.num_of_items;
                compensation.commit(|cart| cart.replace(confirmed));
                notices.success(notice, format!("Added {quantity} to cart"));
                cart_breadcrumb("Added to cart", product_id, quantity);
                Ok(AddToCartOutcome::Added { count })
            }
            Err(e) => {
                tracing::warn!(error = %e, target, "Follow-up quantity update failed after adding one unit");
                let count = first.num_of_items;
                compensation.commit(|cart| cart.replace(first));
                notices.warning(notice, "Added 1, could not set full quantity");
                cart_breadcrumb("Added to cart", product_id, 1);
                Ok(AddToCartOutcome::PartialSuccess {
                    count,
                    requested: quantity,
                })
            }
        }
    }

    /// Set a line to an exact quantity. Returns the confirmed cart count.
    ///
    /// Nothing is written until the server answers.
    ///
    /// # Errors
    ///
    /// `AuthRequired`, `ValidationRejected` for zero, or `NetworkOrServer`.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn set_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<u32, MutationError> {
        let token = require_token(&self.storefront, SIGN_IN_PROMPT)?;
        if quantity == 0 {
            return Err(Rejection::BelowMinimum.into());
        }

        let _loading = self.loading.start();
        let notices = self.storefront.notices();
        let notice = notices.loading("Updating quantity...");

        match self
            .storefront
            .api()
            .update_cart_quantity(&token, product_id, quantity)
            .await
        {
            Ok(cart) => {
                let count = cart.num_of_items;
                self.storefront.cart().replace(cart);
                notices.success(notice, "Cart updated");
                cart_breadcrumb("Set quantity", product_id, quantity);
                Ok(count)
            }
            Err(e) => {
                let err = MutationError::from(e);
                err.report("set_quantity");
                notices.error(notice, "Could not update quantity");
                Err(err)
            }
        }
    }

    /// Delete a line. Returns the confirmed cart count.
    ///
    /// # Errors
    ///
    /// `AuthRequired`, or `NetworkOrServer` with the cart untouched.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_item(&self, product_id: &ProductId) -> Result<u32, MutationError> {
        let token = require_token(&self.storefront, SIGN_IN_PROMPT)?;

        let _loading = self.loading.start();
        let notices = self.storefront.notices();
        let notice = notices.loading("Removing item...");

        match self.storefront.api().remove_cart_item(&token, product_id).await {
            Ok(cart) => {
                let count = cart.num_of_items;
                self.storefront.cart().replace(cart);
                notices.success(notice, "Item removed");
                add_breadcrumb("cart", "Removed item", Some(&[("product_id", product_id.as_str())]));
                Ok(count)
            }
            Err(e) => {
                let err = MutationError::from(e);
                err.report("remove_item");
                notices.error(notice, "Could not remove item");
                Err(err)
            }
        }
    }

    /// Delete every line.
    ///
    /// # Errors
    ///
    /// `AuthRequired`, or `NetworkOrServer` with the cart untouched.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), MutationError> {
        let token = require_token(&self.storefront, SIGN_IN_PROMPT)?;

        let _loading = self.loading.start();
        let notices = self.storefront.notices();
        let notice = notices.loading("Clearing cart...");

        match self.storefront.api().clear_cart(&token).await {
            Ok(()) => {
                self.storefront.cart().reset();
                notices.success(notice, "Cart cleared");
                Ok(())
            }
            Err(e) => {
                let err = MutationError::from(e);
                err.report("clear_cart");
                notices.error(notice, "Could not clear cart");
                Err(err)
            }
        }
    }
}

fn cart_breadcrumb(message: &str, product_id: &ProductId, quantity: u32) {
    let quantity = quantity.to_string();
    add_breadcrumb(
        "cart",
        message,
        Some(&[("product_id", product_id.as_str()), ("quantity", quantity.as_str())]),
    );
}

/// `in_cart` units of the product are already in the cart; the line may not
/// end up above `stock`.
fn check_requested_quantity(
    quantity: u32,
    stock: Option<u32>,
    in_cart: u32,
) -> Result<(), Rejection> {
    match stock {
        _ if quantity == 0 => Err(Rejection::BelowMinimum),
        Some(0) => Err(Rejection::OutOfStock),
        Some(stock) if in_cart.saturating_add(quantity) > stock => Err(Rejection::AboveStock {
            available: stock.saturating_sub(in_cart),
        }),
        _ => Ok(()),
    }
}
