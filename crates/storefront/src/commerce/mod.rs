//! Remote commerce service client.
//!
//! # Architecture
//!
//! - The remote REST service is the source of truth - NO local persistence
//! - [`CommerceApi`] is the seam the mutation layer talks through: cart and
//!   wishlist calls only, always with a bearer token
//! - [`CommerceClient`] implements it over `reqwest` and adds the catalog,
//!   auth, order and checkout endpoints
//! - Catalog reads are cached in memory via `moka`; cart, wishlist and
//!   order reads never are
//!
//! # Example
//!
//! ```rust,ignore
//! use freshcart_storefront::commerce::{CommerceApi, CommerceClient};
//!
//! let client = CommerceClient::new(&config)?;
//! let products = client.get_products(1).await?;
//! let cart = client.add_to_cart(&token, &products.data[0].id).await?;
//! ```

mod rest;
pub mod types;

pub use rest::CommerceClient;
pub use types::*;

use async_trait::async_trait;
use freshcart_core::ProductId;
use thiserror::Error;

use crate::session::AccessToken;
use crate::state::{CartSnapshot, WishlistMembership};

/// Errors that can occur when talking to the commerce service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failed (connection, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success HTTP status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The body reported failure despite a success status.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The body could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Whether the service said the bearer token is missing or expired.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }
}

/// Cart and wishlist operations the optimistic mutations rely on.
///
/// Every method needs the shopper's token; callers check for it before
/// getting this far.
#[async_trait]
pub trait CommerceApi: Send + Sync {
    /// Add exactly one unit of a product. Returns the updated cart.
    async fn add_to_cart(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<CartSnapshot, ApiError>;

    /// Set a line's quantity to an exact value. Returns the updated cart.
    async fn update_cart_quantity(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
        count: u32,
    ) -> Result<CartSnapshot, ApiError>;

    /// Delete a line. Returns the updated cart.
    async fn remove_cart_item(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<CartSnapshot, ApiError>;

    /// Delete the whole cart.
    async fn clear_cart(&self, token: &AccessToken) -> Result<(), ApiError>;

    /// Fetch the current cart; a shopper without a cart gets the empty one.
    async fn get_cart(&self, token: &AccessToken) -> Result<CartSnapshot, ApiError>;

    /// Add a product to the wishlist. Returns the ids now in it.
    async fn add_to_wishlist(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<Vec<ProductId>, ApiError>;

    /// Remove a product from the wishlist. Returns the ids now in it.
    async fn remove_from_wishlist(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<Vec<ProductId>, ApiError>;

    /// Fetch the current wishlist.
    async fn get_wishlist(&self, token: &AccessToken) -> Result<WishlistMembership, ApiError>;
}
