//! Command implementations.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod wishlist;

use std::sync::Arc;

use freshcart_core::SessionStatus;
use freshcart_storefront::commerce::{ApiError, CommerceApi, CommerceClient};
use freshcart_storefront::config::{ConfigError, StorefrontConfig};
use freshcart_storefront::error::MutationError;
use freshcart_storefront::forms::ValidationError;
use freshcart_storefront::session::AccessToken;
use freshcart_storefront::state::Storefront;
use freshcart_storefront::sync;
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Command needs `--token` or `FRESHCART_TOKEN`.
    #[error("Not signed in: pass --token or set FRESHCART_TOKEN (see `freshcart login`)")]
    MissingToken,

    #[error("Token does not carry a user id")]
    TokenWithoutUser,

    #[error("Product is not in the cart: {0}")]
    NotInCart(String),

    #[error("Cart is empty")]
    EmptyCart,
}

/// Client, shopper state and the token given on the command line.
pub struct Shop {
    pub client: CommerceClient,
    pub storefront: Storefront,
    token: Option<AccessToken>,
}

impl Shop {
    pub fn new(config: StorefrontConfig, token: Option<String>) -> Result<Self, CliError> {
        let client = CommerceClient::new(&config.commerce)?;
        let storefront = Storefront::new(config, Arc::new(client.clone()) as Arc<dyn CommerceApi>);
        Ok(Self {
            client,
            storefront,
            token: token
                .filter(|token| !token.trim().is_empty())
                .map(AccessToken::new),
        })
    }

    /// Authenticate with the given token and load the cart and wishlist.
    pub async fn sign_in(&self) -> Result<AccessToken, CliError> {
        let token = self.token.clone().ok_or(CliError::MissingToken)?;
        self.storefront.resume(token.clone(), None, None);
        sync::apply(&self.storefront, SessionStatus::Authenticated).await;
        Ok(token)
    }
}
