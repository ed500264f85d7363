//! Session-transition reset.
//!
//! Whenever the session changes, the cart and wishlist stores are derived
//! again: emptied at once when the shopper is not authenticated, fetched
//! from the service when they are. Fetch failures are logged and leave the
//! store empty.

use freshcart_core::SessionStatus;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::session::AccessToken;
use crate::state::Storefront;

/// Re-derive both stores for `status`.
#[instrument(skip(storefront))]
pub async fn apply(storefront: &Storefront, status: SessionStatus) {
    match (status, storefront.session().token()) {
        (SessionStatus::Authenticated, Some(token)) => populate(storefront, &token).await,
        _ => reset(storefront),
    }
}

/// Follow the session until the returned task is aborted.
///
/// Resets run inline; fetches run as their own tasks so a sign-out is never
/// queued behind a slow fetch.
pub fn spawn(storefront: Storefront) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut changes = storefront.session().subscribe();
        loop {
            let status = changes.borrow_and_update().status;
            if status.is_authenticated() {
                let storefront = storefront.clone();
                tokio::spawn(async move { apply(&storefront, status).await });
            } else {
                reset(&storefront);
            }
            if changes.changed().await.is_err() {
                break;
            }
        }
    })
}

fn reset(storefront: &Storefront) {
    storefront.cart().reset();
    storefront.wishlist().reset();
}

async fn populate(storefront: &Storefront, token: &AccessToken) {
    let api = storefront.api();
    let (cart, wishlist) = tokio::join!(api.get_cart(token), api.get_wishlist(token));

    // The session may have ended, or changed hands, while fetching.
    if storefront
        .session()
        .token()
        .is_none_or(|current| current.expose() != token.expose())
    {
        info!("session changed during fetch, discarding results");
        return;
    }

    match cart {
        Ok(cart) => storefront.cart().replace(cart),
        Err(e) => {
            warn!(error = %e, "Failed to fetch cart, treating as empty");
            storefront.cart().reset();
        }
    }
    match wishlist {
        Ok(wishlist) => storefront.wishlist().replace(wishlist),
        Err(e) => {
            warn!(error = %e, "Failed to fetch wishlist, treating as empty");
            storefront.wishlist().reset();
        }
    }
}
