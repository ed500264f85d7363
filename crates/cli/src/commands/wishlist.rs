//! Wishlist commands.

use freshcart_core::ProductId;
use freshcart_storefront::mutations::{ToggleOutcome, WishlistToggle};

use super::{CliError, Shop};

#[allow(clippy::print_stdout)]
pub async fn show(shop: &Shop) -> Result<(), CliError> {
    shop.sign_in().await?;
    let wishlist = shop.storefront.wishlist().read();

    let mut ids: Vec<_> = wishlist.product_ids.iter().collect();
    ids.sort();
    for id in ids {
        println!("{id}");
    }
    println!("{} wishlisted", wishlist.count);
    Ok(())
}

pub async fn toggle(shop: &Shop, id: &ProductId) -> Result<(), CliError> {
    shop.sign_in().await?;
    match WishlistToggle::new(shop.storefront.clone()).toggle(id).await? {
        ToggleOutcome::Added => tracing::info!(product_id = %id, "Added to wishlist"),
        ToggleOutcome::Removed => tracing::info!(product_id = %id, "Removed from wishlist"),
        ToggleOutcome::Ignored => {}
    }
    Ok(())
}
