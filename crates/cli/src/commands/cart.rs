//! Cart commands.

use freshcart_core::ProductId;
use freshcart_storefront::mutations::{AddToCartOutcome, CartActions, QuantityStepper};
use freshcart_storefront::state::CartSnapshot;

use super::{CliError, Shop};

#[allow(clippy::print_stdout)]
fn print_cart(cart: &CartSnapshot) {
    if cart.is_empty() {
        println!("Cart is empty");
        return;
    }
    for line in &cart.items {
        let title = if line.title.is_empty() {
            line.product_id.as_str()
        } else {
            line.title.as_str()
        };
        println!(
            "{:>3} x {}  {}  = {}",
            line.quantity,
            title,
            line.unit_price,
            line.line_total()
        );
    }
    println!("{} items, total {}", cart.num_of_items, cart.total_price);
}

pub async fn show(shop: &Shop) -> Result<(), CliError> {
    shop.sign_in().await?;
    print_cart(&shop.storefront.cart().snapshot());
    Ok(())
}

pub async fn add(shop: &Shop, id: &ProductId, quantity: u32) -> Result<(), CliError> {
    shop.sign_in().await?;
    let stock = shop.client.get_product(id).await?.quantity;

    let actions = CartActions::new(shop.storefront.clone());
    match actions.add_to_cart(id, quantity, stock).await? {
        AddToCartOutcome::Added { count } => {
            tracing::info!(count, "Added to cart");
        }
        AddToCartOutcome::PartialSuccess { count, requested } => {
            tracing::warn!(count, requested, "Added 1, could not set full quantity");
        }
    }
    print_cart(&shop.storefront.cart().snapshot());
    Ok(())
}

pub async fn set_quantity(shop: &Shop, id: &ProductId, quantity: u32) -> Result<(), CliError> {
    shop.sign_in().await?;
    CartActions::new(shop.storefront.clone())
        .set_quantity(id, quantity)
        .await?;
    print_cart(&shop.storefront.cart().snapshot());
    Ok(())
}

/// Step a line `delta` units through the debounced stepper; refused steps
/// end the run early with the quantity reached so far.
pub async fn step(shop: &Shop, id: &ProductId, delta: i32) -> Result<(), CliError> {
    shop.sign_in().await?;
    let line = shop
        .storefront
        .cart()
        .snapshot()
        .line(id)
        .cloned()
        .ok_or_else(|| CliError::NotInCart(id.to_string()))?;

    let stepper = QuantityStepper::new(CartActions::new(shop.storefront.clone()), &line);
    for _ in 0..delta.unsigned_abs() {
        let stepped = if delta > 0 {
            stepper.increment()
        } else {
            stepper.decrement()
        };
        if let Err(reason) = stepped {
            tracing::warn!(%reason, quantity = stepper.quantity(), "Stopped stepping");
            break;
        }
    }

    if let Some(result) = stepper.flush().await {
        result?;
    }
    print_cart(&shop.storefront.cart().snapshot());
    Ok(())
}

pub async fn remove(shop: &Shop, id: &ProductId) -> Result<(), CliError> {
    shop.sign_in().await?;
    CartActions::new(shop.storefront.clone())
        .remove_item(id)
        .await?;
    print_cart(&shop.storefront.cart().snapshot());
    Ok(())
}

pub async fn clear(shop: &Shop) -> Result<(), CliError> {
    shop.sign_in().await?;
    CartActions::new(shop.storefront.clone()).clear().await?;
    tracing::info!("Cart cleared");
    Ok(())
}
