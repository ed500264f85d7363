//! Order history and checkout.

use freshcart_core::{OrderProgress, Price};
use freshcart_storefront::forms::validate_shipping_address;

use super::{CliError, Shop};

#[allow(clippy::print_stdout)]
pub async fn list(shop: &Shop) -> Result<(), CliError> {
    let token = shop.sign_in().await?;
    let user_id = token.user_id().ok_or(CliError::TokenWithoutUser)?;

    let orders = shop.client.get_user_orders(&user_id).await?;
    if orders.is_empty() {
        println!("No orders yet");
    }
    for order in orders {
        println!(
            "#{}  {}  {}  {} items  {}  {}",
            order.id,
            order.created_at.format("%Y-%m-%d"),
            Price::store(order.total_order_price),
            order.cart_items.iter().map(|item| item.count).sum::<u32>(),
            order.payment_method_type,
            OrderProgress::from_flags(order.is_paid, order.is_delivered),
        );
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn checkout(shop: &Shop, details: &str, phone: &str, city: &str) -> Result<(), CliError> {
    let address = validate_shipping_address(details, phone, city)?;
    let token = shop.sign_in().await?;

    let cart = shop.storefront.cart().snapshot();
    if cart.is_empty() {
        return Err(CliError::EmptyCart);
    }
    let cart_id = cart.cart_id.clone().ok_or(CliError::EmptyCart)?;

    let url = shop
        .client
        .create_checkout_session(&token, &cart_id, &address)
        .await?;
    tracing::info!(total = %cart.total_price, "Checkout session created");
    println!("{url}");
    Ok(())
}
