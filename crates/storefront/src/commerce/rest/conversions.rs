//! Conversions from wire responses into state-store types.

use freshcart_core::Price;
use tracing::warn;

use crate::commerce::types::{CartItem, CartItemProduct, CartResponse, WishlistResponse};
use crate::state::{CartLine, CartSnapshot, WishlistMembership};

pub fn convert_cart(response: CartResponse) -> CartSnapshot {
    let cart_id = response.cart_id.or(Some(response.data.id));
    CartSnapshot {
        cart_id,
        num_of_items: response.num_of_cart_items,
        items: response
            .data
            .products
            .into_iter()
            .filter_map(convert_cart_line)
            .collect(),
        total_price: Price::store(response.data.total_cart_price),
    }
}

fn convert_cart_line(item: CartItem) -> Option<CartLine> {
    if item.count == 0 {
        warn!(product_id = %item.product.id(), "dropping cart line with zero quantity");
        return None;
    }

    let unit_price = Price::store(item.price);
    Some(match item.product {
        CartItemProduct::Id(product_id) => CartLine {
            product_id,
            title: String::new(),
            unit_price,
            quantity: item.count,
            stock: None,
            image: None,
        },
        CartItemProduct::Populated(product) => CartLine {
            product_id: product.id,
            title: product.title,
            unit_price,
            quantity: item.count,
            stock: product.quantity,
            image: product.image_cover,
        },
    })
}

pub fn convert_wishlist(response: WishlistResponse) -> WishlistMembership {
    let membership = WishlistMembership::from_ids(response.data.into_iter().map(|p| p.id));
    // The count always follows the listed ids.
    if let Some(count) = response.count
        && count != membership.count
    {
        warn!(
            reported = count,
            listed = membership.count,
            "wishlist count disagrees with its product list"
        );
    }
    membership
}
