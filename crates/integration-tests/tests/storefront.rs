//! Optimistic cart and wishlist flows against the mock commerce API.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use freshcart_core::{Email, ProductId, SessionStatus};
use freshcart_integration_tests::{
    CART_ID, Failure, MockCommerce, Route, SHOPPER_EMAIL, SHOPPER_PASSWORD,
};
use freshcart_storefront::commerce::{ApiError, CommerceClient, ShippingAddress};
use freshcart_storefront::config::StorefrontConfig;
use freshcart_storefront::error::MutationError;
use freshcart_storefront::mutations::{
    AddToCartOutcome, CartActions, QuantityStepper, ToggleOutcome, WishlistToggle,
};
use freshcart_storefront::notice::NoticeLevel;
use freshcart_storefront::session::AccessToken;
use freshcart_storefront::state::Storefront;
use freshcart_storefront::sync;
use secrecy::SecretString;

fn product(id: &str) -> ProductId {
    ProductId::parse(id).unwrap()
}

async fn signed_in(mock: &MockCommerce, config: StorefrontConfig) -> (Storefront, CommerceClient) {
    let (storefront, client) = mock.storefront(config);
    storefront
        .sign_in(
            &client,
            &Email::parse(SHOPPER_EMAIL).unwrap(),
            &SecretString::from(SHOPPER_PASSWORD.to_string()),
        )
        .await
        .unwrap();
    sync::apply(&storefront, SessionStatus::Authenticated).await;
    (storefront, client)
}

/// Poll until `check` holds, failing after two seconds.
async fn eventually(check: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

// =============================================================================
// Session
// =============================================================================

#[tokio::test]
async fn test_sign_in_populates_cart_and_wishlist() {
    let mock = MockCommerce::start().await;
    mock.seed_cart(&[("p-tomato", 2), ("p-milk", 1)]);
    mock.seed_wishlist(&["p-milk"]);

    let (storefront, _) = signed_in(&mock, mock.config()).await;

    assert_eq!(storefront.session().status(), SessionStatus::Authenticated);
    assert_eq!(storefront.cart().read(), 3);
    let cart = storefront.cart().snapshot();
    assert_eq!(cart.cart_id.as_ref().unwrap().as_str(), CART_ID);
    assert_eq!(cart.line(&product("p-tomato")).unwrap().stock, Some(50));
    assert!(storefront.wishlist().is_member(&product("p-milk")));
    assert_eq!(storefront.wishlist().count(), 1);
}

#[tokio::test]
async fn test_shopper_without_cart_gets_empty_cart() {
    let mock = MockCommerce::start().await;

    let (storefront, _) = signed_in(&mock, mock.config()).await;

    assert_eq!(mock.count(Route::GetCart), 1);
    assert_eq!(storefront.cart().read(), 0);
    assert!(storefront.cart().snapshot().is_empty());
}

#[tokio::test]
async fn test_wrong_password_leaves_session_signed_out() {
    let mock = MockCommerce::start().await;
    let (storefront, client) = mock.storefront(mock.config());

    let err = storefront
        .sign_in(
            &client,
            &Email::parse(SHOPPER_EMAIL).unwrap(),
            &SecretString::from("wrong1".to_string()),
        )
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(storefront.session().status(), SessionStatus::Unauthenticated);
}

#[tokio::test]
async fn test_follower_resets_on_sign_out() {
    let mock = MockCommerce::start().await;
    mock.seed_cart(&[("p-tomato", 4)]);
    mock.seed_wishlist(&["p-tomato"]);
    let (storefront, client) = mock.storefront(mock.config());
    let follower = sync::spawn(storefront.clone());

    storefront
        .sign_in(
            &client,
            &Email::parse(SHOPPER_EMAIL).unwrap(),
            &SecretString::from(SHOPPER_PASSWORD.to_string()),
        )
        .await
        .unwrap();
    eventually(|| storefront.cart().read() == 4).await;
    eventually(|| storefront.wishlist().count() == 1).await;

    storefront.sign_out();
    eventually(|| storefront.cart().read() == 0 && storefront.wishlist().count() == 0).await;

    // Server state is untouched by a local reset
    assert_eq!(mock.cart_count(), 4);
    follower.abort();
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_add_several_units_reaches_server() {
    let mock = MockCommerce::start().await;
    let (storefront, _) = signed_in(&mock, mock.config()).await;
    let actions = CartActions::new(storefront.clone());

    let outcome = actions
        .add_to_cart(&product("p-tomato"), 3, Some(50))
        .await
        .unwrap();

    assert_eq!(outcome, AddToCartOutcome::Added { count: 3 });
    assert_eq!(storefront.cart().read(), 3);
    assert_eq!(mock.cart_line("p-tomato"), Some(3));
    assert_eq!(mock.count(Route::AddToCart), 1);
    assert_eq!(mock.count(Route::UpdateCart), 1);
    assert!(!actions.is_loading());
}

#[tokio::test]
async fn test_add_to_existing_line_builds_on_server_quantity() {
    let mock = MockCommerce::start().await;
    mock.seed_cart(&[("p-tomato", 2)]);
    let (storefront, _) = signed_in(&mock, mock.config()).await;

    let outcome = CartActions::new(storefront.clone())
        .add_to_cart(&product("p-tomato"), 2, Some(50))
        .await
        .unwrap();

    assert_eq!(outcome.count(), 4);
    assert_eq!(mock.cart_line("p-tomato"), Some(4));
}

#[tokio::test]
async fn test_failed_add_rolls_back() {
    let mock = MockCommerce::start().await;
    mock.seed_cart(&[("p-tomato", 2)]);
    let (storefront, _) = signed_in(&mock, mock.config()).await;
    mock.fail(Route::AddToCart, Failure::Status(500));

    let err = CartActions::new(storefront.clone())
        .add_to_cart(&product("p-milk"), 1, Some(3))
        .await
        .unwrap_err();

    assert!(matches!(err, MutationError::NetworkOrServer(_)), "got {err:?}");
    assert_eq!(storefront.cart().read(), 2);
    let notice = storefront.notices().current().pop().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
}

#[tokio::test]
async fn test_failed_follow_up_update_is_partial_success() {
    let mock = MockCommerce::start().await;
    let (storefront, _) = signed_in(&mock, mock.config()).await;
    mock.fail(Route::UpdateCart, Failure::HtmlPage);

    let outcome = CartActions::new(storefront.clone())
        .add_to_cart(&product("p-tomato"), 3, Some(50))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        AddToCartOutcome::PartialSuccess {
            count: 1,
            requested: 3
        }
    );
    assert_eq!(storefront.cart().read(), 1);
    assert_eq!(mock.cart_line("p-tomato"), Some(1));
    let notice = storefront.notices().current().pop().unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
}

#[tokio::test]
async fn test_stale_token_is_refused_and_rolled_back() {
    let mock = MockCommerce::start().await;
    let (storefront, _) = mock.storefront(mock.config());
    storefront.resume(AccessToken::new("stale-token"), None, None);

    let err = CartActions::new(storefront.clone())
        .add_to_cart(&product("p-tomato"), 1, None)
        .await
        .unwrap_err();

    match err {
        MutationError::NetworkOrServer(api) => assert!(api.is_unauthorized()),
        other => panic!("expected NetworkOrServer, got {other:?}"),
    }
    assert_eq!(storefront.cart().read(), 0);
    assert_eq!(mock.cart_count(), 0);
}

#[tokio::test]
async fn test_rejection_envelope_rolls_back() {
    let mock = MockCommerce::start().await;
    let (storefront, _) = signed_in(&mock, mock.config()).await;
    mock.fail(Route::AddToCart, Failure::Rejected);

    let err = CartActions::new(storefront.clone())
        .add_to_cart(&product("p-tomato"), 1, None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MutationError::NetworkOrServer(ApiError::Rejected(_))
    ));
    assert_eq!(storefront.cart().read(), 0);
}

#[tokio::test]
async fn test_remove_and_clear() {
    let mock = MockCommerce::start().await;
    mock.seed_cart(&[("p-tomato", 2), ("p-milk", 1)]);
    let (storefront, _) = signed_in(&mock, mock.config()).await;
    let actions = CartActions::new(storefront.clone());

    let count = actions.remove_item(&product("p-milk")).await.unwrap();
    assert_eq!(count, 2);
    assert!(storefront.cart().snapshot().line(&product("p-milk")).is_none());

    actions.clear().await.unwrap();
    assert_eq!(storefront.cart().read(), 0);
    assert_eq!(mock.cart_count(), 0);
}

#[tokio::test]
async fn test_stepper_sends_one_update_for_a_burst() {
    let mock = MockCommerce::start().await;
    mock.seed_cart(&[("p-tomato", 1)]);
    let mut config = mock.config();
    config.cart.quantity_debounce = Duration::from_millis(50);
    let (storefront, _) = signed_in(&mock, config).await;

    let line = storefront
        .cart()
        .snapshot()
        .line(&product("p-tomato"))
        .cloned()
        .unwrap();
    let stepper = QuantityStepper::new(CartActions::new(storefront.clone()), &line);
    stepper.increment().unwrap();
    stepper.increment().unwrap();
    stepper.increment().unwrap();
    assert_eq!(stepper.quantity(), 4);

    eventually(|| mock.cart_line("p-tomato") == Some(4)).await;
    eventually(|| storefront.cart().read() == 4).await;
    assert_eq!(mock.count(Route::UpdateCart), 1);
}

// =============================================================================
// Wishlist
// =============================================================================

#[tokio::test]
async fn test_wishlist_toggle_round_trip() {
    let mock = MockCommerce::start().await;
    let (storefront, _) = signed_in(&mock, mock.config()).await;
    let toggle = WishlistToggle::new(storefront.clone());
    let milk = product("p-milk");

    assert_eq!(toggle.toggle(&milk).await.unwrap(), ToggleOutcome::Added);
    assert!(storefront.wishlist().is_member(&milk));
    assert_eq!(mock.wishlist(), ["p-milk"]);

    assert_eq!(toggle.toggle(&milk).await.unwrap(), ToggleOutcome::Removed);
    assert!(!storefront.wishlist().is_member(&milk));
    assert!(mock.wishlist().is_empty());
}

#[tokio::test]
async fn test_failed_wishlist_toggle_restores_membership() {
    let mock = MockCommerce::start().await;
    mock.seed_wishlist(&["p-tomato"]);
    let (storefront, _) = signed_in(&mock, mock.config()).await;
    mock.fail(Route::RemoveFromWishlist, Failure::HtmlPage);
    let before = storefront.wishlist().read();

    let err = WishlistToggle::new(storefront.clone())
        .toggle(&product("p-tomato"))
        .await
        .unwrap_err();

    assert!(matches!(err, MutationError::NetworkOrServer(_)));
    assert_eq!(storefront.wishlist().read(), before);
    assert_eq!(mock.wishlist(), ["p-tomato"]);
}

// =============================================================================
// Orders
// =============================================================================

#[tokio::test]
async fn test_order_history_and_checkout() {
    let mock = MockCommerce::start().await;
    mock.seed_cart(&[("p-milk", 2)]);
    let (storefront, client) = signed_in(&mock, mock.config()).await;
    let token = storefront.session().token().unwrap();

    let orders = client
        .get_user_orders(&token.user_id().unwrap())
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, 1042);
    assert!(orders[0].is_paid);

    let cart_id = storefront.cart().snapshot().cart_id.unwrap();
    let address = ShippingAddress {
        details: "12 Nile St".to_string(),
        phone: "01012345678".to_string(),
        city: "Cairo".to_string(),
    };
    let url = client
        .create_checkout_session(&token, &cart_id, &address)
        .await
        .unwrap();
    assert!(url.starts_with("https://pay.test/session/cart-1"), "got {url}");
}
