//! Scripted in-memory commerce service for unit tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use freshcart_core::{CartId, Price, ProductId};
use rust_decimal::Decimal;
use tokio::sync::Semaphore;

use crate::commerce::{ApiError, CommerceApi};
use crate::config::StorefrontConfig;
use crate::session::AccessToken;
use crate::state::{CartLine, CartSnapshot, Storefront, WishlistMembership};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    AddToCart,
    UpdateQuantity,
    RemoveItem,
    ClearCart,
    GetCart,
    AddToWishlist,
    RemoveFromWishlist,
    GetWishlist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: Op,
    pub product_id: Option<ProductId>,
    pub count: Option<u32>,
}

#[derive(Debug, Default)]
struct FakeState {
    cart: Vec<(ProductId, u32)>,
    wishlist: Vec<ProductId>,
    failing: HashSet<Op>,
    calls: Vec<Call>,
}

/// Simulates the server cart (count = sum of line quantities) and
/// wishlist. Operations can be made to fail, or held until released.
#[derive(Debug)]
pub struct FakeCommerce {
    state: Mutex<FakeState>,
    held: Mutex<HashSet<Op>>,
    gate: Semaphore,
}

impl Default for FakeCommerce {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCommerce {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            held: Mutex::new(HashSet::new()),
            gate: Semaphore::new(0),
        }
    }

    pub fn with_cart(self, lines: &[(&str, u32)]) -> Self {
        self.lock().cart = lines
            .iter()
            .map(|(id, quantity)| (product(id), *quantity))
            .collect();
        self
    }

    pub fn with_wishlist(self, ids: &[&str]) -> Self {
        self.lock().wishlist = ids.iter().map(|id| product(id)).collect();
        self
    }

    pub fn fail(&self, op: Op) {
        self.lock().failing.insert(op);
    }

    /// Make `op` wait for [`Self::release`] before answering.
    pub fn hold(&self, op: Op) {
        self.held.lock().unwrap_or_else(PoisonError::into_inner).insert(op);
    }

    pub fn release(&self, calls: usize) {
        self.gate.add_permits(calls);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.lock().calls.iter().filter(|call| call.op == op).count()
    }

    pub fn server_cart_count(&self) -> u32 {
        self.lock().cart.iter().map(|(_, quantity)| quantity).sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(
        &self,
        op: Op,
        product_id: Option<&ProductId>,
        count: Option<u32>,
    ) -> Result<(), ApiError> {
        self.lock().calls.push(Call {
            op,
            product_id: product_id.cloned(),
            count,
        });

        let held = self
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&op);
        if held && let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }

        if self.lock().failing.contains(&op) {
            return Err(ApiError::Api {
                status: 500,
                message: format!("{op:?} failed"),
            });
        }
        Ok(())
    }

    fn cart_snapshot(&self) -> CartSnapshot {
        let state = self.lock();
        let items: Vec<CartLine> = state
            .cart
            .iter()
            .map(|(product_id, quantity)| CartLine {
                product_id: product_id.clone(),
                title: product_id.to_string(),
                unit_price: Price::store(Decimal::TEN),
                quantity: *quantity,
                stock: None,
                image: None,
            })
            .collect();
        let num_of_items = items.iter().map(|line| line.quantity).sum();
        CartSnapshot {
            cart_id: CartId::parse("fake-cart").ok(),
            num_of_items,
            total_price: Price::store(Decimal::TEN * Decimal::from(num_of_items)),
            items,
        }
    }
}

#[async_trait]
impl CommerceApi for FakeCommerce {
    async fn add_to_cart(
        &self,
        _token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<CartSnapshot, ApiError> {
        self.enter(Op::AddToCart, Some(product_id), None).await?;
        {
            let mut state = self.lock();
            if let Some((_, quantity)) = state.cart.iter_mut().find(|(id, _)| id == product_id) {
                *quantity += 1;
            } else {
                state.cart.push((product_id.clone(), 1));
            }
        }
        Ok(self.cart_snapshot())
    }

    async fn update_cart_quantity(
        &self,
        _token: &AccessToken,
        product_id: &ProductId,
        count: u32,
    ) -> Result<CartSnapshot, ApiError> {
        self.enter(Op::UpdateQuantity, Some(product_id), Some(count))
            .await?;
        {
            let mut state = self.lock();
            let Some(line) = state.cart.iter_mut().find(|(id, _)| id == product_id) else {
                return Err(ApiError::Rejected("Product not in cart".to_string()));
            };
            line.1 = count;
        }
        Ok(self.cart_snapshot())
    }

    async fn remove_cart_item(
        &self,
        _token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<CartSnapshot, ApiError> {
        self.enter(Op::RemoveItem, Some(product_id), None).await?;
        self.lock().cart.retain(|(id, _)| id != product_id);
        Ok(self.cart_snapshot())
    }

    async fn clear_cart(&self, _token: &AccessToken) -> Result<(), ApiError> {
        self.enter(Op::ClearCart, None, None).await?;
        self.lock().cart.clear();
        Ok(())
    }

    async fn get_cart(&self, _token: &AccessToken) -> Result<CartSnapshot, ApiError> {
        self.enter(Op::GetCart, None, None).await?;
        Ok(self.cart_snapshot())
    }

    async fn add_to_wishlist(
        &self,
        _token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<Vec<ProductId>, ApiError> {
        self.enter(Op::AddToWishlist, Some(product_id), None).await?;
        let mut state = self.lock();
        if !state.wishlist.contains(product_id) {
            state.wishlist.push(product_id.clone());
        }
        Ok(state.wishlist.clone())
    }

    async fn remove_from_wishlist(
        &self,
        _token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<Vec<ProductId>, ApiError> {
        self.enter(Op::RemoveFromWishlist, Some(product_id), None)
            .await?;
        let mut state = self.lock();
        state.wishlist.retain(|id| id != product_id);
        Ok(state.wishlist.clone())
    }

    async fn get_wishlist(&self, _token: &AccessToken) -> Result<WishlistMembership, ApiError> {
        self.enter(Op::GetWishlist, None, None).await?;
        Ok(WishlistMembership::from_ids(self.lock().wishlist.clone()))
    }
}

pub fn product(id: &str) -> ProductId {
    ProductId::parse(id).unwrap_or_else(|e| panic!("bad test id {id:?}: {e}"))
}

/// A signed-out storefront backed by `fake`.
pub fn storefront_with(fake: FakeCommerce) -> (Storefront, Arc<FakeCommerce>) {
    let fake = Arc::new(fake);
    let config = StorefrontConfig::for_base_url(
        url::Url::parse("http://127.0.0.1:9/api/").unwrap_or_else(|e| panic!("{e}")),
    );
    let storefront = Storefront::new(config, Arc::clone(&fake) as Arc<dyn CommerceApi>);
    (storefront, fake)
}

/// Like [`storefront_with`], but authenticated.
pub fn signed_in(fake: FakeCommerce) -> (Storefront, Arc<FakeCommerce>) {
    let (storefront, fake) = storefront_with(fake);
    storefront.resume(AccessToken::new("test-token"), None, None);
    (storefront, fake)
}
