//! Integration tests for FreshCart.
//!
//! [`MockCommerce`] serves a small in-memory version of the remote commerce
//! REST API on an ephemeral port. Tests point the real `reqwest` client at
//! it and drive the storefront end to end.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p freshcart-integration-tests
//! ```
//!
//! # Fixtures
//!
//! - Products `p-tomato` (20, stock 50), `p-milk` (35, 30 after discount,
//!   stock 3), `p-bread` (15, sold out)
//! - Brand `b-farm`, category `c-fresh`, subcategory `s-dairy`
//! - One shopper, [`SHOPPER_EMAIL`] / [`SHOPPER_PASSWORD`], user id
//!   [`SHOPPER_ID`]

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use freshcart_storefront::commerce::{CommerceApi, CommerceClient};
use freshcart_storefront::config::StorefrontConfig;
use freshcart_storefront::session::AccessToken;
use freshcart_storefront::state::Storefront;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use url::Url;

pub const SHOPPER_ID: &str = "user-1";
pub const SHOPPER_EMAIL: &str = "mona@example.com";
pub const SHOPPER_PASSWORD: &str = "fresh1";
pub const CART_ID: &str = "cart-1";

/// Endpoints whose answers can be overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Products,
    Product,
    AddToCart,
    UpdateCart,
    RemoveCartItem,
    ClearCart,
    GetCart,
    AddToWishlist,
    RemoveFromWishlist,
    GetWishlist,
    SignIn,
    Orders,
    Checkout,
}

/// How an overridden endpoint answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// JSON error body with this HTTP status.
    Status(u16),
    /// An HTML error page with status 502, as a proxy would send.
    HtmlPage,
    /// HTTP 200 whose body reports `"status": "fail"`.
    Rejected,
}

#[derive(Debug)]
struct MockState {
    token: String,
    cart: Option<Vec<(String, u32)>>,
    wishlist: Vec<String>,
    failures: HashMap<Route, Failure>,
    requests: Vec<Route>,
}

type Shared = Arc<Mutex<MockState>>;

/// Running mock commerce API. Stops when dropped.
pub struct MockCommerce {
    base_url: Url,
    state: Shared,
    server: JoinHandle<()>,
}

impl MockCommerce {
    /// Bind an ephemeral port and start serving.
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(MockState {
            token: shopper_token(),
            cart: None,
            wishlist: Vec::new(),
            failures: HashMap::new(),
            requests: Vec::new(),
        }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock commerce API");
        let addr = listener.local_addr().expect("Mock API has no address");
        let router = router(Arc::clone(&state));
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Mock commerce API stopped");
        });

        let base_url =
            Url::parse(&format!("http://{addr}/api/")).expect("Mock API URL is valid");
        Self {
            base_url,
            state,
            server,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Configuration pointing at this mock, with default tuning.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        StorefrontConfig::for_base_url(self.base_url.clone())
    }

    /// Client and signed-out storefront wired to this mock.
    #[must_use]
    pub fn storefront(&self, config: StorefrontConfig) -> (Storefront, CommerceClient) {
        let client = CommerceClient::new(&config.commerce).expect("Failed to build client");
        let storefront = Storefront::new(config, Arc::new(client.clone()) as Arc<dyn CommerceApi>);
        (storefront, client)
    }

    /// The token the mock accepts.
    #[must_use]
    pub fn token(&self) -> AccessToken {
        AccessToken::new(self.lock().token.clone())
    }

    pub fn seed_cart(&self, lines: &[(&str, u32)]) {
        self.lock().cart = Some(
            lines
                .iter()
                .map(|(id, count)| ((*id).to_string(), *count))
                .collect(),
        );
    }

    pub fn seed_wishlist(&self, ids: &[&str]) {
        self.lock().wishlist = ids.iter().map(|id| (*id).to_string()).collect();
    }

    pub fn fail(&self, route: Route, failure: Failure) {
        self.lock().failures.insert(route, failure);
    }

    pub fn heal(&self, route: Route) {
        self.lock().failures.remove(&route);
    }

    /// Requests received for `route`.
    #[must_use]
    pub fn count(&self, route: Route) -> usize {
        self.lock().requests.iter().filter(|r| **r == route).count()
    }

    /// Units in the server-side cart.
    #[must_use]
    pub fn cart_count(&self) -> u32 {
        self.lock()
            .cart
            .as_ref()
            .map_or(0, |lines| lines.iter().map(|(_, count)| count).sum())
    }

    #[must_use]
    pub fn cart_line(&self, product_id: &str) -> Option<u32> {
        self.lock()
            .cart
            .as_ref()?
            .iter()
            .find(|(id, _)| id == product_id)
            .map(|(_, count)| *count)
    }

    #[must_use]
    pub fn wishlist(&self) -> Vec<String> {
        self.lock().wishlist.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for MockCommerce {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A JWT-shaped token whose payload carries the shopper id.
fn shopper_token() -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({"id": SHOPPER_ID, "name": "Mona", "role": "user"}).to_string(),
    );
    format!("{header}.{payload}.mock-signature")
}

// =============================================================================
// Router
// =============================================================================

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/products/{id}", get(get_product))
        .route("/api/v1/brands", get(list_brands))
        .route("/api/v1/brands/{id}", get(get_brand))
        .route("/api/v1/categories", get(list_categories))
        .route("/api/v1/categories/{id}", get(get_category))
        .route("/api/v1/subcategories", get(list_subcategories))
        .route("/api/v1/auth/signin", post(sign_in))
        .route("/api/v1/auth/signup", post(sign_up))
        .route(
            "/api/v1/cart",
            get(get_cart).post(add_to_cart).delete(clear_cart),
        )
        .route(
            "/api/v1/cart/{id}",
            put(update_cart).delete(remove_cart_item),
        )
        .route("/api/v1/wishlist", get(get_wishlist).post(add_to_wishlist))
        .route("/api/v1/wishlist/{id}", delete(remove_from_wishlist))
        .route("/api/v1/orders/user/{id}", get(user_orders))
        .route("/api/v1/orders/checkout-session/{id}", post(checkout))
        .with_state(state)
}

/// Record the request and apply any configured failure or token check.
fn enter<'a>(
    state: &'a Shared,
    route: Route,
    headers: Option<&HeaderMap>,
) -> Result<MutexGuard<'a, MockState>, Response> {
    let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
    guard.requests.push(route);

    if let Some(failure) = guard.failures.get(&route).copied() {
        return Err(failure_response(failure));
    }
    if let Some(headers) = headers {
        let presented = headers.get("token").and_then(|v| v.to_str().ok());
        if presented != Some(guard.token.as_str()) {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({"statusMsg": "fail", "message": "Invalid Token. please login again"})),
            )
                .into_response());
        }
    }
    Ok(guard)
}

fn failure_response(failure: Failure) -> Response {
    match failure {
        Failure::Status(code) => (
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(json!({"statusMsg": "fail", "message": "Injected failure"})),
        )
            .into_response(),
        Failure::HtmlPage => (
            StatusCode::BAD_GATEWAY,
            Html("<!DOCTYPE html><html><body><h1>502 Bad Gateway</h1></body></html>"),
        )
            .into_response(),
        Failure::Rejected => {
            Json(json!({"status": "fail", "message": "Injected rejection"})).into_response()
        }
    }
}

fn not_found(message: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"statusMsg": "fail", "message": message})),
    )
        .into_response()
}

// =============================================================================
// Catalog fixtures
// =============================================================================

fn brand() -> Value {
    json!({"_id": "b-farm", "name": "Green Farm", "slug": "green-farm", "image": "https://img.test/farm.png"})
}

fn category() -> Value {
    json!({"_id": "c-fresh", "name": "Fresh Produce", "slug": "fresh-produce", "image": "https://img.test/fresh.png"})
}

fn subcategory() -> Value {
    json!({"_id": "s-dairy", "name": "Dairy", "slug": "dairy", "category": "c-fresh"})
}

fn products() -> Vec<Value> {
    vec![
        json!({
            "_id": "p-tomato", "title": "Tomatoes 1kg", "slug": "tomatoes",
            "description": "Vine ripened", "quantity": 50, "price": 20,
            "imageCover": "https://img.test/tomato.png", "sold": 120,
            "ratingsAverage": 4.5, "ratingsQuantity": 12,
            "category": category(), "brand": brand(), "subcategory": []
        }),
        json!({
            "_id": "p-milk", "title": "Milk 1L", "slug": "milk",
            "description": "Full cream", "quantity": 3, "price": 35, "priceAfterDiscount": 30,
            "category": category(), "subcategory": [subcategory()]
        }),
        json!({
            "_id": "p-bread", "title": "Sourdough", "slug": "sourdough",
            "description": "", "quantity": 0, "price": 15, "brand": brand()
        }),
    ]
}

fn find_product(id: &str) -> Option<Value> {
    products().into_iter().find(|p| p["_id"] == id)
}

fn page(data: Vec<Value>, current_page: u32) -> Value {
    json!({
        "results": data.len(),
        "metadata": {"currentPage": current_page, "numberOfPages": 1, "limit": 40},
        "data": data,
    })
}

async fn list_products(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(response) = enter(&state, Route::Products, None) {
        return response;
    }
    let current_page = query
        .get("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1);
    let data = products()
        .into_iter()
        .filter(|p| query.get("brand").is_none_or(|b| p["brand"]["_id"] == b.as_str()))
        .filter(|p| {
            query
                .get("category[in]")
                .is_none_or(|c| p["category"]["_id"] == c.as_str())
        })
        .collect();
    Json(page(data, current_page)).into_response()
}

async fn get_product(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    if let Err(response) = enter(&state, Route::Product, None) {
        return response;
    }
    find_product(&id).map_or_else(
        || not_found(&format!("No product for this id {id}")),
        |product| Json(json!({"data": product})).into_response(),
    )
}

async fn list_brands() -> Json<Value> {
    Json(page(vec![brand()], 1))
}

async fn get_brand(Path(id): Path<String>) -> Response {
    if id == "b-farm" {
        Json(json!({"data": brand()})).into_response()
    } else {
        not_found("No brand for this id")
    }
}

async fn list_categories() -> Json<Value> {
    Json(page(vec![category()], 1))
}

async fn get_category(Path(id): Path<String>) -> Response {
    if id == "c-fresh" {
        Json(json!({"data": category()})).into_response()
    } else {
        not_found("No category for this id")
    }
}

async fn list_subcategories() -> Json<Value> {
    Json(page(vec![subcategory()], 1))
}

// =============================================================================
// Auth
// =============================================================================

async fn sign_in(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let guard = match enter(&state, Route::SignIn, None) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    if body["email"] == SHOPPER_EMAIL && body["password"] == SHOPPER_PASSWORD {
        Json(json!({
            "message": "success",
            "user": {"name": "Mona", "email": SHOPPER_EMAIL, "role": "user"},
            "token": guard.token,
        }))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"statusMsg": "fail", "message": "Incorrect email or password"})),
        )
            .into_response()
    }
}

async fn sign_up(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    if body["email"] == SHOPPER_EMAIL {
        return (
            StatusCode::CONFLICT,
            Json(json!({"statusMsg": "fail", "message": "Account Already Exists"})),
        )
            .into_response();
    }
    let token = state
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .token
        .clone();
    (
        StatusCode::CREATED,
        Json(json!({
            "message": "success",
            "user": {"name": body["name"], "email": body["email"], "role": "user"},
            "token": token,
        })),
    )
        .into_response()
}

// =============================================================================
// Cart
// =============================================================================

/// Cart body; line products are bare ids when `populated` is false, as
/// the add endpoint answers.
fn cart_json(lines: &[(String, u32)], populated: bool) -> Value {
    let mut total = 0_u64;
    let products: Vec<Value> = lines
        .iter()
        .map(|(id, count)| {
            let product = find_product(id).unwrap_or_else(|| json!({"_id": id, "price": 10}));
            let price = product["price"].as_u64().unwrap_or(10);
            total += price * u64::from(*count);
            let product = if populated {
                json!({"_id": id, "title": product["title"], "quantity": product["quantity"]})
            } else {
                json!(id)
            };
            json!({"count": count, "price": price, "product": product})
        })
        .collect();
    let count: u32 = lines.iter().map(|(_, count)| count).sum();
    json!({
        "status": "success",
        "numOfCartItems": count,
        "cartId": CART_ID,
        "data": {
            "_id": CART_ID,
            "cartOwner": SHOPPER_ID,
            "products": products,
            "totalCartPrice": total,
        },
    })
}

fn no_cart() -> Response {
    not_found(&format!("No cart exist for this user: {SHOPPER_ID}"))
}

async fn get_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let guard = match enter(&state, Route::GetCart, Some(&headers)) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    guard
        .cart
        .as_ref()
        .map_or_else(no_cart, |lines| Json(cart_json(lines, true)).into_response())
}

async fn add_to_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut guard = match enter(&state, Route::AddToCart, Some(&headers)) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    let Some(product_id) = body["productId"].as_str().map(str::to_string) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"statusMsg": "fail", "message": "productId is required"})),
        )
            .into_response();
    };
    if find_product(&product_id).is_none() {
        return not_found(&format!("No product for this id {product_id}"));
    }

    let lines = guard.cart.get_or_insert_with(Vec::new);
    if let Some(line) = lines.iter_mut().find(|(id, _)| *id == product_id) {
        line.1 += 1;
    } else {
        lines.push((product_id, 1));
    }
    let mut response = cart_json(lines, false);
    response["message"] = json!("Product added successfully to your cart");
    Json(response).into_response()
}

async fn update_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut guard = match enter(&state, Route::UpdateCart, Some(&headers)) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    let count = body["count"]
        .as_str()
        .and_then(|c| c.parse::<u32>().ok())
        .or_else(|| body["count"].as_u64().and_then(|c| u32::try_from(c).ok()));
    let Some(count) = count else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"statusMsg": "fail", "message": "count is required"})),
        )
            .into_response();
    };

    let Some(lines) = guard.cart.as_mut() else {
        return no_cart();
    };
    let Some(line) = lines.iter_mut().find(|(id, _)| *id == product_id) else {
        return not_found("Product not in cart");
    };
    line.1 = count;
    Json(cart_json(lines, true)).into_response()
}

async fn remove_cart_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> Response {
    let mut guard = match enter(&state, Route::RemoveCartItem, Some(&headers)) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    let Some(lines) = guard.cart.as_mut() else {
        return no_cart();
    };
    lines.retain(|(id, _)| *id != product_id);
    Json(cart_json(lines, true)).into_response()
}

async fn clear_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut guard = match enter(&state, Route::ClearCart, Some(&headers)) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    guard.cart = None;
    Json(json!({"message": "success"})).into_response()
}

// =============================================================================
// Wishlist
// =============================================================================

async fn get_wishlist(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let guard = match enter(&state, Route::GetWishlist, Some(&headers)) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    let data: Vec<Value> = guard
        .wishlist
        .iter()
        .filter_map(|id| find_product(id))
        .collect();
    Json(json!({"status": "success", "count": data.len(), "data": data})).into_response()
}

async fn add_to_wishlist(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut guard = match enter(&state, Route::AddToWishlist, Some(&headers)) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    let Some(product_id) = body["productId"].as_str().map(str::to_string) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"statusMsg": "fail", "message": "productId is required"})),
        )
            .into_response();
    };
    if !guard.wishlist.contains(&product_id) {
        guard.wishlist.push(product_id);
    }
    Json(json!({
        "status": "success",
        "message": "Product added successfully to your wishlist",
        "data": guard.wishlist,
    }))
    .into_response()
}

async fn remove_from_wishlist(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> Response {
    let mut guard = match enter(&state, Route::RemoveFromWishlist, Some(&headers)) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    guard.wishlist.retain(|id| *id != product_id);
    Json(json!({
        "status": "success",
        "message": "Product removed successfully from your wishlist",
        "data": guard.wishlist,
    }))
    .into_response()
}

// =============================================================================
// Orders
// =============================================================================

async fn user_orders(State(state): State<Shared>, Path(user_id): Path<String>) -> Response {
    if let Err(response) = enter(&state, Route::Orders, None) {
        return response;
    }
    if user_id != SHOPPER_ID {
        return Json(json!([])).into_response();
    }
    Json(json!([{
        "id": 1042,
        "_id": "order-1",
        "shippingAddress": {"details": "12 Nile St", "phone": "01012345678", "city": "Cairo"},
        "taxPrice": 0,
        "shippingPrice": 0,
        "totalOrderPrice": 70,
        "paymentMethodType": "card",
        "isPaid": true,
        "isDelivered": false,
        "cartItems": [{"count": 2, "price": 35, "product": {"_id": "p-milk", "title": "Milk 1L"}}],
        "createdAt": "2026-03-14T09:30:00.000Z",
        "user": {"_id": SHOPPER_ID, "name": "Mona"},
    }]))
    .into_response()
}

async fn checkout(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(cart_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let guard = match enter(&state, Route::Checkout, Some(&headers)) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    if cart_id != CART_ID || guard.cart.is_none() {
        return no_cart();
    }
    let address = &body["shippingAddress"];
    if ["details", "phone", "city"]
        .iter()
        .any(|field| address[field].as_str().is_none_or(str::is_empty))
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"statusMsg": "fail", "message": "shippingAddress is required"})),
        )
            .into_response();
    }
    let return_url = query.get("url").cloned().unwrap_or_default();
    Json(json!({
        "status": "success",
        "session": {"url": format!("https://pay.test/session/{cart_id}?return={return_url}")},
    }))
    .into_response()
}
