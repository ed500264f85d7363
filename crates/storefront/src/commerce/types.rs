//! Commerce API types.
//!
//! These mirror the JSON the remote service returns. Field names follow the
//! service (`_id`, camelCase); the Rust side uses snake case throughout.
//! Cart and wishlist payloads are converted into the state-store types in
//! `rest::conversions`; catalog and order types are handed out as-is.

use chrono::{DateTime, Utc};
use freshcart_core::{
    BrandId, CartId, CategoryId, Email, OrderId, PaymentMethod, ProductId, SubcategoryId, UserId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Envelope
// =============================================================================

/// Fields every response may carry next to its payload.
///
/// The service is inconsistent: mutations report `status`, auth endpoints
/// report `statusMsg`, and some success bodies only carry `message`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub status: Option<String>,
    pub status_msg: Option<String>,
    pub message: Option<String>,
}

impl Envelope {
    /// Whether the body reports failure.
    ///
    /// Absent status fields count as success; the HTTP status has already
    /// been checked by the time this runs.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        [self.status.as_deref(), self.status_msg.as_deref()]
            .into_iter()
            .flatten()
            .any(|s| !s.eq_ignore_ascii_case("success"))
    }

    /// The best human-readable message in the body.
    #[must_use]
    pub fn message_or(&self, fallback: &str) -> String {
        self.message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

// =============================================================================
// Catalog Types
// =============================================================================

/// A brand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    #[serde(rename = "_id")]
    pub id: BrandId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// A top-level category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// A subcategory, linked to its parent category by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subcategory {
    #[serde(rename = "_id")]
    pub id: SubcategoryId,
    pub name: String,
    pub slug: String,
    pub category: CategoryId,
}

/// A product in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    /// Units in stock. Absent when the service does not track it.
    #[serde(default)]
    pub quantity: Option<u32>,
    pub price: Decimal,
    #[serde(default)]
    pub price_after_discount: Option<Decimal>,
    #[serde(default)]
    pub image_cover: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sold: Option<u64>,
    #[serde(default)]
    pub ratings_average: Option<f64>,
    #[serde(default)]
    pub ratings_quantity: Option<u32>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub brand: Option<Brand>,
    #[serde(default)]
    pub subcategory: Vec<Subcategory>,
}

impl Product {
    /// The price a shopper pays right now.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.price_after_discount.unwrap_or(self.price)
    }

    /// Whether the product can be added to a cart at all.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.quantity != Some(0)
    }
}

/// Pagination metadata of a list response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub current_page: u32,
    pub number_of_pages: u32,
    pub limit: u32,
    #[serde(default)]
    pub next_page: Option<u32>,
    #[serde(default)]
    pub prev_page: Option<u32>,
}

/// A page of catalog entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub results: u32,
    #[serde(default)]
    pub metadata: PageMetadata,
    pub data: Vec<T>,
}

/// Single-entity response wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct Single<T> {
    pub data: T,
}

// =============================================================================
// Cart Types (wire)
// =============================================================================

/// Cart response shared by fetch, add, update and remove.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub num_of_cart_items: u32,
    #[serde(default)]
    pub cart_id: Option<CartId>,
    pub data: CartBody,
}

/// The cart document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartBody {
    #[serde(rename = "_id")]
    pub id: CartId,
    #[serde(default)]
    pub cart_owner: Option<UserId>,
    #[serde(default)]
    pub products: Vec<CartItem>,
    #[serde(default)]
    pub total_cart_price: Decimal,
}

/// One line of the cart document.
#[derive(Debug, Clone, Deserialize)]
pub struct CartItem {
    pub count: u32,
    pub price: Decimal,
    pub product: CartItemProduct,
}

/// The add-to-cart endpoint returns bare product ids; every other cart
/// endpoint returns populated products.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CartItemProduct {
    Id(ProductId),
    Populated(Box<CartProductSummary>),
}

impl CartItemProduct {
    #[must_use]
    pub const fn id(&self) -> &ProductId {
        match self {
            Self::Id(id) => id,
            Self::Populated(product) => &product.id,
        }
    }
}

/// The product fields populated inside cart lines.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProductSummary {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub image_cover: Option<String>,
    #[serde(default)]
    pub brand: Option<Brand>,
}

// =============================================================================
// Wishlist Types (wire)
// =============================================================================

/// Full wishlist response.
#[derive(Debug, Clone, Deserialize)]
pub struct WishlistResponse {
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub data: Vec<Product>,
}

/// Add/remove wishlist response: the ids left in the wishlist.
#[derive(Debug, Clone, Deserialize)]
pub struct WishlistUpdate {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Vec<ProductId>,
}

// =============================================================================
// Auth Types
// =============================================================================

/// Sign-up request body.
///
/// Built through `forms::SignUpForm::validate`. `Debug` redacts the passwords.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub name: String,
    pub email: Email,
    pub password: String,
    pub re_password: String,
    pub phone: String,
}

impl std::fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("re_password", &"[REDACTED]")
            .field("phone", &self.phone)
            .finish()
    }
}

/// User fields returned by sign-in/sign-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Successful sign-in/sign-up response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: AuthUser,
    pub token: String,
}

/// Successful password reset response.
#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordResponse {
    pub token: String,
}

// =============================================================================
// Order Types
// =============================================================================

/// Shipping address attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub details: String,
    pub phone: String,
    pub city: String,
}

/// A placed order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Human-facing sequential order number.
    pub id: u64,
    #[serde(rename = "_id")]
    pub order_id: OrderId,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub tax_price: Decimal,
    #[serde(default)]
    pub shipping_price: Decimal,
    pub total_order_price: Decimal,
    #[serde(default)]
    pub payment_method_type: PaymentMethod,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub is_delivered: bool,
    #[serde(default)]
    pub cart_items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
}

/// Checkout session created for card payment.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub url: String,
}

/// Checkout response.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutResponse {
    pub session: CheckoutSession,
}
