//! REST client for the commerce service.
//!
//! Uses `reqwest` for HTTP. Bodies are read as text first so HTML error
//! pages and truncated bodies produce readable errors. Catalog reads are
//! cached with `moka` (TTL from configuration).

mod cache;
mod conversions;

use std::sync::Arc;

use async_trait::async_trait;
use freshcart_core::{BrandId, CartId, CategoryId, Email, ProductId, SubcategoryId, UserId};
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::commerce::types::{
    AuthResponse, Brand, CartResponse, Category, CheckoutResponse, Envelope, Order, Page, Product,
    ResetPasswordResponse, ShippingAddress, SignUpRequest, Single, Subcategory, WishlistResponse,
    WishlistUpdate,
};
use crate::commerce::{ApiError, CommerceApi};
use crate::config::CommerceConfig;
use crate::session::AccessToken;
use crate::state::{CartSnapshot, WishlistMembership};

use cache::{CacheKey, CacheValue};
use conversions::{convert_cart, convert_wishlist};

/// Header the service reads the bearer token from.
const TOKEN_HEADER: &str = "token";

/// How much of an unparseable body to keep in the error.
const BODY_SNIPPET_CHARS: usize = 100;

// =============================================================================
// CommerceClient
// =============================================================================

/// Client for the commerce REST API.
///
/// Cheap to clone; clones share the HTTP connection pool and catalog cache.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    client: reqwest::Client,
    base_url: Url,
    checkout_return_url: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl CommerceClient {
    /// Create a new commerce API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &CommerceConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("freshcart/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(CommerceClientInner {
                client,
                base_url: config.base_url.clone(),
                checkout_return_url: config.checkout_return_url.clone(),
                cache,
            }),
        })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.inner.client.request(method, self.url(path)?))
    }

    fn authed(
        &self,
        method: Method,
        path: &str,
        token: &AccessToken,
    ) -> Result<RequestBuilder, ApiError> {
        Ok(self.request(method, path)?.header(TOKEN_HEADER, token.expose()))
    }

    /// Send a request and decode the body.
    ///
    /// Non-success HTTP statuses become [`ApiError::Api`]; a success status
    /// whose body reports failure becomes [`ApiError::Rejected`].
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Envelope>(&body).map_or_else(
                |_| describe_unparseable(&body, status),
                |envelope| envelope.message_or(&format!("Request failed with status {status}")),
            );
            tracing::warn!(status = %status, message = %message, "commerce API returned non-success status");
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        // List endpoints answer with bare arrays, which carry no envelope.
        let envelope = serde_json::from_str::<Envelope>(&body).unwrap_or_default();
        if envelope.is_failure() {
            return Err(ApiError::Rejected(envelope.message_or("Request failed")));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "failed to parse commerce API response"
            );
            ApiError::Parse(format!("{e}: {}", describe_unparseable(&body, status)))
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(self.request(Method::GET, path)?).await
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Get a page of products (1-based).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self, page: u32) -> Result<Page<Product>, ApiError> {
        let key = CacheKey::Products { page };
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let mut url = self.url("v1/products")?;
        url.query_pairs_mut().append_pair("page", &page.to_string());
        let products: Page<Product> = self.send(self.inner.client.get(url)).await?;

        self.inner
            .cache
            .insert(key, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// Get a single product.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id, or any request error.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Single<Product> = self
            .fetch(&format!("v1/products/{}", urlencoding::encode(id.as_str())))
            .await
            .map_err(|e| not_found(e, || format!("Product not found: {id}")))?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.data.clone())))
            .await;
        Ok(product.data)
    }

    // =========================================================================
    // Brand Methods
    // =========================================================================

    /// Get all brands.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_brands(&self) -> Result<Page<Brand>, ApiError> {
        if let Some(CacheValue::Brands(brands)) = self.inner.cache.get(&CacheKey::Brands).await {
            debug!("Cache hit for brands");
            return Ok(brands);
        }

        let brands: Page<Brand> = self.fetch("v1/brands").await?;
        self.inner
            .cache
            .insert(CacheKey::Brands, CacheValue::Brands(brands.clone()))
            .await;
        Ok(brands)
    }

    /// Get a single brand.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id, or any request error.
    #[instrument(skip(self), fields(brand_id = %id))]
    pub async fn get_brand(&self, id: &BrandId) -> Result<Brand, ApiError> {
        let key = CacheKey::Brand(id.clone());
        if let Some(CacheValue::Brand(brand)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for brand");
            return Ok(brand);
        }

        let brand: Single<Brand> = self
            .fetch(&format!("v1/brands/{}", urlencoding::encode(id.as_str())))
            .await
            .map_err(|e| not_found(e, || format!("Brand not found: {id}")))?;

        self.inner
            .cache
            .insert(key, CacheValue::Brand(brand.data.clone()))
            .await;
        Ok(brand.data)
    }

    /// Get all products of a brand.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(brand_id = %id))]
    pub async fn get_brand_products(&self, id: &BrandId) -> Result<Page<Product>, ApiError> {
        let key = CacheKey::BrandProducts(id.clone());
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for brand products");
            return Ok(products);
        }

        let mut url = self.url("v1/products")?;
        url.query_pairs_mut().append_pair("brand", id.as_str());
        let products: Page<Product> = self.send(self.inner.client.get(url)).await?;

        self.inner
            .cache
            .insert(key, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    // =========================================================================
    // Category Methods
    // =========================================================================

    /// Get all categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_categories(&self) -> Result<Page<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Page<Category> = self.fetch("v1/categories").await?;
        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;
        Ok(categories)
    }

    /// Get a single category.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id, or any request error.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn get_category(&self, id: &CategoryId) -> Result<Category, ApiError> {
        let key = CacheKey::Category(id.clone());
        if let Some(CacheValue::Category(category)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for category");
            return Ok(category);
        }

        let category: Single<Category> = self
            .fetch(&format!("v1/categories/{}", urlencoding::encode(id.as_str())))
            .await
            .map_err(|e| not_found(e, || format!("Category not found: {id}")))?;

        self.inner
            .cache
            .insert(key, CacheValue::Category(category.data.clone()))
            .await;
        Ok(category.data)
    }

    /// Get all products filed under a category or subcategory id.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn get_category_products(&self, id: &CategoryId) -> Result<Page<Product>, ApiError> {
        let key = CacheKey::CategoryProducts(id.clone());
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for category products");
            return Ok(products);
        }

        let mut url = self.url("v1/products")?;
        url.query_pairs_mut().append_pair("category[in]", id.as_str());
        let products: Page<Product> = self.send(self.inner.client.get(url)).await?;

        self.inner
            .cache
            .insert(key, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// Get all subcategories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_subcategories(&self) -> Result<Page<Subcategory>, ApiError> {
        if let Some(CacheValue::Subcategories(subcategories)) =
            self.inner.cache.get(&CacheKey::Subcategories).await
        {
            debug!("Cache hit for subcategories");
            return Ok(subcategories);
        }

        let subcategories: Page<Subcategory> = self.fetch("v1/subcategories").await?;
        self.inner
            .cache
            .insert(
                CacheKey::Subcategories,
                CacheValue::Subcategories(subcategories.clone()),
            )
            .await;
        Ok(subcategories)
    }

    /// Get a single subcategory.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id, or any request error.
    #[instrument(skip(self), fields(subcategory_id = %id))]
    pub async fn get_subcategory(&self, id: &SubcategoryId) -> Result<Subcategory, ApiError> {
        let key = CacheKey::Subcategory(id.clone());
        if let Some(CacheValue::Subcategory(subcategory)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for subcategory");
            return Ok(subcategory);
        }

        let subcategory: Single<Subcategory> = self
            .fetch(&format!(
                "v1/subcategories/{}",
                urlencoding::encode(id.as_str())
            ))
            .await
            .map_err(|e| not_found(e, || format!("Subcategory not found: {id}")))?;

        self.inner
            .cache
            .insert(key, CacheValue::Subcategory(subcategory.data.clone()))
            .await;
        Ok(subcategory.data)
    }

    // =========================================================================
    // Auth Methods
    // =========================================================================

    /// Register a new shopper.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is taken or the API request fails.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<AuthResponse, ApiError> {
        self.send(self.request(Method::POST, "v1/auth/signup")?.json(request))
            .await
    }

    /// Exchange credentials for a token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Api`] with status 401 for wrong credentials.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthResponse, ApiError> {
        let body = serde_json::json!({
            "email": email,
            "password": password.expose_secret(),
        });
        self.send(self.request(Method::POST, "v1/auth/signin")?.json(&body))
            .await
    }

    /// Email a password reset code.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is unknown or the API request fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn forgot_password(&self, email: &Email) -> Result<(), ApiError> {
        let body = serde_json::json!({ "email": email });
        let _: Envelope = self
            .send(
                self.request(Method::POST, "v1/auth/forgotPasswords")?
                    .json(&body),
            )
            .await?;
        Ok(())
    }

    /// Check a reset code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is wrong or expired.
    #[instrument(skip(self, code))]
    pub async fn verify_reset_code(&self, code: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "resetCode": code.trim() });
        let _: Envelope = self
            .send(
                self.request(Method::POST, "v1/auth/verifyResetCode")?
                    .json(&body),
            )
            .await?;
        Ok(())
    }

    /// Set a new password after a verified reset code. Returns a fresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, new_password), fields(email = %email))]
    pub async fn reset_password(
        &self,
        email: &Email,
        new_password: &SecretString,
    ) -> Result<AccessToken, ApiError> {
        let body = serde_json::json!({
            "email": email,
            "newPassword": new_password.expose_secret(),
        });
        let response: ResetPasswordResponse = self
            .send(
                self.request(Method::PUT, "v1/auth/resetPassword")?
                    .json(&body),
            )
            .await?;
        Ok(AccessToken::new(response.token))
    }

    // =========================================================================
    // Order Methods (not cached)
    // =========================================================================

    /// Get every order a shopper placed.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_user_orders(&self, user_id: &UserId) -> Result<Vec<Order>, ApiError> {
        self.fetch(&format!(
            "v1/orders/user/{}",
            urlencoding::encode(user_id.as_str())
        ))
        .await
    }

    /// Open a card checkout session for a cart. Returns the payment URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, address), fields(cart_id = %cart_id))]
    pub async fn create_checkout_session(
        &self,
        token: &AccessToken,
        cart_id: &CartId,
        address: &ShippingAddress,
    ) -> Result<String, ApiError> {
        let mut url = self.url(&format!(
            "v1/orders/checkout-session/{}",
            urlencoding::encode(cart_id.as_str())
        ))?;
        url.query_pairs_mut()
            .append_pair("url", &self.inner.checkout_return_url);

        let body = serde_json::json!({ "shippingAddress": address });
        let response: CheckoutResponse = self
            .send(
                self.inner
                    .client
                    .post(url)
                    .header(TOKEN_HEADER, token.expose())
                    .json(&body),
            )
            .await?;
        Ok(response.session.url)
    }
}

// =============================================================================
// Cart and Wishlist Methods (not cached - mutable state)
// =============================================================================

#[async_trait]
impl CommerceApi for CommerceClient {
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn add_to_cart(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<CartSnapshot, ApiError> {
        let body = serde_json::json!({ "productId": product_id });
        let cart: CartResponse = self
            .send(self.authed(Method::POST, "v1/cart", token)?.json(&body))
            .await?;
        Ok(convert_cart(cart))
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn update_cart_quantity(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
        count: u32,
    ) -> Result<CartSnapshot, ApiError> {
        let body = serde_json::json!({ "count": count.to_string() });
        let path = format!("v1/cart/{}", urlencoding::encode(product_id.as_str()));
        let cart: CartResponse = self
            .send(self.authed(Method::PUT, &path, token)?.json(&body))
            .await?;
        Ok(convert_cart(cart))
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn remove_cart_item(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<CartSnapshot, ApiError> {
        let path = format!("v1/cart/{}", urlencoding::encode(product_id.as_str()));
        let cart: CartResponse = self
            .send(self.authed(Method::DELETE, &path, token)?)
            .await?;
        Ok(convert_cart(cart))
    }

    #[instrument(skip(self, token))]
    async fn clear_cart(&self, token: &AccessToken) -> Result<(), ApiError> {
        let _: Envelope = self
            .send(self.authed(Method::DELETE, "v1/cart", token)?)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn get_cart(&self, token: &AccessToken) -> Result<CartSnapshot, ApiError> {
        match self
            .send::<CartResponse>(self.authed(Method::GET, "v1/cart", token)?)
            .await
        {
            Ok(cart) => Ok(convert_cart(cart)),
            // A shopper who never added anything has no cart document.
            Err(ApiError::Api { status: 404, .. }) => Ok(CartSnapshot::empty()),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn add_to_wishlist(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<Vec<ProductId>, ApiError> {
        let body = serde_json::json!({ "productId": product_id });
        let update: WishlistUpdate = self
            .send(self.authed(Method::POST, "v1/wishlist", token)?.json(&body))
            .await?;
        debug!(message = ?update.message, "wishlist add confirmed");
        Ok(update.data)
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn remove_from_wishlist(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<Vec<ProductId>, ApiError> {
        let path = format!("v1/wishlist/{}", urlencoding::encode(product_id.as_str()));
        let update: WishlistUpdate = self
            .send(self.authed(Method::DELETE, &path, token)?)
            .await?;
        debug!(message = ?update.message, "wishlist remove confirmed");
        Ok(update.data)
    }

    #[instrument(skip(self, token))]
    async fn get_wishlist(&self, token: &AccessToken) -> Result<WishlistMembership, ApiError> {
        let wishlist: WishlistResponse = self
            .send(self.authed(Method::GET, "v1/wishlist", token)?)
            .await?;
        Ok(convert_wishlist(wishlist))
    }
}

/// Human-readable stand-in for a body that is not the expected JSON.
fn describe_unparseable(body: &str, status: StatusCode) -> String {
    let trimmed = body.trim_start();
    let lowered = trimmed
        .chars()
        .take(15)
        .collect::<String>()
        .to_ascii_lowercase();
    if lowered.starts_with("<!doctype") || lowered.starts_with("<html") {
        format!("HTML error page (status: {status})")
    } else if trimmed.is_empty() {
        format!("Empty response from server (status: {status})")
    } else {
        trimmed.chars().take(BODY_SNIPPET_CHARS).collect()
    }
}

fn not_found(err: ApiError, message: impl FnOnce() -> String) -> ApiError {
    match err {
        ApiError::Api { status: 404, .. } => ApiError::NotFound(message()),
        other => other,
    }
}
