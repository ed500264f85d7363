//! Cache types for catalog responses.

use freshcart_core::{BrandId, CategoryId, ProductId, SubcategoryId};

use crate::commerce::types::{Brand, Category, Page, Product, Subcategory};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products { page: u32 },
    Product(ProductId),
    Brands,
    Brand(BrandId),
    BrandProducts(BrandId),
    Categories,
    Category(CategoryId),
    CategoryProducts(CategoryId),
    Subcategories,
    Subcategory(SubcategoryId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Page<Product>),
    Product(Box<Product>),
    Brands(Page<Brand>),
    Brand(Brand),
    Categories(Page<Category>),
    Category(Category),
    Subcategories(Page<Subcategory>),
    Subcategory(Subcategory),
}
