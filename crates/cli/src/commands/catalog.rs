//! Catalog browsing commands.

use freshcart_core::{BrandId, CategoryId, Price, ProductId};
use freshcart_storefront::commerce::{Page, Product};

use super::{CliError, Shop};

pub async fn products(shop: &Shop, page: u32) -> Result<(), CliError> {
    let products = shop.client.get_products(page.max(1)).await?;
    print_products(&products);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn product(shop: &Shop, id: &ProductId) -> Result<(), CliError> {
    let product = shop.client.get_product(id).await?;

    println!("{}", product.title);
    println!("  id:     {}", product.id);
    println!("  price:  {}", Price::store(product.effective_price()));
    if let Some(brand) = &product.brand {
        println!("  brand:  {}", brand.name);
    }
    if let Some(category) = &product.category {
        println!("  category: {}", category.name);
    }
    match product.quantity {
        Some(0) => println!("  stock:  sold out"),
        Some(quantity) => println!("  stock:  {quantity}"),
        None => {}
    }
    if let Some(rating) = product.ratings_average {
        println!(
            "  rating: {rating:.1} ({} reviews)",
            product.ratings_quantity.unwrap_or(0)
        );
    }
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn brands(shop: &Shop, id: Option<&BrandId>) -> Result<(), CliError> {
    if let Some(id) = id {
        let brand = shop.client.get_brand(id).await?;
        println!("{} ({})", brand.name, brand.id);
        print_products(&shop.client.get_brand_products(id).await?);
        return Ok(());
    }

    for brand in shop.client.get_brands().await?.data {
        println!("{}  {}", brand.id, brand.name);
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn categories(shop: &Shop, id: Option<&CategoryId>) -> Result<(), CliError> {
    if let Some(id) = id {
        let category = shop.client.get_category(id).await?;
        println!("{} ({})", category.name, category.id);
        print_products(&shop.client.get_category_products(id).await?);
        return Ok(());
    }

    for category in shop.client.get_categories().await?.data {
        println!("{}  {}", category.id, category.name);
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn subcategories(shop: &Shop) -> Result<(), CliError> {
    for subcategory in shop.client.get_subcategories().await?.data {
        println!(
            "{}  {}  (category {})",
            subcategory.id, subcategory.name, subcategory.category
        );
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_products(products: &Page<Product>) {
    for product in &products.data {
        let stock = if product.in_stock() { "" } else { "  [sold out]" };
        println!(
            "{}  {}  {}{stock}",
            product.id,
            Price::store(product.effective_price()),
            product.title
        );
    }
    let meta = &products.metadata;
    println!(
        "page {}/{} ({} results)",
        meta.current_page, meta.number_of_pages, products.results
    );
}
