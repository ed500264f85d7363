//! FreshCart CLI - Browse the catalog and manage a cart from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse
//! freshcart products --page 2
//! freshcart product 6428ebc6dc1175abc65ca0b9
//!
//! # Sign in and keep the token for later commands
//! export FRESHCART_TOKEN=$(freshcart login -e shopper@example.com -p secret1)
//!
//! # Cart and wishlist
//! freshcart cart add 6428ebc6dc1175abc65ca0b9 --quantity 3
//! freshcart cart step 6428ebc6dc1175abc65ca0b9 -- -1
//! freshcart wishlist toggle 6428ebc6dc1175abc65ca0b9
//!
//! # Pay by card
//! freshcart checkout --details "12 Nile St" --phone 01012345678 --city Cairo
//! ```
//!
//! # Environment Variables
//!
//! - `FRESHCART_TOKEN` - Bearer token for cart, wishlist, order commands
//! - `RUST_LOG` - Log filter (default: `freshcart_storefront=info,freshcart_cli=info`)
//! - Everything `StorefrontConfig::from_env` reads

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use freshcart_core::{BrandId, CategoryId, Email, ProductId};
use freshcart_storefront::config::StorefrontConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{CliError, Shop};

#[derive(Parser)]
#[command(name = "freshcart")]
#[command(author, version, about = "FreshCart storefront from the terminal")]
struct Cli {
    /// Bearer token from `freshcart login`
    #[arg(long, global = true, env = "FRESHCART_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products {
        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Show one product
    Product { id: ProductId },
    /// List brands, or one brand's products
    Brands { id: Option<BrandId> },
    /// List categories, or one category's products
    Categories { id: Option<CategoryId> },
    /// List subcategories
    Subcategories,
    /// Create an account
    Signup {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "FRESHCART_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        phone: String,
    },
    /// Sign in and print the token
    Login {
        #[arg(short, long)]
        email: Email,
        #[arg(short, long, env = "FRESHCART_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Password reset flow
    Password {
        #[command(subcommand)]
        action: PasswordAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// List your orders
    Orders,
    /// Open a card checkout session for the cart
    Checkout {
        #[arg(long)]
        details: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        city: String,
    },
}

#[derive(Subcommand)]
enum PasswordAction {
    /// Email a reset code
    Forgot {
        #[arg(short, long)]
        email: Email,
    },
    /// Check a reset code
    Verify { code: String },
    /// Set a new password and print the new token
    Reset {
        #[arg(short, long)]
        email: Email,
        #[arg(short, long, env = "FRESHCART_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and totals
    Show,
    /// Add units of a product
    Add {
        id: ProductId,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line to an exact quantity
    Set { id: ProductId, quantity: u32 },
    /// Step a line up or down one unit at a time
    Step {
        id: ProductId,
        #[arg(allow_negative_numbers = true)]
        delta: i32,
    },
    /// Remove a line
    Remove { id: ProductId },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Show wishlisted products
    Show,
    /// Add or remove a product
    Toggle { id: ProductId },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Logs go to stderr so command output can be piped.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "freshcart_storefront=info,freshcart_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = StorefrontConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(CliError::from(e)),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CliError> {
    let shop = Shop::new(config, cli.token)?;

    match cli.command {
        Commands::Products { page } => commands::catalog::products(&shop, page).await,
        Commands::Product { id } => commands::catalog::product(&shop, &id).await,
        Commands::Brands { id } => commands::catalog::brands(&shop, id.as_ref()).await,
        Commands::Categories { id } => commands::catalog::categories(&shop, id.as_ref()).await,
        Commands::Subcategories => commands::catalog::subcategories(&shop).await,
        Commands::Signup {
            name,
            email,
            password,
            phone,
        } => commands::account::sign_up(&shop, name, email, password, phone).await,
        Commands::Login { email, password } => {
            commands::account::login(&shop, &email, password).await
        }
        Commands::Password { action } => match action {
            PasswordAction::Forgot { email } => {
                commands::account::forgot_password(&shop, &email).await
            }
            PasswordAction::Verify { code } => commands::account::verify_code(&shop, &code).await,
            PasswordAction::Reset {
                email,
                new_password,
            } => commands::account::reset_password(&shop, &email, new_password).await,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&shop).await,
            CartAction::Add { id, quantity } => commands::cart::add(&shop, &id, quantity).await,
            CartAction::Set { id, quantity } => {
                commands::cart::set_quantity(&shop, &id, quantity).await
            }
            CartAction::Step { id, delta } => commands::cart::step(&shop, &id, delta).await,
            CartAction::Remove { id } => commands::cart::remove(&shop, &id).await,
            CartAction::Clear => commands::cart::clear(&shop).await,
        },
        Commands::Wishlist { action } => match action {
            WishlistAction::Show => commands::wishlist::show(&shop).await,
            WishlistAction::Toggle { id } => commands::wishlist::toggle(&shop, &id).await,
        },
        Commands::Orders => commands::orders::list(&shop).await,
        Commands::Checkout {
            details,
            phone,
            city,
        } => commands::orders::checkout(&shop, &details, &phone, &city).await,
    }
}
