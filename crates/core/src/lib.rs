//! FreshCart Core - Shared domain types.
//!
//! This crate provides the types shared by every FreshCart component:
//! - `storefront` - Commerce API client, shared cart/wishlist state, mutations
//! - `cli` - Command-line front end over the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no async
//! runtime. This keeps it lightweight and usable from tests and tools alike.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for product/cart/user IDs, prices, emails,
//!   and session status

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
