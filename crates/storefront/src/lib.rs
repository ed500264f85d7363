//! FreshCart Storefront library.
//!
//! Talks to the remote commerce REST service and keeps the shopper's cart
//! and wishlist in observable shared stores that are updated optimistically
//! and rolled back when the service refuses.
//!
//! # Modules
//!
//! - [`commerce`] - REST client, wire types, response normalization
//! - [`state`] - [`state::Storefront`] application state and the stores
//! - [`mutations`] - optimistic cart/wishlist operations and the debounced
//!   quantity stepper
//! - [`sync`] - store reset/refetch on session transitions
//! - [`session`] - bearer token and session status

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod commerce;
pub mod config;
pub mod error;
pub mod forms;
pub mod mutations;
pub mod notice;
pub mod session;
pub mod state;
pub mod sync;

#[cfg(test)]
mod testing;
