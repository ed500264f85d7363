//! Status enums shared across the storefront.

use serde::{Deserialize, Serialize};

/// Identity status reported by the session provider.
///
/// Cart and wishlist state only exists while the session is
/// [`Authenticated`](Self::Authenticated); every other status resets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Unauthenticated,
    /// Credential exchange in progress.
    Loading,
    Authenticated,
}

impl SessionStatus {
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::Loading => write!(f, "loading"),
            Self::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// How an order was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
}

/// Progress of an order as reported by the commerce API flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderProgress {
    AwaitingPayment,
    Paid,
    Delivered,
}

impl OrderProgress {
    /// Derive progress from the API's `isPaid` / `isDelivered` flags.
    #[must_use]
    pub const fn from_flags(is_paid: bool, is_delivered: bool) -> Self {
        match (is_paid, is_delivered) {
            (_, true) => Self::Delivered,
            (true, false) => Self::Paid,
            (false, false) => Self::AwaitingPayment,
        }
    }
}

impl std::fmt::Display for OrderProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::AwaitingPayment => "awaiting payment",
            Self::Paid => "paid",
            Self::Delivered => "delivered",
        })
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Cash => "cash",
            Self::Card => "card",
        })
    }
}
