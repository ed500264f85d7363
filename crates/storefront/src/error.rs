//! Mutation error taxonomy with Sentry integration.
//!
//! Every optimistic mutation returns `Result<_, MutationError>`. Remote
//! failures are captured to Sentry before being handed back; local
//! rejections and missing sessions are not.

use thiserror::Error;

use crate::commerce::ApiError;

/// Why a mutation did not go through.
#[derive(Debug, Error)]
pub enum MutationError {
    /// No authenticated session. Nothing was written and no call was made.
    #[error("Sign in to continue")]
    AuthRequired,

    /// The remote call failed; any optimistic write was rolled back.
    #[error("Request failed: {0}")]
    NetworkOrServer(#[from] ApiError),

    /// A local precondition failed. Nothing was written and no call was made.
    #[error("Rejected: {0}")]
    ValidationRejected(#[from] Rejection),
}

impl MutationError {
    /// Log the error and capture remote failures to Sentry.
    pub fn report(&self, operation: &str) {
        match self {
            Self::NetworkOrServer(err) => {
                let event_id = sentry::capture_error(err);
                tracing::error!(
                    error = %err,
                    operation,
                    sentry_event_id = %event_id,
                    "Mutation failed"
                );
            }
            Self::AuthRequired => tracing::debug!(operation, "Mutation needs a session"),
            Self::ValidationRejected(reason) => {
                tracing::debug!(operation, reason = %reason, "Mutation rejected locally");
            }
        }
    }
}

/// Local precondition failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("quantity must be at least 1")]
    BelowMinimum,
    #[error("only {available} available")]
    AboveStock { available: u32 },
    #[error("out of stock")]
    OutOfStock,
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the shopper.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for shopper actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "6428e")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
