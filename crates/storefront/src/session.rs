//! Session identity.
//!
//! The identity provider hands out an opaque bearer token after credential
//! exchange. The session holds that token and the current
//! [`SessionStatus`]; every status change is observable so the cart and
//! wishlist stores can be re-derived (see [`crate::sync`]).

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use freshcart_core::{SessionStatus, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::watch;

/// Bearer token attached to authenticated API calls.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for the request header only.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// User id from the token's `id` claim.
    ///
    /// The signature is not checked: the token is only ever sent back to the
    /// service that issued it, which does the verification.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        #[derive(Deserialize)]
        struct Claims {
            id: Option<String>,
        }

        let payload = self.expose().split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        let claims: Claims = serde_json::from_slice(&bytes).ok()?;
        claims.id.and_then(|id| UserId::parse(id).ok())
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Signed-in shopper.
#[derive(Debug, Clone)]
pub struct Identity {
    pub token: AccessToken,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Snapshot of the session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub status: SessionStatus,
    pub identity: Option<Identity>,
}

impl SessionState {
    /// The token, but only while authenticated.
    #[must_use]
    pub fn authenticated_token(&self) -> Option<&AccessToken> {
        if self.status.is_authenticated() {
            self.identity.as_ref().map(|identity| &identity.token)
        } else {
            None
        }
    }
}

/// Shared, observable session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandle {
    /// A signed-out session.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self { tx: Arc::new(tx) }
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.tx.borrow().status
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Token for an authenticated call, or `None` when signed out/loading.
    #[must_use]
    pub fn token(&self) -> Option<AccessToken> {
        self.tx.borrow().authenticated_token().cloned()
    }

    /// Credential exchange started.
    pub fn begin_sign_in(&self) {
        self.tx.send_replace(SessionState {
            status: SessionStatus::Loading,
            identity: None,
        });
    }

    pub fn authenticate(&self, identity: Identity) {
        tracing::info!(user_id = ?identity.token.user_id(), "session authenticated");
        self.tx.send_replace(SessionState {
            status: SessionStatus::Authenticated,
            identity: Some(identity),
        });
    }

    pub fn sign_out(&self) {
        tracing::info!("session signed out");
        self.tx.send_replace(SessionState::default());
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }
}
