//! Identity provider and profile store seams.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session controller and account service only talk to these traits.
//! Hosted backends implement them outside this crate; `memory` provides an
//! in-process implementation for the CLI and tests.
//!
//! DESIGN
//! ======
//! Push notifications come back through a [`SessionCallback`]. Registration
//! returns a [`Subscription`], a scoped handle whose release runs exactly
//! once, either explicitly or on drop.

pub mod memory;
pub mod rate_limit;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::session::Principal;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Failures reported by `sign_up` / `sign_in` / `sign_out`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("an account already exists for this email")]
    AlreadyExists,
    #[error("password must be at least {min_len} characters")]
    WeakPassword { min_len: usize },
    #[error("invalid email")]
    InvalidEmail,
    #[error("no account found for this email")]
    NotFound,
    #[error("wrong password")]
    WrongPassword,
    #[error("too many attempts, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("network error: {0}")]
    Network(String),
}

/// Failure to register for session-change notifications.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    #[error("subscription setup failed: {0}")]
    Setup(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("profile write failed: {0}")]
    Write(String),
    #[error("profile read failed: {0}")]
    Read(String),
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Callback invoked with the current principal, or `None` when signed out.
pub type SessionCallback = Arc<dyn Fn(Option<Principal>) + Send + Sync>;

/// Scoped handle for a provider subscription. Releasing is idempotent and
/// also happens on drop.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self { release: Some(Box::new(release)) }
    }

    /// Run the provider's unsubscribe.
    pub fn release(mut self) {
        self.release_inner();
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    fn release_inner(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("released", &self.is_released()).finish()
    }
}

// =============================================================================
// PROFILE RECORD
// =============================================================================

/// Extra sign-up fields forwarded to the provider and the profile store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileInput {
    pub display_name: Option<String>,
}

/// Profile document keyed by principal id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub id: String,
    pub email: String,
    pub display_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ProfileRecord {
    /// Build the profile written right after account creation.
    #[must_use]
    pub fn for_principal(principal: &Principal, input: &ProfileInput, created_at: OffsetDateTime) -> Self {
        let display_name = input
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(|| default_display_name(&principal.email), str::to_owned);
        Self { id: principal.id.clone(), email: principal.email.clone(), display_name, created_at }
    }
}

/// Local part of the address, or `"user"` when there is none.
fn default_display_name(email: &str) -> String {
    let local = email.split_once('@').map_or(email, |(local, _)| local).trim();
    if local.is_empty() { "user".to_owned() } else { local.to_owned() }
}

// =============================================================================
// TRAITS
// =============================================================================

/// External identity provider (account creation, sign-in, session stream).
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// `AlreadyExists`, `WeakPassword`, `InvalidEmail` or `Network`.
    async fn sign_up(&self, email: &str, password: &str, profile: &ProfileInput) -> Result<Principal, AuthError>;

    /// # Errors
    ///
    /// `NotFound`, `WrongPassword`, `InvalidEmail`, `RateLimited` or `Network`.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError>;

    /// # Errors
    ///
    /// `Network` when the provider is unreachable.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Remove an account; signs it out if it is the current principal.
    ///
    /// # Errors
    ///
    /// `NotFound` or `Network`.
    async fn delete_account(&self, id: &str) -> Result<(), AuthError>;

    /// Register for session changes. Implementations deliver the current
    /// principal right after registration and then every change.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::Setup`] when registration fails.
    fn subscribe(&self, on_change: SessionCallback) -> Result<Subscription, SubscriptionError>;
}

/// Profile document store written on sign-up.
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ProfileError::Write`] when the store rejects the record.
    async fn write_profile(&self, record: &ProfileRecord) -> Result<(), ProfileError>;

    /// # Errors
    ///
    /// Returns [`ProfileError::Read`] when the store is unavailable.
    async fn read_profile(&self, id: &str) -> Result<Option<ProfileRecord>, ProfileError>;
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
