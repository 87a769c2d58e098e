//! Sign-up, sign-in and sign-out flows invoked from the auth screens.
//!
//! DESIGN
//! ======
//! Forms are validated locally first; only valid requests reach the
//! identity provider. Every failure comes back as an [`AuthFailure`] with a
//! user-facing message, and the calling screen recovers from it.
//!
//! TRADE-OFFS
//! ==========
//! A profile write failure after account creation keeps the principal and
//! reports a warning by default. With `compensate_profile_failure` on, the
//! principal is deleted instead so identity and profile never diverge.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{error, info, warn};

use super::credentials::{AuthForm, AuthMode, ValidationError};
use crate::config::AuthConfig;
use crate::provider::{AuthError, IdentityProvider, ProfileError, ProfileRecord, ProfileStore};
use crate::session::Principal;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Provider(#[from] AuthError),
    #[error("account removed after profile write failed: {0}")]
    ProfileRolledBack(ProfileError),
}

impl AuthFailure {
    /// Text shown to the user on the auth screen.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(ValidationError::MissingEmail) => "Please enter your email address.".into(),
            Self::Validation(ValidationError::MissingPassword) => "Please enter your password.".into(),
            Self::Validation(ValidationError::InvalidEmail) | Self::Provider(AuthError::InvalidEmail) => {
                "That email address doesn't look right.".into()
            }
            Self::Validation(ValidationError::PasswordMismatch) => "Passwords do not match.".into(),
            Self::Provider(AuthError::AlreadyExists) => "An account with this email already exists.".into(),
            Self::Provider(AuthError::WeakPassword { min_len }) => {
                format!("Password must be at least {min_len} characters.")
            }
            Self::Provider(AuthError::NotFound) => "No account found for this email.".into(),
            Self::Provider(AuthError::WrongPassword) => "Incorrect password. Please try again.".into(),
            Self::Provider(AuthError::RateLimited { retry_after_secs }) => {
                format!("Too many attempts. Try again in {retry_after_secs} seconds.")
            }
            Self::Provider(AuthError::Network(_)) => "Can't reach the server. Check your connection.".into(),
            Self::ProfileRolledBack(_) => "We couldn't finish creating your account. Please try again.".into(),
        }
    }
}

/// Result of a sign-up that created a principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub principal: Principal,
    pub profile: ProfileRecord,
    /// Set when the profile write failed but the principal was kept.
    pub profile_warning: Option<ProfileError>,
}

impl SignUpOutcome {
    #[must_use]
    pub fn warning_message(&self) -> Option<&'static str> {
        self.profile_warning
            .as_ref()
            .map(|_| "Your account was created, but your profile could not be saved.")
    }
}

/// What a submitted auth form produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    SignedIn(Principal),
    SignedUp(SignUpOutcome),
}

#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    config: AuthConfig,
}

impl AccountService {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>, profiles: Arc<dyn ProfileStore>, config: AuthConfig) -> Self {
        Self { identity, profiles, config }
    }

    /// Dispatch the form by its mode.
    ///
    /// # Errors
    ///
    /// See [`AccountService::sign_in`] and [`AccountService::sign_up`].
    pub async fn submit(&self, form: &AuthForm) -> Result<SubmitOutcome, AuthFailure> {
        match form.mode {
            AuthMode::SignIn => self.sign_in(form).await.map(SubmitOutcome::SignedIn),
            AuthMode::SignUp => self.sign_up(form).await.map(SubmitOutcome::SignedUp),
        }
    }

    /// # Errors
    ///
    /// Local validation errors (no provider call made) or provider failures.
    pub async fn sign_in(&self, form: &AuthForm) -> Result<Principal, AuthFailure> {
        let req = form.validate_sign_in()?;
        match self.identity.sign_in(&req.email, &req.password).await {
            Ok(principal) => {
                info!(user_id = %principal.id, "signed in");
                Ok(principal)
            }
            Err(e) => {
                info!(error = %e, "sign-in rejected");
                Err(e.into())
            }
        }
    }

    /// Create the account, then write its profile record.
    ///
    /// # Errors
    ///
    /// Local validation errors (no provider call made), provider failures,
    /// or [`AuthFailure::ProfileRolledBack`] when compensation removed the
    /// new principal.
    pub async fn sign_up(&self, form: &AuthForm) -> Result<SignUpOutcome, AuthFailure> {
        let req = form.validate_sign_up()?;
        let principal = self
            .identity
            .sign_up(&req.email, &req.password, &req.profile)
            .await
            .inspect_err(|e| info!(error = %e, "sign-up rejected"))?;
        info!(user_id = %principal.id, "account created");

        let profile = ProfileRecord::for_principal(&principal, &req.profile, OffsetDateTime::now_utc());
        let Err(write_err) = self.profiles.write_profile(&profile).await else {
            return Ok(SignUpOutcome { principal, profile, profile_warning: None });
        };
        warn!(user_id = %principal.id, error = %write_err, "profile write failed after account creation");

        if self.config.compensate_profile_failure {
            match self.identity.delete_account(&principal.id).await {
                Ok(()) => {
                    info!(user_id = %principal.id, "account rolled back");
                    return Err(AuthFailure::ProfileRolledBack(write_err));
                }
                Err(e) => error!(user_id = %principal.id, error = %e, "account rollback failed; keeping principal"),
            }
        }

        Ok(SignUpOutcome { principal, profile, profile_warning: Some(write_err) })
    }

    /// # Errors
    ///
    /// Provider failures, typically `Network`.
    pub async fn sign_out(&self) -> Result<(), AuthFailure> {
        self.identity.sign_out().await?;
        info!("signed out");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the store's [`ProfileError`].
    pub async fn profile(&self, principal: &Principal) -> Result<Option<ProfileRecord>, ProfileError> {
        self.profiles.read_profile(&principal.id).await
    }
}

#[cfg(test)]
#[path = "account_test.rs"]
mod tests;
