//! Auth screen form state and local validation.
//!
//! SYSTEM CONTEXT
//! ==============
//! Everything here runs before the identity provider is contacted. A form
//! that fails validation never produces a provider call.

use crate::provider::ProfileInput;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("email is required")]
    MissingEmail,
    #[error("password is required")]
    MissingPassword,
    #[error("invalid email")]
    InvalidEmail,
    #[error("passwords do not match")]
    PasswordMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

/// Raw field values as typed on the auth screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub profile: ProfileInput,
}

impl AuthForm {
    #[must_use]
    pub fn sign_in(email: &str, password: &str) -> Self {
        Self { mode: AuthMode::SignIn, email: email.to_owned(), password: password.to_owned(), ..Self::default() }
    }

    #[must_use]
    pub fn sign_up(email: &str, password: &str, confirm_password: &str) -> Self {
        Self {
            mode: AuthMode::SignUp,
            email: email.to_owned(),
            password: password.to_owned(),
            confirm_password: confirm_password.to_owned(),
            display_name: String::new(),
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = name.to_owned();
        self
    }

    /// Switch between sign-in and sign-up, clearing every field.
    pub fn toggle_mode(&mut self) {
        let mode = match self.mode {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        };
        *self = Self { mode, ..Self::default() };
    }

    /// # Errors
    ///
    /// Missing fields or a malformed email.
    pub fn validate_sign_in(&self) -> Result<SignInRequest, ValidationError> {
        let email = validated_email(&self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::MissingPassword);
        }
        Ok(SignInRequest { email, password: self.password.clone() })
    }

    /// # Errors
    ///
    /// Missing fields, a malformed email, or a confirmation that does not
    /// match the password.
    pub fn validate_sign_up(&self) -> Result<SignUpRequest, ValidationError> {
        let email = validated_email(&self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::MissingPassword);
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        let display_name = Some(self.display_name.trim().to_owned()).filter(|name| !name.is_empty());
        Ok(SignUpRequest { email, password: self.password.clone(), profile: ProfileInput { display_name } })
    }
}

fn validated_email(raw: &str) -> Result<String, ValidationError> {
    if raw.trim().is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    normalize_email(raw).ok_or(ValidationError::InvalidEmail)
}

/// Trim and lowercase; require exactly one `@` with both sides non-empty.
#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim();
    let (local, domain) = email.split_once('@')?;
    let well_formed = !local.is_empty() && !domain.is_empty() && !domain.contains('@');
    well_formed.then(|| email.to_ascii_lowercase())
}

#[cfg(test)]
#[path = "credentials_test.rs"]
mod tests;
