//! Session value types mirrored from the identity provider.
//!
//! DESIGN
//! ======
//! The identity lives inside the `SignedIn` variant, so "identity present
//! iff signed in" holds by construction. Values are immutable per version:
//! every provider notification produces a fresh `SessionState`.

use serde::{Deserialize, Serialize};

/// Provider-supplied representation of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Opaque identifier assigned by the provider.
    pub id: String,
    pub email: String,
}

impl Principal {
    #[must_use]
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self { id: id.into(), email: email.into() }
    }
}

/// Readiness/identity status without the identity payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Loading,
    SignedIn,
    SignedOut,
}

impl SessionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::SignedIn => "signed_in",
            Self::SignedOut => "signed_out",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session state owned by the controller and copied out to readers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "identity", rename_all = "snake_case")]
pub enum SessionState {
    /// No provider notification received yet.
    #[default]
    Loading,
    SignedIn(Principal),
    SignedOut,
}

impl SessionState {
    /// Map one provider notification onto the next state. Never yields `Loading`.
    #[must_use]
    pub fn from_notification(principal: Option<Principal>) -> Self {
        match principal {
            Some(principal) => Self::SignedIn(principal),
            None => Self::SignedOut,
        }
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Loading => SessionStatus::Loading,
            Self::SignedIn(_) => SessionStatus::SignedIn,
            Self::SignedOut => SessionStatus::SignedOut,
        }
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Principal> {
        match self {
            Self::SignedIn(principal) => Some(principal),
            Self::Loading | Self::SignedOut => None,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        matches!(self, Self::SignedIn(_))
    }
}

/// A state replacement that changed the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: SessionStatus,
    pub to: SessionState,
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
