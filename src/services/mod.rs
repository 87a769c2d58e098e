//! Auth flows used by the sign-in and sign-up screens.
//!
//! ARCHITECTURE
//! ============
//! `credentials` owns form state and local validation; `account` talks to
//! the identity provider and profile store.

pub mod account;
pub mod credentials;
