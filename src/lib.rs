//! Client-side session synchronization for the MATE rental app.
//!
//! ARCHITECTURE
//! ============
//! `session` mirrors the identity provider's push notifications into a
//! synchronously readable state. `routing` turns state transitions into
//! navigation. `services` runs the sign-in/sign-up flows against the
//! `provider` traits, with `provider::memory` as the in-process backend.

pub mod config;
pub mod provider;
pub mod routing;
pub mod services;
pub mod session;
