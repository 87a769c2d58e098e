//! Session state and the controller that mirrors it from the provider.

pub mod controller;
pub mod state;

pub use controller::{SessionController, SessionError, SessionReader, TransitionFeed};
pub use state::{Principal, SessionState, SessionStatus, Transition};
