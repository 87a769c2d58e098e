//! In-process identity provider and profile store.
//!
//! DESIGN
//! ======
//! Accounts are keyed by normalized email and hold a salted SHA-256 digest
//! of the password. Subscribers are invoked synchronously on the caller's
//! task. A delivery lock is held from the session mutation through the
//! fan-out (and from registration through the initial delivery in
//! `subscribe`), so every subscriber observes changes in the order they were
//! applied. Callbacks must not call back into the provider synchronously.
//! `set_offline` turns every operation into a network failure to exercise
//! error paths.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use super::rate_limit::SignInLimiter;
use super::{
    AuthError, IdentityProvider, ProfileError, ProfileInput, ProfileRecord, ProfileStore, SessionCallback,
    Subscription, SubscriptionError,
};
use crate::config::{AuthConfig, SignInLimitConfig};
use crate::services::credentials::normalize_email;
use crate::session::Principal;

const SALT_LEN: usize = 16;

struct Account {
    id: String,
    email: String,
    salt: [u8; SALT_LEN],
    password_hash: String,
    display_name: Option<String>,
}

#[derive(Default)]
struct Directory {
    accounts: HashMap<String, Account>,
    current: Option<Principal>,
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    callbacks: HashMap<u64, SessionCallback>,
}

// =============================================================================
// IDENTITY PROVIDER
// =============================================================================

#[derive(Clone)]
pub struct MemoryIdentityProvider {
    directory: Arc<Mutex<Directory>>,
    subscribers: Arc<Mutex<Subscribers>>,
    /// Orders session mutations together with their notifications.
    delivery: Arc<Mutex<()>>,
    limiter: SignInLimiter,
    min_password_len: usize,
    offline: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new(auth: AuthConfig, sign_in_limit: SignInLimitConfig) -> Self {
        Self {
            directory: Arc::new(Mutex::new(Directory::default())),
            subscribers: Arc::new(Mutex::new(Subscribers::default())),
            delivery: Arc::new(Mutex::new(())),
            limiter: SignInLimiter::new(sign_in_limit),
            min_password_len: auth.min_password_len,
            offline: Arc::new(AtomicBool::new(false)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Simulate loss of connectivity for every subsequent call.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of provider operations invoked so far, including failed ones.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .callbacks
            .len()
    }

    #[must_use]
    pub fn account_count(&self) -> usize {
        self.directory().accounts.len()
    }

    #[must_use]
    pub fn current_principal(&self) -> Option<Principal> {
        self.directory().current.clone()
    }

    /// Display name given at sign-up, if any.
    #[must_use]
    pub fn display_name(&self, email: &str) -> Option<String> {
        let email = normalize_email(email)?;
        self.directory().accounts.get(&email)?.display_name.clone()
    }

    fn directory(&self) -> std::sync::MutexGuard<'_, Directory> {
        self.directory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn delivery(&self) -> std::sync::MutexGuard<'_, ()> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_call(&self) -> Result<(), AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(AuthError::Network("identity provider unreachable".into()));
        }
        Ok(())
    }

    fn notify(&self, principal: Option<Principal>) {
        let callbacks: Vec<SessionCallback> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .callbacks
            .values()
            .cloned()
            .collect();
        debug!(subscribers = callbacks.len(), signed_in = principal.is_some(), "notifying session subscribers");
        for callback in callbacks {
            callback(principal.clone());
        }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str, profile: &ProfileInput) -> Result<Principal, AuthError> {
        self.begin_call()?;
        let email = normalize_email(email).ok_or(AuthError::InvalidEmail)?;
        if password.chars().count() < self.min_password_len {
            return Err(AuthError::WeakPassword { min_len: self.min_password_len });
        }

        let _delivery = self.delivery();
        let principal = {
            let mut directory = self.directory();
            if directory.accounts.contains_key(&email) {
                return Err(AuthError::AlreadyExists);
            }
            let salt: [u8; SALT_LEN] = rand::rng().random();
            let account = Account {
                id: Uuid::new_v4().to_string(),
                email: email.clone(),
                salt,
                password_hash: hash_password(&salt, password),
                display_name: profile.display_name.clone(),
            };
            let principal = Principal::new(account.id.clone(), account.email.clone());
            directory.accounts.insert(email, account);
            directory.current = Some(principal.clone());
            principal
        };

        self.notify(Some(principal.clone()));
        Ok(principal)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        self.begin_call()?;
        let email = normalize_email(email).ok_or(AuthError::InvalidEmail)?;
        self.limiter
            .check(&email)
            .map_err(|e| AuthError::RateLimited { retry_after_secs: e.retry_after_secs })?;

        let delivery = self.delivery();
        let outcome = {
            let mut directory = self.directory();
            let outcome = match directory.accounts.get(&email) {
                None => Err(AuthError::NotFound),
                Some(account) if hash_password(&account.salt, password) != account.password_hash => {
                    Err(AuthError::WrongPassword)
                }
                Some(account) => Ok(Principal::new(account.id.clone(), account.email.clone())),
            };
            if let Ok(principal) = &outcome {
                directory.current = Some(principal.clone());
            }
            outcome
        };

        match outcome {
            Ok(principal) => {
                self.limiter.clear(&email);
                self.notify(Some(principal.clone()));
                Ok(principal)
            }
            Err(e) => {
                drop(delivery);
                self.limiter.record_failure(&email);
                Err(e)
            }
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.begin_call()?;
        let _delivery = self.delivery();
        self.directory().current = None;
        self.notify(None);
        Ok(())
    }

    async fn delete_account(&self, id: &str) -> Result<(), AuthError> {
        self.begin_call()?;
        let _delivery = self.delivery();
        let was_current = {
            let mut directory = self.directory();
            let email = directory
                .accounts
                .values()
                .find(|account| account.id == id)
                .map(|account| account.email.clone())
                .ok_or(AuthError::NotFound)?;
            directory.accounts.remove(&email);
            let was_current = directory.current.as_ref().is_some_and(|p| p.id == id);
            if was_current {
                directory.current = None;
            }
            was_current
        };

        if was_current {
            self.notify(None);
        }
        Ok(())
    }

    fn subscribe(&self, on_change: SessionCallback) -> Result<Subscription, SubscriptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(SubscriptionError::Setup("identity provider unreachable".into()));
        }

        let _delivery = self.delivery();
        let id = {
            let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
            let id = subscribers.next_id;
            subscribers.next_id += 1;
            subscribers.callbacks.insert(id, Arc::clone(&on_change));
            id
        };
        debug!(subscription = id, "session subscriber registered");

        let current = self.current_principal();
        on_change(current);

        let subscribers = Arc::clone(&self.subscribers);
        Ok(Subscription::new(move || {
            subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .callbacks
                .remove(&id);
            debug!(subscription = id, "session subscriber released");
        }))
    }
}

/// Lowercase hex SHA-256 of `salt || password`.
fn hash_password(salt: &[u8], password: &str) -> String {
    let digest = Sha256::new().chain_update(salt).chain_update(password).finalize();
    digest.iter().fold(String::with_capacity(digest.len() * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

// =============================================================================
// PROFILE STORE
// =============================================================================

#[derive(Clone, Default)]
pub struct MemoryProfileStore {
    records: Arc<Mutex<HashMap<String, ProfileRecord>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn write_profile(&self, record: &ProfileRecord) -> Result<(), ProfileError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ProfileError::Write("profile store rejected the write".into()));
        }
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn read_profile(&self, id: &str) -> Result<Option<ProfileRecord>, ProfileError> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
