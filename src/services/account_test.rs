use super::*;
use crate::config::SignInLimitConfig;
use crate::provider::memory::{MemoryIdentityProvider, MemoryProfileStore};
use crate::session::{SessionController, SessionStatus};

struct Harness {
    identity: MemoryIdentityProvider,
    profiles: MemoryProfileStore,
    service: AccountService,
}

fn harness(config: AuthConfig) -> Harness {
    let identity = MemoryIdentityProvider::new(config, SignInLimitConfig::default());
    let profiles = MemoryProfileStore::new();
    let service = AccountService::new(Arc::new(identity.clone()), Arc::new(profiles.clone()), config);
    Harness { identity, profiles, service }
}

// =============================================================================
// Local validation
// =============================================================================

#[tokio::test]
async fn mismatched_confirmation_makes_no_provider_call() {
    let h = harness(AuthConfig::default());
    let form = AuthForm::sign_up("a@b.com", "secret1", "secret2");

    let err = h.service.sign_up(&form).await.unwrap_err();

    assert_eq!(err, AuthFailure::Validation(ValidationError::PasswordMismatch));
    assert_eq!(h.identity.call_count(), 0);
    assert!(h.profiles.is_empty());
}

#[tokio::test]
async fn empty_sign_in_makes_no_provider_call() {
    let h = harness(AuthConfig::default());
    let err = h.service.sign_in(&AuthForm::sign_in("", "")).await.unwrap_err();
    assert_eq!(err, AuthFailure::Validation(ValidationError::MissingEmail));
    assert_eq!(h.identity.call_count(), 0);
}

// =============================================================================
// sign_up
// =============================================================================

#[tokio::test]
async fn sign_up_writes_profile() {
    let h = harness(AuthConfig::default());
    let form = AuthForm::sign_up("Ana@Example.com", "secret1", "secret1").with_display_name("Ana");

    let outcome = h.service.sign_up(&form).await.unwrap();

    assert_eq!(outcome.principal.email, "ana@example.com");
    assert_eq!(outcome.profile_warning, None);
    assert_eq!(outcome.warning_message(), None);
    let stored = h.service.profile(&outcome.principal).await.unwrap().unwrap();
    assert_eq!(stored.display_name, "Ana");
    assert_eq!(stored.id, outcome.principal.id);
}

#[tokio::test]
async fn profile_failure_keeps_principal_by_default() {
    let h = harness(AuthConfig::default());
    h.profiles.set_fail_writes(true);

    let outcome = h.service.sign_up(&AuthForm::sign_up("a@b.com", "secret1", "secret1")).await.unwrap();

    assert!(matches!(outcome.profile_warning, Some(ProfileError::Write(_))));
    assert!(outcome.warning_message().is_some());
    assert_eq!(h.identity.account_count(), 1);
    assert_eq!(h.identity.current_principal(), Some(outcome.principal));
}

#[tokio::test]
async fn profile_failure_rolls_back_when_compensating() {
    let config = AuthConfig { compensate_profile_failure: true, ..AuthConfig::default() };
    let h = harness(config);
    h.profiles.set_fail_writes(true);

    let err = h.service.sign_up(&AuthForm::sign_up("a@b.com", "secret1", "secret1")).await.unwrap_err();

    assert!(matches!(err, AuthFailure::ProfileRolledBack(_)));
    assert_eq!(h.identity.account_count(), 0);
    assert_eq!(h.identity.current_principal(), None);
}

#[tokio::test]
async fn duplicate_sign_up_surfaces_provider_error() {
    let h = harness(AuthConfig::default());
    let form = AuthForm::sign_up("a@b.com", "secret1", "secret1");
    h.service.sign_up(&form).await.unwrap();

    let err = h.service.sign_up(&form).await.unwrap_err();
    assert_eq!(err, AuthFailure::Provider(AuthError::AlreadyExists));
    assert_eq!(err.user_message(), "An account with this email already exists.");
}

// =============================================================================
// sign_in / sign_out / submit
// =============================================================================

#[tokio::test]
async fn submit_dispatches_by_mode() {
    let h = harness(AuthConfig::default());
    let created = h.service.submit(&AuthForm::sign_up("a@b.com", "secret1", "secret1")).await.unwrap();
    let SubmitOutcome::SignedUp(outcome) = created else {
        panic!("expected sign-up outcome");
    };
    h.service.sign_out().await.unwrap();

    let signed_in = h.service.submit(&AuthForm::sign_in("a@b.com", "secret1")).await.unwrap();
    assert_eq!(signed_in, SubmitOutcome::SignedIn(outcome.principal));
}

#[tokio::test]
async fn network_failure_is_recoverable() {
    let h = harness(AuthConfig::default());
    h.identity.set_offline(true);

    let err = h.service.sign_in(&AuthForm::sign_in("a@b.com", "secret1")).await.unwrap_err();
    assert!(matches!(err, AuthFailure::Provider(AuthError::Network(_))));
    assert_eq!(err.user_message(), "Can't reach the server. Check your connection.");

    h.identity.set_offline(false);
    assert_eq!(
        h.service.sign_in(&AuthForm::sign_in("a@b.com", "secret1")).await.unwrap_err(),
        AuthFailure::Provider(AuthError::NotFound)
    );
}

#[tokio::test]
async fn account_flow_drives_session_controller() {
    let h = harness(AuthConfig::default());
    let mut controller = SessionController::new();
    controller.start(&h.identity).unwrap();
    assert_eq!(controller.state().status(), SessionStatus::SignedOut);

    let outcome = h.service.sign_up(&AuthForm::sign_up("a@b.com", "secret1", "secret1")).await.unwrap();
    assert_eq!(controller.state().identity(), Some(&outcome.principal));

    h.service.sign_out().await.unwrap();
    assert_eq!(controller.state().status(), SessionStatus::SignedOut);

    controller.stop();
    assert_eq!(h.identity.subscriber_count(), 0);
}

// =============================================================================
// user_message
// =============================================================================

#[test]
fn every_failure_has_a_message() {
    let failures = [
        AuthFailure::Validation(ValidationError::MissingEmail),
        AuthFailure::Validation(ValidationError::MissingPassword),
        AuthFailure::Validation(ValidationError::InvalidEmail),
        AuthFailure::Validation(ValidationError::PasswordMismatch),
        AuthFailure::Provider(AuthError::AlreadyExists),
        AuthFailure::Provider(AuthError::WeakPassword { min_len: 6 }),
        AuthFailure::Provider(AuthError::InvalidEmail),
        AuthFailure::Provider(AuthError::NotFound),
        AuthFailure::Provider(AuthError::WrongPassword),
        AuthFailure::Provider(AuthError::RateLimited { retry_after_secs: 30 }),
        AuthFailure::Provider(AuthError::Network("down".into())),
        AuthFailure::ProfileRolledBack(ProfileError::Write("nope".into())),
    ];
    for failure in &failures {
        assert!(!failure.user_message().is_empty(), "{failure:?}");
    }
    assert_eq!(
        AuthFailure::Provider(AuthError::WeakPassword { min_len: 8 }).user_message(),
        "Password must be at least 8 characters."
    );
}
