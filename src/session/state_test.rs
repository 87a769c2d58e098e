use super::*;

fn alice() -> Principal {
    Principal::new("u1", "a@b.com")
}

// =============================================================================
// from_notification
// =============================================================================

#[test]
fn notification_with_principal_signs_in() {
    let state = SessionState::from_notification(Some(alice()));
    assert_eq!(state.status(), SessionStatus::SignedIn);
    assert_eq!(state.identity().map(|p| p.id.as_str()), Some("u1"));
}

#[test]
fn notification_without_principal_signs_out() {
    let state = SessionState::from_notification(None);
    assert_eq!(state.status(), SessionStatus::SignedOut);
    assert!(state.identity().is_none());
}

// =============================================================================
// identity invariant
// =============================================================================

#[test]
fn identity_present_only_when_signed_in() {
    let states = [SessionState::Loading, SessionState::SignedOut, SessionState::SignedIn(alice())];
    for state in &states {
        assert_eq!(state.identity().is_some(), state.status() == SessionStatus::SignedIn, "{state:?}");
    }
}

#[test]
fn default_state_is_loading() {
    let state = SessionState::default();
    assert!(state.is_loading());
    assert!(!state.is_signed_in());
}

// =============================================================================
// serde
// =============================================================================

#[test]
fn signed_in_serializes_with_identity_payload() {
    let json = serde_json::to_value(SessionState::SignedIn(alice())).unwrap();
    assert_eq!(json["status"], "signed_in");
    assert_eq!(json["identity"]["email"], "a@b.com");
}

#[test]
fn status_display_matches_snake_case() {
    assert_eq!(SessionStatus::SignedOut.to_string(), "signed_out");
    assert_eq!(SessionStatus::Loading.as_str(), "loading");
}
