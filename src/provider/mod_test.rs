use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

fn counting_subscription() -> (Subscription, Arc<AtomicUsize>) {
    let releases = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&releases);
    let sub = Subscription::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (sub, releases)
}

// =============================================================================
// Subscription
// =============================================================================

#[test]
fn explicit_release_runs_once() {
    let (sub, releases) = counting_subscription();
    assert!(!sub.is_released());
    sub.release();
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[test]
fn drop_releases_subscription() {
    let (sub, releases) = counting_subscription();
    drop(sub);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[test]
fn release_on_early_return_path() {
    fn bail(sub: Subscription) -> Result<(), &'static str> {
        let _held = sub;
        Err("setup aborted")
    }

    let (sub, releases) = counting_subscription();
    assert!(bail(sub).is_err());
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

// =============================================================================
// ProfileRecord
// =============================================================================

#[test]
fn profile_uses_given_display_name() {
    let principal = Principal::new("u1", "ana@example.com");
    let input = ProfileInput { display_name: Some("  Ana Silva ".into()) };
    let record = ProfileRecord::for_principal(&principal, &input, OffsetDateTime::UNIX_EPOCH);
    assert_eq!(record.display_name, "Ana Silva");
    assert_eq!(record.id, "u1");
}

#[test]
fn profile_defaults_display_name_to_email_local_part() {
    let principal = Principal::new("u1", "ana@example.com");
    let input = ProfileInput { display_name: Some("   ".into()) };
    let record = ProfileRecord::for_principal(&principal, &input, OffsetDateTime::UNIX_EPOCH);
    assert_eq!(record.display_name, "ana");
}

#[test]
fn profile_without_local_part_falls_back_to_user() {
    let principal = Principal::new("u1", "@example.com");
    let record = ProfileRecord::for_principal(&principal, &ProfileInput::default(), OffsetDateTime::UNIX_EPOCH);
    assert_eq!(record.display_name, "user");
    assert_eq!(default_display_name("ana"), "ana");
}

#[test]
fn profile_serializes_camel_case_with_rfc3339_timestamp() {
    let principal = Principal::new("u1", "ana@example.com");
    let record = ProfileRecord::for_principal(&principal, &ProfileInput::default(), OffsetDateTime::UNIX_EPOCH);
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["displayName"], "ana");
    assert_eq!(json["createdAt"], "1970-01-01T00:00:00Z");
}
