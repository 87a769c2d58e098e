use super::*;

// =============================================================================
// normalize_email
// =============================================================================

#[test]
fn normalize_email_accepts_basic_address() {
    assert_eq!(normalize_email("  USER@Example.com "), Some("user@example.com".to_owned()));
}

#[test]
fn normalize_email_rejects_invalid_values() {
    assert_eq!(normalize_email(""), None);
    assert_eq!(normalize_email("user"), None);
    assert_eq!(normalize_email("@example.com"), None);
    assert_eq!(normalize_email("user@"), None);
    assert_eq!(normalize_email("a@b@c"), None);
}

// =============================================================================
// validate_sign_in
// =============================================================================

#[test]
fn sign_in_requires_email_and_password() {
    assert_eq!(AuthForm::sign_in("", "secret1").validate_sign_in(), Err(ValidationError::MissingEmail));
    assert_eq!(AuthForm::sign_in("a@b.com", "").validate_sign_in(), Err(ValidationError::MissingPassword));
    assert_eq!(AuthForm::sign_in("ab.com", "x").validate_sign_in(), Err(ValidationError::InvalidEmail));
}

#[test]
fn sign_in_normalizes_email_and_keeps_password_verbatim() {
    let req = AuthForm::sign_in(" A@B.com", " pass ").validate_sign_in().unwrap();
    assert_eq!(req.email, "a@b.com");
    assert_eq!(req.password, " pass ");
}

// =============================================================================
// validate_sign_up
// =============================================================================

#[test]
fn sign_up_rejects_mismatched_confirmation() {
    let form = AuthForm::sign_up("a@b.com", "secret1", "secret2");
    assert_eq!(form.validate_sign_up(), Err(ValidationError::PasswordMismatch));
}

#[test]
fn sign_up_carries_trimmed_display_name() {
    let form = AuthForm::sign_up("a@b.com", "secret1", "secret1").with_display_name("  Ana ");
    let req = form.validate_sign_up().unwrap();
    assert_eq!(req.profile.display_name.as_deref(), Some("Ana"));
}

#[test]
fn sign_up_blank_display_name_is_none() {
    let req = AuthForm::sign_up("a@b.com", "secret1", "secret1").validate_sign_up().unwrap();
    assert_eq!(req.profile.display_name, None);
}

// =============================================================================
// toggle_mode
// =============================================================================

#[test]
fn toggle_mode_flips_and_clears_fields() {
    let mut form = AuthForm::sign_up("a@b.com", "secret1", "secret1").with_display_name("Ana");
    form.toggle_mode();
    assert_eq!(form, AuthForm { mode: AuthMode::SignIn, ..AuthForm::default() });

    form.email = "x@y.com".into();
    form.toggle_mode();
    assert_eq!(form.mode, AuthMode::SignUp);
    assert!(form.email.is_empty());
}
