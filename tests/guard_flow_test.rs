//! End-to-end flows through the request context, sanitiser and input guard:
//! registration, login with hash upgrade, and the second-factor step.

use request_guard::error::AuthenticationError;
use request_guard::web::{ExtractFormInput, RequestContext, SessionGate};
use request_guard::{
    FormSanitiser, GuardConfig, GuardSettings, HttpError, HttpErrorKind, InputGuard, LengthRule,
    MemoryStore, PasswordPolicy, RecordStore, TWO_FACTOR_SUBJECT,
};
use serde_json::json;

const NOW: u64 = 1_700_000_000;

fn fast_policy() -> PasswordPolicy {
    PasswordPolicy {
        min_length: 8,
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    }
}

fn guard(store: &MemoryStore) -> InputGuard<'_> {
    InputGuard::new(store, FormSanitiser::new(fast_policy()).unwrap(), GuardSettings::default())
}

fn registration(password: &str, confirm: &str) -> RequestContext {
    let mut ctx = RequestContext::new("req-register").with_time(NOW);
    ctx.add_form_field("name", "  <i>Kim</i> O\\'Neil ");
    ctx.add_form_field("email", "kim@example.com");
    ctx.add_form_field("password", password);
    ctx.add_form_field("confirm_password", confirm);
    ctx
}

#[test]
fn registration_produces_hashed_record() {
    let store = MemoryStore::new();
    let guard = guard(&store);
    let ctx = registration("correct horse", "correct horse");

    let clean = guard
        .get_sanitised_input_data(ctx.extract_form_input(), &[LengthRule::new("name", 2, 40)])
        .unwrap();

    assert_eq!(clean.get("name"), Some("Kim O&#039;Neil"));
    assert!(!clean.contains("confirm_password"));
    let hash = clean.get("password").unwrap().to_string();
    assert!(hash.starts_with("$argon2id$"));

    store.insert("users", 1, json!(clean.into_record()));
    let record = store.find_by_id("users", 1).unwrap().unwrap();
    assert!(guard.check_password("correct horse", &record).is_ok());
}

#[test]
fn registered_password_with_markup_logs_in_as_typed() {
    let store = MemoryStore::new();
    let guard = guard(&store);
    let typed = " p&ss'w<rd>\\1 ";
    let ctx = registration(typed, typed);

    let clean = guard
        .get_sanitised_input_data(ctx.extract_form_input(), &[])
        .unwrap();
    store.insert("users", 2, json!(clean.into_record()));
    let record = store.find_by_id("users", 2).unwrap().unwrap();

    assert!(guard.check_password(typed, &record).is_ok());
    assert!(matches!(
        guard.check_password("p&amp;ss&#039;w1", &record),
        Err(AuthenticationError::CredentialMismatch)
    ));
}

#[test]
fn rejected_registration_maps_to_422() {
    let store = MemoryStore::new();
    let guard = guard(&store);
    let ctx = registration("first choice", "second choice");

    let err = guard
        .get_sanitised_input_data(ctx.extract_form_input(), &[])
        .unwrap_err();
    assert_eq!(err.messages(), ["Password and Confirm Password do not match"]);

    let http = HttpError::from(err);
    assert_eq!(http.kind(), HttpErrorKind::UnprocessableEntity);
    assert_eq!(
        http.message(),
        "Please correct the following errors: Password and Confirm Password do not match"
    );
}

#[test]
fn login_upgrades_hash_then_issues_second_factor() {
    let store = MemoryStore::new();
    let legacy = PasswordPolicy {
        memory_kib: 256,
        ..fast_policy()
    }
    .hasher()
    .unwrap()
    .hash("correct horse")
    .unwrap();
    store.insert("users", 7, json!({"email": "kim@example.com", "password": legacy}));
    let guard = guard(&store);

    // Login form
    let mut ctx = RequestContext::new("req-login").with_time(NOW);
    ctx.add_form_field("email", "kim@example.com");
    ctx.add_form_field("password", "correct horse");
    let clean = guard.get_sanitised_input_data(ctx.extract_form_input(), &[]).unwrap();

    let record = guard.find_by_email(&clean).unwrap();
    guard.check_password("correct horse", &record).unwrap();
    let stored = store.field("users", 7, "password").unwrap();
    assert_ne!(stored, json!(legacy));

    // Second factor
    let now = ctx.now();
    let token = guard.generate_and_persist_token(7, ctx.session_mut(), now).unwrap();
    assert_eq!(ctx.session().get_i64(TWO_FACTOR_SUBJECT), Some(7));

    let subject = guard
        .verify_second_factor(&token, ctx.session_mut(), now + 30)
        .unwrap();
    assert_eq!(subject, 7);
    assert_eq!(store.field("users", 7, "two_factor_token"), Some(serde_json::Value::Null));
}

#[test]
fn wrong_password_maps_to_401() {
    let store = MemoryStore::new();
    let guard = guard(&store);
    let hash = fast_policy().hasher().unwrap().hash("correct horse").unwrap();
    store.insert("users", 7, json!({"email": "kim@example.com", "password": hash}));
    let record = store.find_by_id("users", 7).unwrap().unwrap();

    let err = guard.check_password("battery staple", &record).unwrap_err();
    assert!(matches!(err, AuthenticationError::CredentialMismatch));
    assert_eq!(HttpError::from(err).status_code(), 401);
}

#[test]
fn second_factor_respects_configured_ttl() {
    let store = MemoryStore::new();
    store.insert("users", 3, json!({}));
    let config = GuardConfig {
        second_factor_ttl_secs: 60,
        password: fast_policy(),
        ..GuardConfig::default()
    };
    let guard = InputGuard::from_config(&store, &config).unwrap();
    let mut ctx = RequestContext::new("req-2fa").with_time(NOW);

    let token = guard.generate_and_persist_token(3, ctx.session_mut(), NOW).unwrap();
    let err = guard
        .verify_second_factor(&token, ctx.session_mut(), NOW + 61)
        .unwrap_err();

    assert!(matches!(err, AuthenticationError::TokenExpired));
    assert!(ctx.session().get(TWO_FACTOR_SUBJECT).is_none());
}

#[test]
fn session_gate_after_login() {
    let gate = SessionGate::new("auth.user").allow_roles(["admin", "staff"]);
    let mut ctx = RequestContext::new("req-admin");

    let err = gate.check(ctx.session()).unwrap_err();
    assert_eq!(HttpError::from(err).status_code(), 401);

    ctx.session_mut().set("auth.user", json!({"id": 7, "role": "member"}));
    let err = gate.check(ctx.session()).unwrap_err();
    assert_eq!(HttpError::from(err).status_code(), 403);

    ctx.session_mut().set("auth.user.role", json!("staff"));
    assert!(gate.check(ctx.session()).is_ok());
}

#[test]
fn session_gate_honours_configured_default_role() {
    let config = GuardConfig {
        default_role: "member".to_string(),
        ..GuardConfig::default()
    };
    let gate = SessionGate::new("auth.user")
        .allow_roles(["member"])
        .with_default_role(&config.default_role);
    let mut ctx = RequestContext::new("req-member");
    ctx.session_mut().set("auth.user", json!({"id": 9}));

    assert!(gate.check(ctx.session()).is_ok());
}
