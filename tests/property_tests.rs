//! Property tests for cross-module invariants.

use jsonwebtoken::EncodingKey;
use proptest::prelude::*;
use request_guard::error::{AuthenticationError, DecodeError, DenialReason};
use request_guard::web::{RequestContext, RoleMiddleware};
use request_guard::{
    decode, generate_auth_token, issue, Algorithm, AuthorizationResult, Claims, FormSanitiser,
    GuardSettings, InputGuard, MarkupSanitizer, MemoryStore, PasswordPolicy, RawFormInput,
    RecordingReporter, RoleAuthorizer, Sanitizer, Session, Tainted, ValidationOutcome,
    VerificationKey,
};

const NOW: u64 = 1_700_000_000;

fn arb_role() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{3,10}").unwrap()
}

fn arb_secret() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 16..48)
}

/// Passwords mixing markup and escape characters, never blank after trimming.
fn arb_password() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9&<>'\" \\\\]{5,23}[A-Za-z0-9]").unwrap()
}

/// Empty, placeholder or ordinary field values.
fn arb_field_value() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("select".to_string()),
        "[a-z0-9]{1,8}",
    ]
}

fn sign(claims: &Claims, secret: &[u8]) -> String {
    issue(claims, Algorithm::Hs256, &EncodingKey::from_secret(secret)).unwrap()
}

fn fast_policy() -> PasswordPolicy {
    PasswordPolicy {
        min_length: 6,
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    }
}

proptest! {
    /// A token signed with the configured key, carrying a role in the
    /// allow-list, always authorizes.
    #[test]
    fn own_role_always_authorizes(
        secret in arb_secret(),
        id in 1i64..1_000_000,
        role in arb_role(),
    ) {
        let claims = Claims {
            sub: Some(id),
            role: Some(role.clone()),
            exp: Some(NOW + 60),
            ..Claims::default()
        };
        let token = sign(&claims, &secret);

        let decoded = decode(&token, &VerificationKey::hmac(&secret), NOW).unwrap();
        let result = RoleAuthorizer::new([role.clone()]).authorize(&decoded);

        prop_assert_eq!(
            result.principal().map(|p| (p.subject_id, p.role.clone())),
            Some((id, role))
        );
    }

    /// A token signed with any other key never authorizes, whatever role it claims.
    #[test]
    fn foreign_key_never_authorizes(
        secret in arb_secret(),
        other in arb_secret(),
        role in arb_role(),
    ) {
        prop_assume!(secret != other);
        let claims = Claims { sub: Some(1), role: Some(role.clone()), ..Claims::default() };

        let reporter = RecordingReporter::new();
        let middleware = RoleMiddleware::new(
            VerificationKey::hmac(&secret),
            RoleAuthorizer::new([role]),
            &reporter,
        );
        let mut ctx = RequestContext::new("req-prop").with_time(NOW);
        ctx.add_cookie("auth_token", sign(&claims, &other));

        prop_assert_eq!(
            middleware.check(&ctx),
            AuthorizationResult::Denied(DenialReason::Credential(DecodeError::SignatureInvalid))
        );
        prop_assert_eq!(reporter.len(), 1);
    }

    /// Arbitrary bytes in the carrier never panic and never authorize.
    #[test]
    fn garbage_credentials_are_denied(token in "\\PC{0,80}") {
        let reporter = RecordingReporter::new();
        let middleware = RoleMiddleware::new(
            VerificationKey::hmac(b"k"),
            RoleAuthorizer::new(["admin"]),
            &reporter,
        );
        let mut ctx = RequestContext::new("req-garbage").with_time(NOW);
        ctx.add_cookie("auth_token", token);

        prop_assert!(!middleware.check(&ctx).is_authorized());
    }

    /// Changing the default role changes the outcome for roleless claims.
    #[test]
    fn default_role_is_deterministic(allowed in arb_role(), default in arb_role()) {
        let claims = Claims { sub: Some(5), ..Claims::default() };
        let authorizer = RoleAuthorizer::new([allowed.clone()]).with_default_role(default.clone());

        prop_assert_eq!(authorizer.authorize(&claims).is_authorized(), allowed == default);
    }

    /// Sanitising already-clean text is a no-op.
    #[test]
    fn sanitising_clean_text_is_idempotent(value in "[A-Za-z0-9@._-]{0,64}") {
        let once = MarkupSanitizer.sanitize(Tainted::new(value.clone())).unwrap().into_inner();
        let twice = MarkupSanitizer.sanitize(Tainted::new(once.clone())).unwrap().into_inner();

        prop_assert_eq!(&once, &value);
        prop_assert_eq!(twice, once);
    }

    /// Any sanitised value is free of raw markup characters.
    #[test]
    fn sanitised_values_contain_no_markup(value in "\\PC{0,64}") {
        let clean = MarkupSanitizer.sanitize(Tainted::new(value)).unwrap().into_inner();

        prop_assert!(!clean.contains('<'));
        prop_assert!(!clean.contains('>'));
        prop_assert!(!clean.contains('"'));
    }

    /// Required-field errors are reported exactly for empty and placeholder fields.
    #[test]
    fn required_errors_match_empty_fields(
        fields in prop::collection::btree_map("[a-z]{1,8}", arb_field_value(), 0..6),
    ) {
        prop_assume!(!fields.contains_key("email") && !fields.contains_key("password"));
        let expected = fields.values().filter(|v| v.is_empty() || *v == "select").count();
        let raw: RawFormInput = fields.into_iter().collect();

        let outcome = FormSanitiser::new(fast_policy()).unwrap().sanitise(raw, &[]);

        prop_assert_eq!(outcome.errors().len(), expected);
        prop_assert_eq!(outcome.is_clean(), expected == 0);
    }

    /// Generated one-time tokens are always 12 uppercase hex characters.
    #[test]
    fn auth_tokens_are_uppercase_hex(_round in 0u8..32) {
        let token = generate_auth_token();

        prop_assert_eq!(token.len(), 12);
        prop_assert!(token.chars().all(|c| matches!(c, '0'..='9' | 'A'..='F')));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// Matching passwords come back hashed and verifiable as typed, markup
    /// and escape characters included; the confirmation is dropped.
    #[test]
    fn matching_passwords_hash_and_verify(password in arb_password()) {
        let sanitiser = FormSanitiser::new(fast_policy()).unwrap();
        let raw: RawFormInput =
            [("password", password.as_str()), ("confirm_password", password.as_str())]
                .into_iter()
                .collect();

        let ValidationOutcome::Clean(clean) = sanitiser.sanitise(raw, &[]) else {
            return Err(TestCaseError::fail("expected clean outcome"));
        };

        prop_assert!(!clean.contains("confirm_password"));
        let hash = clean.get("password").unwrap();
        prop_assert!(sanitiser.hasher().verify(&password, hash).unwrap());
    }

    /// A second-factor code is accepted once, and only the issued one.
    #[test]
    fn second_factor_accepts_only_issued_code(wrong in "[0-9A-F]{12}") {
        let store = MemoryStore::new();
        store.insert("users", 1, serde_json::json!({}));
        let guard = InputGuard::new(
            &store,
            FormSanitiser::new(fast_policy()).unwrap(),
            GuardSettings::default(),
        );
        let mut session = Session::new();

        let token = guard.generate_and_persist_token(1, &mut session, NOW).unwrap();
        prop_assume!(wrong != token);

        prop_assert!(matches!(
            guard.verify_second_factor(&wrong, &mut session, NOW),
            Err(AuthenticationError::CredentialMismatch)
        ));
        prop_assert_eq!(guard.verify_second_factor(&token, &mut session, NOW).unwrap(), 1);
        prop_assert!(matches!(
            guard.verify_second_factor(&token, &mut session, NOW),
            Err(AuthenticationError::NoPendingChallenge)
        ));
    }
}
