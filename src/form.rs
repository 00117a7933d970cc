//! Form input validation and cleanup.
//!
//! [`FormSanitiser::sanitise`] runs every validation stage over the raw
//! input and collects all messages before deciding the outcome; no stage
//! short-circuits another.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PasswordError;
use crate::password::{PasswordHashing, PasswordPolicy};
use crate::sanitizer::MarkupSanitizer;
use crate::{Tainted, Verified};

/// Field holding a new or candidate password.
pub const PASSWORD_FIELD: &str = "password";
/// Field holding the password confirmation.
pub const CONFIRM_FIELD: &str = "confirm_password";
/// Field validated as an email address.
pub const EMAIL_FIELD: &str = "email";
/// Placeholder value of an unselected `<select>` element.
pub const PLACEHOLDER: &str = "select";

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+",
        r"@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?",
        r"(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    ))
    .expect("static pattern")
});

/// Raw submitted form fields, in submission order.
///
/// Every value is [`Tainted`]. Inserting an existing name replaces its value
/// but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFormInput {
    fields: Vec<(String, Tainted<String>)>,
}

impl RawFormInput {
    /// Creates an empty input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a field.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = Tainted::new(value.into());
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Returns `true` if the field was submitted.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no field was submitted.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn raw(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.peek().as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawFormInput {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut input = RawFormInput::new();
        for (k, v) in iter {
            input.insert(k, v);
        }
        input
    }
}

/// Sanitised form fields, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanData {
    fields: Vec<(String, Verified<String>)>,
}

impl CleanData {
    /// Returns a field's sanitised value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_ref().as_str())
    }

    /// Returns `true` if the field is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_ref().as_str()))
    }

    /// Converts into a JSON object for persisting.
    pub fn into_record(self) -> crate::store::Record {
        self.fields
            .into_iter()
            .map(|(n, v)| (n, serde_json::Value::String(v.into_inner())))
            .collect()
    }

    fn set(&mut self, name: &str, value: Verified<String>) {
        if let Some((_, existing)) = self.fields.iter_mut().find(|(n, _)| n == name) {
            *existing = value;
        }
    }

    fn remove(&mut self, name: &str) {
        self.fields.retain(|(n, _)| n != name);
    }
}

/// Character-count bounds for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthRule {
    /// Field name
    pub field: String,
    /// Minimum number of characters
    pub min: usize,
    /// Maximum number of characters
    pub max: usize,
}

impl LengthRule {
    /// Creates a rule for `field`.
    pub fn new(field: impl Into<String>, min: usize, max: usize) -> Self {
        Self {
            field: field.into(),
            min,
            max,
        }
    }
}

/// Result of running the sanitiser over one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// All checks passed
    Clean(CleanData),
    /// At least one check failed; messages are in stage order
    Invalid(Vec<String>),
}

impl ValidationOutcome {
    /// Returns `true` for [`ValidationOutcome::Clean`].
    pub fn is_clean(&self) -> bool {
        matches!(self, ValidationOutcome::Clean(_))
    }

    /// Returns the error messages, empty when clean.
    pub fn errors(&self) -> &[String] {
        match self {
            ValidationOutcome::Clean(_) => &[],
            ValidationOutcome::Invalid(messages) => messages,
        }
    }
}

/// Name of a field as shown in messages: uppercased, with everything
/// outside `[0-9A-Za-z@.]` removed.
pub fn display_name(field: &str) -> String {
    field
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '@' || *c == '.')
        .collect()
}

/// Returns `true` if `value` looks like an email address.
pub fn is_valid_email(value: &str) -> bool {
    value.len() <= 254 && EMAIL.is_match(value)
}

/// Validates and cleans form submissions.
///
/// # Examples
///
/// ```
/// use request_guard::{FormSanitiser, PasswordPolicy, RawFormInput, ValidationOutcome};
///
/// let sanitiser = FormSanitiser::new(PasswordPolicy::default()).unwrap();
/// let raw: RawFormInput = [("name", ""), ("role", "select"), ("age", "30")]
///     .into_iter()
///     .collect();
///
/// let outcome = sanitiser.sanitise(raw, &[]);
/// assert_eq!(outcome.errors(), ["NAME is required", "ROLE is required"]);
/// ```
#[derive(Debug, Clone)]
pub struct FormSanitiser {
    policy: PasswordPolicy,
    hasher: PasswordHashing,
}

impl FormSanitiser {
    /// Creates a sanitiser enforcing the given password policy.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::InvalidParams` if the hash cost is out of range.
    pub fn new(policy: PasswordPolicy) -> Result<Self, PasswordError> {
        let hasher = policy.hasher()?;
        Ok(Self { policy, hasher })
    }

    /// Returns the hasher used for new passwords.
    pub fn hasher(&self) -> &PasswordHashing {
        &self.hasher
    }

    /// Returns the password policy.
    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    /// Validates and cleans one submission.
    ///
    /// Stages, each adding messages independently:
    /// 1. Empty or placeholder fields are required
    /// 2. `email` must be a valid address
    /// 3. `password` must equal `confirm_password` and meet the minimum length
    /// 4. Each length rule is checked against the raw value
    ///
    /// Every field is then cleaned with [`MarkupSanitizer`]. On success, when
    /// both password fields were submitted, `password` is replaced by the
    /// hash of its raw value and `confirm_password` is dropped.
    pub fn sanitise(&self, raw: RawFormInput, rules: &[LengthRule]) -> ValidationOutcome {
        let mut errors = Vec::new();
        errors.extend(check_required(&raw));
        errors.extend(check_email(&raw));
        errors.extend(self.check_password(&raw));
        errors.extend(check_lengths(&raw, rules));

        // The hash covers the password as typed, not its markup-cleaned form.
        let plaintext = match (raw.raw(PASSWORD_FIELD), raw.raw(CONFIRM_FIELD)) {
            (Some(password), Some(_)) => Some(password.to_string()),
            _ => None,
        };
        let mut clean = clean_fields(raw);

        if !errors.is_empty() {
            tracing::debug!(errors = errors.len(), "form submission rejected");
            return ValidationOutcome::Invalid(errors);
        }

        if let Some(password) = plaintext {
            match self.hasher.hash(&password) {
                Ok(hash) => {
                    clean.set(PASSWORD_FIELD, Verified::new_unchecked(hash));
                    clean.remove(CONFIRM_FIELD);
                }
                Err(e) => {
                    tracing::error!(error = %e, "password hashing failed");
                    return ValidationOutcome::Invalid(vec![
                        "Password could not be processed, please try again".to_string()
                    ]);
                }
            }
        }

        ValidationOutcome::Clean(clean)
    }

    fn check_password(&self, raw: &RawFormInput) -> Vec<String> {
        let (Some(password), Some(confirm)) = (raw.raw(PASSWORD_FIELD), raw.raw(CONFIRM_FIELD))
        else {
            return Vec::new();
        };

        let mut errors = Vec::new();
        if password != confirm {
            errors.push("Password and Confirm Password do not match".to_string());
        }
        if password.chars().count() < self.policy.min_length {
            errors.push(format!(
                "Password must be at least {} characters",
                self.policy.min_length
            ));
        }
        errors
    }
}

fn check_required(raw: &RawFormInput) -> Vec<String> {
    raw.fields
        .iter()
        .filter(|(_, v)| {
            let value = v.peek();
            value.trim().is_empty() || value == PLACEHOLDER
        })
        .map(|(name, _)| format!("{} is required", display_name(name)))
        .collect()
}

fn check_email(raw: &RawFormInput) -> Option<String> {
    let email = raw.raw(EMAIL_FIELD)?;
    (!is_valid_email(email.trim())).then(|| "Invalid Email Format".to_string())
}

fn check_lengths(raw: &RawFormInput, rules: &[LengthRule]) -> Vec<String> {
    let mut errors = Vec::new();
    for rule in rules {
        let len = raw.raw(&rule.field).map_or(0, |v| v.chars().count());
        let name = display_name(&rule.field);
        if len < rule.min {
            errors.push(format!(
                "{} is below the minimum length of {} characters",
                name, rule.min
            ));
        } else if len > rule.max {
            errors.push(format!(
                "{} is above the maximum length of {} characters",
                name, rule.max
            ));
        }
    }
    errors
}

fn clean_fields(raw: RawFormInput) -> CleanData {
    CleanData {
        fields: raw
            .fields
            .into_iter()
            .map(|(name, value)| {
                let cleaned = MarkupSanitizer::clean(&value.into_inner());
                (name, Verified::new_unchecked(cleaned))
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::cheap_policy;

    fn sanitiser() -> FormSanitiser {
        FormSanitiser::new(cheap_policy()).unwrap()
    }

    fn input(pairs: &[(&str, &str)]) -> RawFormInput {
        pairs.iter().copied().collect()
    }

    #[test]
    fn display_name_uppercases_and_strips() {
        assert_eq!(display_name("first_name"), "FIRSTNAME");
        assert_eq!(display_name("e-mail.addr@"), "EMAIL.ADDR@");
        assert_eq!(display_name("phone #2"), "PHONE2");
    }

    #[test]
    fn empty_and_placeholder_fields_are_required() {
        let outcome = sanitiser().sanitise(
            input(&[("name", ""), ("role", "select"), ("age", "30")]),
            &[],
        );

        assert_eq!(
            outcome,
            ValidationOutcome::Invalid(vec![
                "NAME is required".to_string(),
                "ROLE is required".to_string()
            ])
        );
    }

    #[test]
    fn whitespace_only_counts_as_empty() {
        let outcome = sanitiser().sanitise(input(&[("city", "   ")]), &[]);
        assert_eq!(outcome.errors(), ["CITY is required"]);
    }

    #[test]
    fn padded_placeholder_is_a_value() {
        let outcome = sanitiser().sanitise(input(&[("nickname", " select ")]), &[]);

        let ValidationOutcome::Clean(clean) = outcome else {
            panic!("expected clean outcome");
        };
        assert_eq!(clean.get("nickname"), Some("select"));
    }

    #[test]
    fn invalid_email_is_reported() {
        let outcome = sanitiser().sanitise(input(&[("email", "not-an-email")]), &[]);
        assert_eq!(outcome.errors(), ["Invalid Email Format"]);
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("jane.doe+news@example.co.uk"));
        assert!(!is_valid_email("jane@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("jane@localhost"));
        assert!(!is_valid_email("jane doe@example.com"));
        assert!(!is_valid_email("<b>@example.com"));
    }

    #[test]
    fn password_mismatch_is_reported() {
        let outcome = sanitiser().sanitise(
            input(&[("password", "secret1"), ("confirm_password", "secret2")]),
            &[],
        );

        assert!(!outcome.is_clean());
        assert!(outcome
            .errors()
            .iter()
            .any(|e| e.contains("do not match")));
    }

    #[test]
    fn short_password_is_reported() {
        let outcome = sanitiser().sanitise(
            input(&[("password", "abc"), ("confirm_password", "abc")]),
            &[],
        );

        assert_eq!(outcome.errors(), ["Password must be at least 6 characters"]);
    }

    #[test]
    fn matching_passwords_are_hashed() {
        let sanitiser = sanitiser();
        let outcome = sanitiser.sanitise(
            input(&[
                ("email", "jane@example.com"),
                ("password", "hunter22"),
                ("confirm_password", "hunter22"),
            ]),
            &[],
        );

        let ValidationOutcome::Clean(clean) = outcome else {
            panic!("expected clean outcome");
        };
        let hash = clean.get("password").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(sanitiser.hasher().verify("hunter22", hash).unwrap());
        assert!(!clean.contains("confirm_password"));
        assert_eq!(clean.get("email"), Some("jane@example.com"));
    }

    #[test]
    fn password_is_hashed_as_typed() {
        let sanitiser = sanitiser();
        for typed in ["p&ss'w<rd>1", " pass\\word "] {
            let outcome =
                sanitiser.sanitise(input(&[("password", typed), ("confirm_password", typed)]), &[]);

            let ValidationOutcome::Clean(clean) = outcome else {
                panic!("expected clean outcome for {typed:?}");
            };
            let hash = clean.get("password").unwrap();
            assert!(sanitiser.hasher().verify(typed, hash).unwrap(), "{typed:?}");
            let cleaned = MarkupSanitizer::clean(typed);
            assert!(!sanitiser.hasher().verify(&cleaned, hash).unwrap(), "{typed:?}");
        }
    }

    #[test]
    fn lone_password_field_is_not_hashed() {
        let outcome = sanitiser().sanitise(input(&[("password", "pw")]), &[]);

        let ValidationOutcome::Clean(clean) = outcome else {
            panic!("expected clean outcome");
        };
        assert_eq!(clean.get("password"), Some("pw"));
    }

    #[test]
    fn length_rules_report_both_bounds() {
        let rules = [LengthRule::new("bio", 10, 100)];

        let short = sanitiser().sanitise(input(&[("bio", "short")]), &rules);
        assert_eq!(short.errors(), ["BIO is below the minimum length of 10 characters"]);

        let long = "x".repeat(200);
        let long = sanitiser().sanitise(input(&[("bio", long.as_str())]), &rules);
        assert_eq!(long.errors(), ["BIO is above the maximum length of 100 characters"]);

        let fine = sanitiser().sanitise(input(&[("bio", "just about right")]), &rules);
        assert!(fine.is_clean());
    }

    #[test]
    fn length_rule_for_absent_field_counts_as_empty() {
        let outcome =
            sanitiser().sanitise(input(&[("name", "Ann")]), &[LengthRule::new("bio", 1, 10)]);
        assert_eq!(outcome.errors(), ["BIO is below the minimum length of 1 characters"]);
    }

    #[test]
    fn all_stages_report_together() {
        let outcome = sanitiser().sanitise(
            input(&[
                ("name", ""),
                ("email", "bad"),
                ("password", "abcdef"),
                ("confirm_password", "abcdeg"),
                ("bio", "hi"),
            ]),
            &[LengthRule::new("bio", 5, 50)],
        );

        assert_eq!(
            outcome.errors(),
            [
                "NAME is required",
                "Invalid Email Format",
                "Password and Confirm Password do not match",
                "BIO is below the minimum length of 5 characters",
            ]
        );
    }

    #[test]
    fn values_are_cleaned() {
        let outcome = sanitiser().sanitise(
            input(&[("comment", "  <script>x</script> Tom & \\'Jerry\\' "), ("age", "30")]),
            &[],
        );

        let ValidationOutcome::Clean(clean) = outcome else {
            panic!("expected clean outcome");
        };
        assert_eq!(clean.get("comment"), Some("x Tom &amp; &#039;Jerry&#039;"));
        assert_eq!(clean.iter().map(|(n, _)| n).collect::<Vec<_>>(), ["comment", "age"]);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut raw = RawFormInput::new();
        raw.insert("a", "1");
        raw.insert("b", "2");
        raw.insert("a", "3");

        assert_eq!(raw.len(), 2);
        assert_eq!(raw.raw("a"), Some("3"));
    }

    #[test]
    fn clean_data_converts_to_record() {
        let outcome = sanitiser().sanitise(input(&[("name", "Ann")]), &[]);
        let ValidationOutcome::Clean(clean) = outcome else {
            panic!("expected clean outcome");
        };

        let record = clean.into_record();
        assert_eq!(record["name"], "Ann");
    }
}
