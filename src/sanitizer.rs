use std::convert::Infallible;

use crate::{Tainted, Verified};

/// Converts tainted values into verified values.
///
/// # Invariants
///
/// Implementations MUST:
/// - Clean or validate the input according to their rules
/// - Only call `Verified::new_unchecked` on the cleaned value
/// - Not echo the raw input in their errors
pub trait Sanitizer<T> {
    /// Why a value was rejected.
    type Error;

    /// Sanitizes a tainted value, returning a verified value on success.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the input cannot be made safe.
    fn sanitize(&self, input: Tainted<T>) -> Result<Verified<T>, Self::Error>;
}

/// Cleans a form value for storage and HTML output.
///
/// Each value goes through four steps, in order:
/// 1. Leading and trailing whitespace is trimmed
/// 2. Backslash escapes are removed (`\'` becomes `'`, `\\` becomes `\`)
/// 3. Markup tags and comments are stripped
/// 4. `&`, `"`, `'`, `<` and `>` are encoded as HTML entities
///
/// The sanitizer never rejects input.
///
/// # Examples
///
/// ```
/// use request_guard::{MarkupSanitizer, Sanitizer, Tainted};
///
/// let sanitizer = MarkupSanitizer;
/// let verified = sanitizer
///     .sanitize(Tainted::new("  <b>Tom</b> & \\\"Jerry\\\"  ".to_string()))
///     .unwrap();
///
/// assert_eq!(verified.as_ref(), "Tom &amp; &quot;Jerry&quot;");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupSanitizer;

impl MarkupSanitizer {
    /// Applies the full cleanup to a raw string.
    pub(crate) fn clean(raw: &str) -> String {
        encode_special_chars(&strip_tags(&strip_slashes(raw.trim())))
    }
}

impl Sanitizer<String> for MarkupSanitizer {
    type Error = Infallible;

    fn sanitize(&self, input: Tainted<String>) -> Result<Verified<String>, Infallible> {
        let raw = input.into_inner();
        Ok(Verified::new_unchecked(Self::clean(&raw)))
    }
}

/// Removes one level of backslash escaping. A trailing lone backslash is dropped.
fn strip_slashes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }

    out
}

/// Strips `<...>` tags and `<!-- -->` comments.
///
/// A `<` followed by whitespace or at the end of input is text, not a tag.
/// A `>` inside a quoted attribute does not close the tag. An unterminated
/// tag swallows the rest of the input.
fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '<' {
            out.push(c);
            continue;
        }

        match chars.peek() {
            None => {
                out.push(c);
                continue;
            }
            Some(next) if next.is_whitespace() => {
                out.push(c);
                continue;
            }
            _ => {}
        }

        let mut quote: Option<char> = None;
        let mut body = String::new();
        for t in chars.by_ref() {
            match quote {
                Some(q) if t == q => quote = None,
                Some(_) => {}
                None if t == '"' || t == '\'' => quote = Some(t),
                None if t == '>' => {
                    // Comments run until "-->", not the first '>'
                    if body.starts_with("!--") && !(body.len() >= 5 && body.ends_with("--")) {
                        body.push(t);
                        continue;
                    }
                    break;
                }
                None => {}
            }
            body.push(t);
        }
    }

    out
}

/// Encodes the five HTML special characters.
fn encode_special_chars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());

    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }

    out
}
