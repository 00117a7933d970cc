//! Explicit request context for the guard.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::form::RawFormInput;
use crate::logging::RequestLog;
use crate::session::Session;

use super::{ExtractContext, ExtractFormInput};

/// Everything the guard reads from one inbound request.
///
/// `RequestContext` replaces ambient request state: headers, cookies,
/// submitted form fields, the session tree and the request time are all
/// held here and passed explicitly. Framework-specific code builds one per
/// request, usually through [`ExtractContext`].
///
/// Header names are case-insensitive. Form fields keep submission order.
///
/// # Examples
///
/// ```
/// use request_guard::web::{ExtractFormInput, RequestContext};
///
/// let mut ctx = RequestContext::new("req-12345").with_time(1_700_000_000);
/// ctx.add_header("Authorization", "Bearer abc");
/// ctx.add_cookie_header("theme=dark; auth_token=xyz");
/// ctx.add_form_field("email", "a@example.com");
///
/// assert_eq!(ctx.header("authorization"), Some("Bearer abc"));
/// assert_eq!(ctx.cookie("auth_token"), Some("xyz"));
/// assert_eq!(ctx.now(), 1_700_000_000);
/// assert!(ctx.extract_form_input().contains("email"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request identifier (required)
    request_id: String,
    /// Request headers, keyed by lowercased name
    headers: HashMap<String, String>,
    /// Cookies by name
    cookies: HashMap<String, String>,
    /// Submitted form fields (untrusted)
    form: Vec<(String, String)>,
    /// Session tree loaded by the application
    session: Session,
    /// Request time, Unix seconds
    now: u64,
}

impl RequestContext {
    /// Creates a context with the given request ID, stamped with the
    /// current system time.
    ///
    /// All other fields start empty. Use the `add_*` methods to populate them.
    pub fn new(request_id: impl Into<String>) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        Self {
            request_id: request_id.into(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
            form: Vec::new(),
            session: Session::new(),
            now,
        }
    }

    /// Overrides the request time.
    pub fn with_time(mut self, now: u64) -> Self {
        self.now = now;
        self
    }

    /// Attaches the session loaded by the application.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    /// Adds a header. A repeated name replaces the earlier value.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
    }

    /// Adds a cookie.
    pub fn add_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    /// Adds every cookie from a `Cookie` header value (`a=1; b=2`).
    ///
    /// Pairs without `=` are skipped.
    pub fn add_cookie_header(&mut self, header: &str) {
        for pair in header.split(';') {
            if let Some((name, value)) = pair.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    self.add_cookie(name, value.trim());
                }
            }
        }
    }

    /// Adds a submitted form field.
    pub fn add_form_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.form.push((name.into(), value.into()));
    }

    /// Returns the request ID.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Looks up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Looks up a cookie by name.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Returns the session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the session for updates.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Returns the request time, Unix seconds.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Returns a logger tagged with this request's ID.
    pub fn log(&self) -> RequestLog<'_> {
        RequestLog::new(&self.request_id)
    }
}

impl ExtractFormInput for RequestContext {
    fn extract_form_input(&self) -> RawFormInput {
        self.form.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl ExtractContext for RequestContext {
    fn extract_context(&self) -> RequestContext {
        self.clone()
    }
}
