//! Extraction boundary traits for web integration.
//!
//! Framework-specific request types implement these to hand the guard an
//! explicit [`RequestContext`] and the submitted form as [`RawFormInput`].

use crate::form::RawFormInput;

use super::RequestContext;

/// Builds a [`RequestContext`] from a framework-specific request.
///
/// This trait only maps framework types to the guard's context. It does
/// not decode credentials, authorize, or sanitise anything.
///
/// # Examples
///
/// ```
/// use request_guard::web::{ExtractContext, RequestContext};
///
/// struct MyFrameworkRequest {
///     id: String,
///     cookie_header: String,
/// }
///
/// impl ExtractContext for MyFrameworkRequest {
///     fn extract_context(&self) -> RequestContext {
///         let mut ctx = RequestContext::new(self.id.clone());
///         ctx.add_cookie_header(&self.cookie_header);
///         ctx
///     }
/// }
///
/// let req = MyFrameworkRequest { id: "req-9".into(), cookie_header: "auth_token=abc".into() };
/// assert_eq!(req.extract_context().cookie("auth_token"), Some("abc"));
/// ```
pub trait ExtractContext {
    /// Extracts the request context.
    fn extract_context(&self) -> RequestContext;
}

/// Collects submitted form fields as untrusted input.
///
/// Every value crosses the boundary as [`Tainted`](crate::Tainted); the
/// sanitiser is the only way to get clean data back out.
pub trait ExtractFormInput {
    /// Extracts all submitted form fields.
    fn extract_form_input(&self) -> RawFormInput;
}
