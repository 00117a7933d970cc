//! Web framework integration surface.
//!
//! This module is the boundary between HTTP frameworks and the guard. It
//! handles:
//! - Mapping HTTP requests to an explicit [`RequestContext`]
//! - Introducing taint at the boundary (form fields → `Tainted<T>`)
//! - Role and session gates that turn a context into an authorization decision
//!
//! # Design Principles
//!
//! 1. **No Framework Dependencies**: This module contains no framework-specific code.
//!    It defines interfaces that framework-specific code can implement.
//!
//! 2. **Taint at Boundary**: Submitted form fields are wrapped in `Tainted<T>`
//!    at extraction time.
//!
//! 3. **Explicit Context**: No global state. Headers, cookies, session and the
//!    request time all flow through `RequestContext`.
//!
//! # Example Flow
//!
//! ```
//! use request_guard::web::{ExtractFormInput, RequestContext, RoleMiddleware};
//! use request_guard::{
//!     FormSanitiser, InputGuard, GuardSettings, MemoryStore, PasswordPolicy,
//!     RecordingReporter, RoleAuthorizer, VerificationKey,
//! };
//!
//! let mut ctx = RequestContext::new("req-1");
//! ctx.add_form_field("name", "<b>Kim</b>");
//!
//! // 1. Authorize
//! let reporter = RecordingReporter::new();
//! let middleware = RoleMiddleware::new(
//!     VerificationKey::hmac(b"secret"),
//!     RoleAuthorizer::new(["admin"]),
//!     &reporter,
//! );
//! if !middleware.check(&ctx).is_authorized() {
//!     // redirect to login
//! }
//!
//! // 2. Sanitise
//! let store = MemoryStore::new();
//! let guard = InputGuard::new(
//!     &store,
//!     FormSanitiser::new(PasswordPolicy::default()).unwrap(),
//!     GuardSettings::default(),
//! );
//! let clean = guard.get_sanitised_input_data(ctx.extract_form_input(), &[]).unwrap();
//! assert_eq!(clean.get("name"), Some("Kim"));
//! ```

mod adapter;
mod extract;
mod middleware;

pub use adapter::RequestContext;
pub use extract::{ExtractContext, ExtractFormInput};
pub use middleware::{ExistencePolicy, RoleMiddleware, SessionGate};
