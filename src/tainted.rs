use std::fmt;

/// A value that arrived from the client and has not been sanitised.
///
/// Form fields, header values and cookies are wrapped in `Tainted<T>` when
/// they enter the crate. Code outside this crate cannot read the value back;
/// it has to go through a [`Sanitizer`](crate::Sanitizer) or the form
/// pipeline, which return [`Verified<T>`](crate::Verified).
///
/// # Examples
///
/// ```
/// use request_guard::Tainted;
///
/// let comment = Tainted::new("<script>alert(1)</script>".to_string());
/// assert!(format!("{:?}", comment).starts_with("Tainted"));
/// ```
// Clone is required: the validation stages and the cleanup stage read the same input.
#[derive(Clone, PartialEq, Eq)]
pub struct Tainted<T> {
    // Must stay private. A public field bypasses sanitisation (CWE-20).
    inner: T,
}

impl<T> Tainted<T> {
    /// Marks a value as untrusted.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Borrows the raw value for validation checks inside the crate.
    ///
    /// Validation only inspects the value; anything that is passed on must
    /// come out of a sanitizer.
    pub(crate) fn peek(&self) -> &T {
        &self.inner
    }

    /// Extracts the raw value. Only sanitizer implementations call this.
    pub(crate) fn into_inner(self) -> T {
        self.inner
    }
}

// No Deref, AsRef, Borrow or Into<T>: each would let raw input reach a sink.

impl<T: fmt::Debug> fmt::Debug for Tainted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tainted")
            .field("inner", &self.inner)
            .finish()
    }
}
