/// A value that has passed through a sanitizer and is safe to store or render.
///
/// `Verified<T>` has no public constructor. Only sanitizers and the form
/// pipeline inside this crate create it, after cleaning a
/// [`Tainted<T>`](crate::Tainted). Reading is unrestricted through
/// [`AsRef`] and [`into_inner`](Self::into_inner).
///
/// ```compile_fail
/// use request_guard::Verified;
///
/// let verified = Verified::new("data".to_string());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified<T> {
    inner: T,
}

impl<T> Verified<T> {
    /// Wraps a value that the caller has already cleaned.
    ///
    /// No validation happens here; crate code must only call this on the
    /// output of a sanitisation step.
    pub(crate) fn new_unchecked(value: T) -> Self {
        Self { inner: value }
    }

    /// Consumes the wrapper and returns the value.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> AsRef<T> for Verified<T> {
    fn as_ref(&self) -> &T {
        &self.inner
    }
}
