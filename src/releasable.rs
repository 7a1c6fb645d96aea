use crate::Error;
use zeroize::Zeroize;

/// An engine object with an explicit, idempotent release.
///
/// Dropping a [`Releasable`] already wipes the inner value, but callers that
/// hand out long-lived handles (FFI bindings, object registries) need a
/// released state they can observe. Every access after [`Releasable::release`]
/// fails with [`Error::Released`].
pub struct Releasable<T: Zeroize> {
    inner: Option<T>,
}

impl<T: Zeroize> Releasable<T> {
    pub fn new(value: T) -> Self {
        Self { inner: Some(value) }
    }

    /// Wipes and drops the inner value. Calling it again does nothing.
    pub fn release(&mut self) {
        if let Some(mut value) = self.inner.take() {
            value.zeroize();
        }
    }

    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }

    pub fn get(&self) -> Result<&T, Error> {
        self.inner.as_ref().ok_or(Error::Released)
    }

    pub fn get_mut(&mut self) -> Result<&mut T, Error> {
        self.inner.as_mut().ok_or(Error::Released)
    }
}

impl<T: Zeroize> From<T> for Releasable<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}
