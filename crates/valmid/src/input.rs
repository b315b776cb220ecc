//! Handing the validated input to the next handler.
//!
//! The middleware stores the value in the request extensions, keyed by its
//! type, and the handler reads it back with [`get`] or [`try_get`]. Nothing
//! else is shared between the two.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ops::Deref;
use std::sync::Arc;

/// Types the middleware can decode, validate and hand to a handler.
///
/// Implemented for every type with the required bounds; derive
/// `Serialize`, `Deserialize`, `Default` and `Clone` to opt in.
pub trait Input: DeserializeOwned + Serialize + Default + Clone + Send + Sync + 'static {}

impl<T> Input for T where T: DeserializeOwned + Serialize + Default + Clone + Send + Sync + 'static {}

/// A validated input, as stored in the request extensions.
#[derive(Debug)]
pub struct Validated<T>(Arc<T>);

impl<T> Validated<T> {
    pub(crate) fn new(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Returns the shared value.
    #[must_use]
    pub fn shared(&self) -> Arc<T> {
        Arc::clone(&self.0)
    }
}

impl<T> Clone for Validated<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Deref for Validated<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

/// Returns the validated input attached to `request`.
///
/// Returns `T::default()` when the request did not pass through a
/// middleware for `T`. Reading does not consume or change the value, so
/// repeated calls return equal values.
///
/// # Example
///
/// ```rust
/// #[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
/// struct Page {
///     number: i64,
/// }
///
/// let request = http::Request::new(());
/// assert_eq!(valmid::get::<Page>(&request), Page::default());
/// ```
#[must_use]
pub fn get<T: Input>(request: &http::Request<impl Sized>) -> T {
    try_get::<T>(request).cloned().unwrap_or_default()
}

/// Returns a reference to the validated input, if one is attached.
#[must_use]
pub fn try_get<T: Send + Sync + 'static>(request: &http::Request<impl Sized>) -> Option<&T> {
    request
        .extensions()
        .get::<Validated<T>>()
        .map(|validated| &**validated)
}
