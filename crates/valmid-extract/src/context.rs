//! Extraction context providing access to request data.
//!
//! The [`ExtractionContext`] owns the request head and the buffered body for
//! the duration of binding. Query and form pairs are decoded once, up front,
//! so every field lookup is a scan over already-parsed data.

use crate::Params;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Context providing access to all parts of an HTTP request.
///
/// Built from a request whose body is already buffered. After binding, the
/// request can be reassembled with [`ExtractionContext::into_request`]; the
/// body bytes are handed back untouched.
///
/// # Example
///
/// ```rust
/// use valmid_extract::{ExtractionContext, Params};
/// use bytes::Bytes;
///
/// let mut params = Params::new();
/// params.push("id", "123");
///
/// let mut request = http::Request::builder()
///     .uri("/users/123?tag=a&tag=b")
///     .body(Bytes::new())
///     .unwrap();
/// request.extensions_mut().insert(params);
///
/// let ctx = ExtractionContext::from_request(request);
/// assert_eq!(ctx.path_param("id"), Some("123"));
/// assert_eq!(ctx.query_values("tag").collect::<Vec<_>>(), vec!["a", "b"]);
/// ```
#[derive(Debug)]
pub struct ExtractionContext {
    parts: Parts,
    body: Bytes,
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
}

impl ExtractionContext {
    /// Creates a context from the request head and its buffered body.
    #[must_use]
    pub fn new(parts: Parts, body: Bytes) -> Self {
        let query = parts
            .uri
            .query()
            .map(decode_pairs_str)
            .unwrap_or_default();

        let is_form = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE));
        let form = if is_form {
            decode_pairs(&body)
        } else {
            Vec::new()
        };

        Self {
            parts,
            body,
            query,
            form,
        }
    }

    /// Creates a context from a request with a buffered body.
    #[must_use]
    pub fn from_request(request: Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(parts, body)
    }

    /// Reassembles the request, returning the buffered body as-is.
    #[must_use]
    pub fn into_request(self) -> Request<Bytes> {
        Request::from_parts(self.parts, self.body)
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Returns the buffered body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns a path parameter placed in the extensions by the router.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.parts
            .extensions
            .get::<Params>()
            .and_then(|params| params.get(name))
    }

    /// Returns every query value for `key`, in request order.
    pub fn query_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        values_of(&self.query, key)
    }

    /// Returns every form value for `key`: body fields first, then query
    /// fields, each in request order.
    ///
    /// The body only contributes when the Content-Type is
    /// `application/x-www-form-urlencoded`.
    pub fn form_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        values_of(&self.form, key).chain(values_of(&self.query, key))
    }

    /// Returns every UTF-8 value of header `name`, in request order.
    pub fn header_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.parts
            .headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
    }
}

fn values_of<'a>(
    pairs: &'a [(String, String)],
    key: &'a str,
) -> impl Iterator<Item = &'a str> + 'a {
    pairs
        .iter()
        .filter(move |(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

// URL-encoded decoding is lossy on invalid UTF-8 and never fails for string pairs.
fn decode_pairs_str(input: &str) -> Vec<(String, String)> {
    serde_urlencoded::from_str(input).unwrap_or_default()
}

fn decode_pairs(input: &[u8]) -> Vec<(String, String)> {
    serde_urlencoded::from_bytes(input).unwrap_or_default()
}
