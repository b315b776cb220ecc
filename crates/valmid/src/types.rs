//! Request and response types shared by the middleware and its handlers.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;

/// The HTTP request type passed through the middleware.
///
/// The body is buffered before binding and handed on unchanged.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type returned by handlers and error handlers.
pub type Response = http::Response<Full<Bytes>>;

/// Shorthand constructors for [`Response`].
pub trait ResponseExt {
    /// Creates a `text/plain` response with the given status.
    ///
    /// The built-in error handler answers with this, carrying the error text.
    fn text(status: StatusCode, body: &str) -> Response;
}

impl ResponseExt for Response {
    fn text(status: StatusCode, body: &str) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::from(body.to_owned())));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        response
    }
}
