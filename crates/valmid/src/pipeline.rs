//! The decode, validate and dispatch pipeline.
//!
//! ```text
//! Request → [Assembling] → [Validating] → [Dispatching] → next handler
//!                │               │
//!                └───────┬───────┘
//!                        ↓
//!                    [Failed] → error handler
//! ```
//!
//! A request that fails to bind or validate never reaches the next handler.
//! The error handler is the middleware's own override if it has one, and
//! otherwise whatever the registry holds at the moment of the failure.

use crate::error::{Error, SchemaError};
use crate::handler::{BoxFuture, Handler};
use crate::input::{Input, Validated};
use crate::registry::{global, ErrorHandler, Registry};
use crate::schema::Schema;
use crate::types::{Request, Response};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};
use valmid_extract::ExtractionContext;

/// Where a request is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Resolving fields and decoding the input.
    Assembling,
    /// Running the validation rules.
    Validating,
    /// Calling the next handler with the validated input attached.
    Dispatching,
    /// Handing the error to the error handler.
    Failed,
}

impl Stage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Assembling => "assembling",
            Self::Validating => "validating",
            Self::Dispatching => "dispatching",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-middleware options.
#[derive(Clone, Default)]
pub struct Options {
    error_handler: Option<ErrorHandler>,
    registry: Option<Arc<Registry>>,
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("error_handler", &self.error_handler.is_some())
            .field("registry", &self.registry)
            .finish()
    }
}

impl Options {
    /// Options that defer everything to the global registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses this error handler instead of the registry's.
    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Request, &Error) -> Response + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Uses this registry instead of the global one.
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }
}

struct Shared<T> {
    schema: Schema<T>,
    error_handler: Option<ErrorHandler>,
    registry: Arc<Registry>,
}

/// Builds the validation middleware for input type `T`.
///
/// Fails if the schema's rules name a rule the registry's current validator
/// does not know, or give a built-in rule a bad parameter.
///
/// # Example
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use valmid::{handler_fn, FieldType, Handler, Options, Request, Response, ResponseExt, Schema};
/// use bytes::Bytes;
/// use http::StatusCode;
/// use http_body_util::Full;
///
/// #[derive(Debug, Default, Clone, Serialize, Deserialize)]
/// struct Search {
///     q: String,
/// }
///
/// let schema = Schema::<Search>::builder()
///     .field("q", FieldType::STRING, "query=q;required", "min=2")
///     .build()?;
///
/// let search = valmid::middleware(schema, Options::new())?.wrap(handler_fn(
///     |request: Request| async move {
///         let search: Search = valmid::get(&request);
///         Response::text(StatusCode::OK, &search.q)
///     },
/// ));
///
/// # tokio_test::block_on(async {
/// let request = http::Request::builder().uri("/?q=rust").body(Full::new(Bytes::new())).unwrap();
/// assert_eq!(search.call(request).await.status(), StatusCode::OK);
///
/// let request = http::Request::builder().uri("/?q=r").body(Full::new(Bytes::new())).unwrap();
/// assert_eq!(search.call(request).await.status(), StatusCode::BAD_REQUEST);
/// # });
/// # Ok::<(), valmid::SchemaError>(())
/// ```
pub fn middleware<T: Input>(
    schema: Schema<T>,
    options: Options,
) -> Result<ValidationLayer<T>, SchemaError> {
    let registry = options.registry.unwrap_or_else(global);
    registry.validator().check(schema.rules())?;
    debug!(
        input = std::any::type_name::<T>(),
        fields = schema.binder().fields().len(),
        "validation middleware ready"
    );
    Ok(ValidationLayer {
        shared: Arc::new(Shared {
            schema,
            error_handler: options.error_handler,
            registry,
        }),
    })
}

/// The validation middleware for input type `T`, ready to wrap handlers.
///
/// Cloning is cheap; every wrapped handler shares the same schema.
pub struct ValidationLayer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ValidationLayer<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for ValidationLayer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationLayer")
            .field("schema", &self.shared.schema)
            .field("error_handler", &self.shared.error_handler.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: Input> ValidationLayer<T> {
    /// Wraps `next`, which only sees requests whose input validated.
    pub fn wrap<H: Handler>(&self, next: H) -> ValidateInput<T, H> {
        ValidateInput {
            shared: Arc::clone(&self.shared),
            next: Arc::new(next),
        }
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &Schema<T> {
        &self.shared.schema
    }
}

/// A handler guarded by the validation middleware.
pub struct ValidateInput<T, H> {
    shared: Arc<Shared<T>>,
    next: Arc<H>,
}

impl<T, H> Clone for ValidateInput<T, H> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            next: Arc::clone(&self.next),
        }
    }
}

impl<T, H> fmt::Debug for ValidateInput<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidateInput")
            .field("input", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

impl<T: Input, H: Handler> Handler for ValidateInput<T, H> {
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        let shared = Arc::clone(&self.shared);
        let next = Arc::clone(&self.next);
        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let body = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(never) => match never {},
            };
            let ctx = ExtractionContext::new(parts, body);

            match shared.process(&ctx) {
                Ok(input) => {
                    trace!(
                        input = std::any::type_name::<T>(),
                        stage = %Stage::Dispatching,
                        "input validated"
                    );
                    let mut request = into_request(ctx);
                    request.extensions_mut().insert(Validated::new(input));
                    next.call(request).await
                }
                Err(error) => {
                    debug!(
                        input = std::any::type_name::<T>(),
                        stage = %error.stage(),
                        error = %error,
                        "request rejected"
                    );
                    let handler = shared
                        .error_handler
                        .clone()
                        .unwrap_or_else(|| shared.registry.error_handler());
                    trace!(stage = %Stage::Failed, "calling error handler");
                    handler(&into_request(ctx), &error)
                }
            }
        })
    }
}

impl<T: Input> Shared<T> {
    fn process(&self, ctx: &ExtractionContext) -> Result<T, Error> {
        let input = self.schema.decode(ctx, self.registry.max_body_size())?;
        self.schema.validate(&self.registry.validator(), &input)?;
        Ok(input)
    }
}

fn into_request(ctx: ExtractionContext) -> Request {
    ctx.into_request().map(Full::<Bytes>::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::types::ResponseExt;
    use http::StatusCode;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use valmid_extract::FieldType;

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Page {
        page: i64,
    }

    fn page_schema(rules: &str) -> Schema<Page> {
        Schema::builder()
            .field("page", FieldType::INTEGER, "query=page;required", rules)
            .build()
            .unwrap()
    }

    fn request(uri: &str) -> Request {
        http::Request::builder()
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn counting(calls: Arc<AtomicUsize>) -> impl Handler {
        handler_fn(move |request: Request| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let page: Page = crate::get(&request);
                Response::text(StatusCode::OK, &page.page.to_string())
            }
        })
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Assembling.to_string(), "assembling");
        assert_eq!(Stage::Failed.name(), "failed");
    }

    #[test]
    fn test_unknown_rule_rejected_at_construction() {
        let options = Options::new().registry(Arc::new(Registry::new()));
        let err = middleware(page_schema("positive"), options).unwrap_err();

        assert!(matches!(err, SchemaError::Rules(_)));
        assert!(err.to_string().contains("positive"));
    }

    #[tokio::test]
    async fn test_valid_request_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let options = Options::new().registry(Arc::new(Registry::new()));
        let handler = middleware(page_schema("gte=1"), options)
            .unwrap()
            .wrap(counting(Arc::clone(&calls)));

        let response = handler.call(request("/?page=3")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_never_reach_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let options = Options::new().registry(Arc::new(Registry::new()));
        let handler = middleware(page_schema("gte=1"), options)
            .unwrap()
            .wrap(counting(Arc::clone(&calls)));

        for uri in ["/", "/?page=x", "/?page=0"] {
            let response = handler.call(request(uri)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_override_wins_over_registry() {
        let registry = Arc::new(Registry::new());
        registry.set_error_handler(|_, _| Response::text(StatusCode::CONFLICT, "registry"));
        let options = Options::new()
            .registry(Arc::clone(&registry))
            .error_handler(|_, error| Response::text(StatusCode::IM_A_TEAPOT, &error.to_string()));

        let handler = middleware(page_schema(""), options)
            .unwrap()
            .wrap(counting(Arc::new(AtomicUsize::new(0))));

        let response = handler.call(request("/")).await;
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn test_error_handler_sees_original_request() {
        let registry = Arc::new(Registry::new());
        registry.set_error_handler(|request, _| {
            Response::text(StatusCode::NOT_ACCEPTABLE, request.uri().path())
        });
        let options = Options::new().registry(registry);

        let handler = middleware(page_schema(""), options)
            .unwrap()
            .wrap(counting(Arc::new(AtomicUsize::new(0))));

        let response = handler.call(request("/pages?size=1")).await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"/pages");
    }
}
