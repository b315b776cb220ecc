//! Field source resolution.

use crate::source::{SourceDecl, SourceKind};
use crate::ExtractionContext;
use tracing::trace;

/// Raw values resolved for one field, with the source they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<'a> {
    /// Kind of the source that produced the values.
    pub kind: SourceKind,
    /// Raw values, in request order. Never empty.
    pub values: Vec<&'a str>,
}

/// Resolves a field's raw values from the first source that has any.
///
/// Sources are tried in declared order. A source counts as present as soon
/// as it yields one value, even an empty string; later sources are then not
/// consulted. Returns `None` when no source is present. The body source is
/// bound separately and never resolves here.
///
/// # Example
///
/// ```rust
/// use valmid_extract::{resolve, ExtractionContext, SourceDecl, SourceKind};
/// use bytes::Bytes;
///
/// let request = http::Request::builder()
///     .uri("/?token=")
///     .header("X-Token", "secret")
///     .body(Bytes::new())
///     .unwrap();
/// let ctx = ExtractionContext::from_request(request);
///
/// let decl: SourceDecl = "query=token;header=X-Token".parse().unwrap();
/// let resolved = resolve(&decl, &ctx).unwrap();
/// assert_eq!(resolved.kind, SourceKind::Query);
/// assert_eq!(resolved.values, vec![""]);
/// ```
#[must_use]
pub fn resolve<'a>(decl: &'a SourceDecl, ctx: &'a ExtractionContext) -> Option<Resolved<'a>> {
    for (kind, key) in decl.sources() {
        let values: Vec<&str> = match kind {
            SourceKind::Path => ctx.path_param(key).into_iter().collect(),
            SourceKind::Query => ctx.query_values(key).collect(),
            SourceKind::Header => ctx.header_values(key).collect(),
            SourceKind::Form => ctx.form_values(key).collect(),
            SourceKind::Body => continue,
        };
        if !values.is_empty() {
            trace!(source = %kind, key = %key, count = values.len(), "resolved field source");
            return Some(Resolved { kind: *kind, values });
        }
    }
    None
}
