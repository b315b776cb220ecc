//! Shared middleware settings.
//!
//! A [`Registry`] holds the defaults every middleware falls back to: the
//! error handler, the validator and the body size limit. Each can be
//! replaced at any time; middleware reads the current value when a request
//! needs it, so replacements apply to middleware built earlier too.
//!
//! The process-wide registry is returned by [`global`] and changed with
//! [`set_error_handler`] and [`set_validator`]. Tests and embedders that
//! need isolation can build their own and pass it through
//! [`Options::registry`](crate::Options::registry).

use crate::config::{ConfigError, ValmidConfig};
use crate::error::Error;
use crate::types::{Request, Response, ResponseExt};
use http::StatusCode;
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;
use valmid_extract::DEFAULT_MAX_BODY_SIZE;
use valmid_validate::Validator;

/// Turns a rejected request into a response.
pub type ErrorHandler = Arc<dyn Fn(&Request, &Error) -> Response + Send + Sync>;

/// Replaceable middleware defaults.
pub struct Registry {
    error_handler: RwLock<Option<ErrorHandler>>,
    validator: RwLock<Arc<Validator>>,
    max_body_size: RwLock<usize>,
    rejection_status: RwLock<StatusCode>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("custom_error_handler", &self.error_handler.read().is_some())
            .field("validator", &*self.validator.read())
            .field("max_body_size", &*self.max_body_size.read())
            .field("rejection_status", &*self.rejection_status.read())
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            error_handler: RwLock::new(None),
            validator: RwLock::new(Arc::new(Validator::new())),
            max_body_size: RwLock::new(DEFAULT_MAX_BODY_SIZE),
            rejection_status: RwLock::new(StatusCode::BAD_REQUEST),
        }
    }
}

impl Registry {
    /// Creates a registry with the built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry from a configuration.
    pub fn from_config(config: &ValmidConfig) -> Result<Self, ConfigError> {
        let registry = Self::new();
        registry.apply(config)?;
        Ok(registry)
    }

    /// Applies a configuration. The error handler and validator are kept.
    pub fn apply(&self, config: &ValmidConfig) -> Result<(), ConfigError> {
        config.validate()?;
        *self.max_body_size.write() = config.max_body_size;
        *self.rejection_status.write() = config.rejection_status();
        debug!(
            max_body_size = config.max_body_size,
            rejection_status = config.rejection_status,
            "applied middleware configuration"
        );
        Ok(())
    }

    /// Replaces the error handler.
    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(&Request, &Error) -> Response + Send + Sync + 'static,
    {
        *self.error_handler.write() = Some(Arc::new(handler));
    }

    /// Restores the built-in error handler.
    pub fn reset_error_handler(&self) {
        *self.error_handler.write() = None;
    }

    /// Returns the current error handler.
    ///
    /// Without a replacement, this replies with the configured rejection
    /// status and the error text as plain text.
    #[must_use]
    pub fn error_handler(&self) -> ErrorHandler {
        if let Some(handler) = self.error_handler.read().as_ref() {
            return Arc::clone(handler);
        }
        default_error_handler(self.rejection_status())
    }

    /// Replaces the validator.
    pub fn set_validator(&self, validator: Validator) {
        *self.validator.write() = Arc::new(validator);
    }

    /// Returns the current validator.
    #[must_use]
    pub fn validator(&self) -> Arc<Validator> {
        Arc::clone(&*self.validator.read())
    }

    /// Sets the body size limit, in bytes.
    pub fn set_max_body_size(&self, max_body_size: usize) {
        *self.max_body_size.write() = max_body_size;
    }

    /// Returns the body size limit, in bytes.
    #[must_use]
    pub fn max_body_size(&self) -> usize {
        *self.max_body_size.read()
    }

    /// Returns the status used by the built-in error handler.
    #[must_use]
    pub fn rejection_status(&self) -> StatusCode {
        *self.rejection_status.read()
    }
}

/// The built-in error handler for a given status.
#[must_use]
pub fn default_error_handler(status: StatusCode) -> ErrorHandler {
    Arc::new(move |_request: &Request, error: &Error| Response::text(status, &error.to_string()))
}

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

/// Returns the process-wide registry.
#[must_use]
pub fn global() -> Arc<Registry> {
    Arc::clone(GLOBAL.get_or_init(|| Arc::new(Registry::new())))
}

/// Replaces the process-wide error handler.
///
/// Middleware without its own handler uses the new one from its next
/// failing request on.
pub fn set_error_handler<F>(handler: F)
where
    F: Fn(&Request, &Error) -> Response + Send + Sync + 'static,
{
    global().set_error_handler(handler);
}

/// Replaces the process-wide validator.
pub fn set_validator(validator: Validator) {
    global().set_validator(validator);
}
