//! Users service
//!
//! A small hyper server whose routes are guarded by the valmid middleware.
//!
//! ```text
//! GET  /users?page=2&tag=admin&tag=ops      list users
//! POST /users/{id}?access_token=..          update a user, JSON body {"name": ".."}
//! ```
//!
//! Set `VALMID_CONFIG` to a TOML file to change the body limit or the
//! rejection status, `PORT` and `HOST` to change the listen address.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use valmid::{
    handler_fn, Error, FieldType, Handler, Options, Params, Request, Response, ResponseExt,
    Scalar, Schema, SchemaError, ValmidConfig,
};

// =============================================================================
// Inputs
// =============================================================================

/// Body of an update.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct UserBody {
    name: String,
    #[serde(default)]
    email: String,
}

/// `POST /users/{id}`
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct UpdateUser {
    id: i64,
    page: i64,
    token: String,
    body: Option<UserBody>,
}

/// `GET /users`
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct ListUsers {
    page: i64,
    per_page: u64,
    tags: Vec<String>,
    role: String,
}

fn update_user_schema() -> Result<Schema<UpdateUser>, SchemaError> {
    Schema::builder()
        .field("id", FieldType::INTEGER, "path=id", "gt=0")
        .field("page", FieldType::INTEGER, "query=page;default=1", "gte=1")
        .field(
            "token",
            FieldType::STRING,
            "query=access_token;header=X-Token;required",
            "",
        )
        .body("body", "body=json", "required", |body| {
            body.field("name", "required,min=3,max=64")
                .field("email", "omitempty,email")
        })
        .build()
}

fn list_users_schema() -> Result<Schema<ListUsers>, SchemaError> {
    Schema::builder()
        .field("page", FieldType::INTEGER, "query=page;default=1", "gte=1")
        .field(
            "per_page",
            FieldType::UNSIGNED,
            "query=per_page;header=X-Per-Page;default=20",
            "max=100",
        )
        .field("tags", FieldType::List(Scalar::String), "query=tag", "max=5,dive,alphanum")
        .field("role", FieldType::STRING, "query=role", "omitempty,oneof=admin user guest")
        .build()
}

// =============================================================================
// Handlers
// =============================================================================

async fn update_user(request: Request) -> Response {
    let input: UpdateUser = valmid::get(&request);
    let name = input.body.map(|b| b.name).unwrap_or_default();
    info!(id = input.id, page = input.page, name = %name, "updating user");

    json(
        StatusCode::OK,
        &serde_json::json!({ "id": input.id, "name": name, "page": input.page }),
    )
}

async fn list_users(request: Request) -> Response {
    let input: ListUsers = valmid::get(&request);
    info!(page = input.page, per_page = input.per_page, tags = ?input.tags, "listing users");

    json(
        StatusCode::OK,
        &serde_json::json!({
            "page": input.page,
            "per_page": input.per_page,
            "tags": input.tags,
            "role": input.role,
            "users": [],
        }),
    )
}

fn json(status: StatusCode, value: &serde_json::Value) -> Response {
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(value.to_string())))
        .unwrap_or_else(|_| Response::text(StatusCode::INTERNAL_SERVER_ERROR, "response"))
}

/// `{"error": {"code": .., "message": ..}}`
fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
    json(
        status,
        &serde_json::json!({ "error": { "code": code, "message": message } }),
    )
}

/// Replies with the error's own status and a JSON envelope.
fn reject(request: &Request, error: &Error) -> Response {
    warn!(
        method = %request.method(),
        path = %request.uri().path(),
        stage = %error.stage(),
        "rejected request"
    );
    json_error(error.status_code(), error.error_code(), &error.to_string())
}

// =============================================================================
// Routing
// =============================================================================

struct Routes {
    update_user: Box<dyn Handler>,
    list_users: Box<dyn Handler>,
}

impl Routes {
    fn new() -> Result<Self, SchemaError> {
        Ok(Self {
            update_user: Box::new(
                valmid::middleware(update_user_schema()?, Options::new())?
                    .wrap(handler_fn(update_user)),
            ),
            list_users: Box::new(
                valmid::middleware(list_users_schema()?, Options::new())?
                    .wrap(handler_fn(list_users)),
            ),
        })
    }

    async fn dispatch(&self, mut request: Request) -> Response {
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        match (method.as_str(), segments.as_slice()) {
            ("GET", ["users"]) => self.list_users.call(request).await,
            ("POST", ["users", id]) => {
                let params: Params = [("id", *id)].into_iter().collect();
                request.extensions_mut().insert(params);
                self.update_user.call(request).await
            }
            _ => json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "no such route"),
        }
    }
}

async fn handle(
    routes: Arc<Routes>,
    request: http::Request<Incoming>,
    max_body_size: usize,
) -> Result<Response, Infallible> {
    let (parts, body) = request.into_parts();
    // Read one byte past the limit so the middleware sees the oversize.
    let body = match Limited::new(body, max_body_size + 1).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "failed to read request body");
            return Ok(json_error(
                StatusCode::PAYLOAD_TOO_LARGE,
                "BODY_READ_ERROR",
                &e.to_string(),
            ));
        }
    };
    let request = http::Request::from_parts(parts, Full::new(body));
    Ok(routes.dispatch(request).await)
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,valmid=debug")),
        )
        .init();

    if let Ok(path) = env::var("VALMID_CONFIG") {
        let applied = ValmidConfig::load(&path)
            .and_then(|config| valmid::registry::global().apply(&config));
        if let Err(e) = applied {
            error!(error = %e, path = %path, "invalid middleware configuration");
            std::process::exit(1);
        }
    }
    valmid::set_error_handler(reject);

    let routes = match Routes::new() {
        Ok(routes) => Arc::new(routes),
        Err(e) => {
            error!(error = %e, "invalid input schema");
            std::process::exit(1);
        }
    };

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8001);
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let addr: SocketAddr = match format!("{host}:{port}").parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, "invalid listen address");
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, %addr, "failed to bind");
            std::process::exit(1);
        }
    };
    info!("users service listening on {}", addr);

    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                continue;
            }
        };

        let routes = Arc::clone(&routes);
        tokio::spawn(async move {
            let max_body_size = valmid::registry::global().max_body_size();
            let service =
                service_fn(move |request| handle(Arc::clone(&routes), request, max_body_size));
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                warn!(error = %e, %remote_addr, "connection error");
            }
        });
    }
}
