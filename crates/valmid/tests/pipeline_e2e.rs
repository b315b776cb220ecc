//! End-to-end tests of the decode, validate and dispatch pipeline.
//!
//! Every test injects its own registry so they can run in parallel.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use parking_lot::Mutex;
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use valmid::{
    handler_fn, Error, FieldType, Handler, Options, Params, Registry, Request, Response,
    ResponseExt, Scalar, Schema, SourceKind,
};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Body {
    name: String,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct UpdateUser {
    id: i64,
    page: i64,
    token: String,
    tags: Vec<String>,
    body: Option<Body>,
}

fn schema() -> Schema<UpdateUser> {
    Schema::builder()
        .field("id", FieldType::INTEGER, "path=id", "gt=0")
        .field("page", FieldType::INTEGER, "query=page;default=1", "")
        .field(
            "token",
            FieldType::STRING,
            "query=access_token;header=X-Token;required",
            "",
        )
        .field("tags", FieldType::List(Scalar::String), "query=tag", "dive,required")
        .body("body", "body=json", "required", |body| {
            body.field("name", "required,min=3")
        })
        .build()
        .unwrap()
}

/// Records what the next handler and the error handler saw.
#[derive(Default)]
struct Recorder {
    handled: Mutex<Vec<UpdateUser>>,
    errors: Mutex<Vec<String>>,
    error_calls: AtomicUsize,
}

fn pipeline(registry: Arc<Registry>, recorder: &Arc<Recorder>) -> impl Handler {
    let seen = Arc::clone(recorder);
    registry.set_error_handler(move |_request: &Request, error: &Error| {
        seen.error_calls.fetch_add(1, Ordering::SeqCst);
        seen.errors.lock().push(error.to_string());
        Response::text(StatusCode::BAD_REQUEST, &error.to_string())
    });

    let handled = Arc::clone(recorder);
    valmid::middleware(schema(), Options::new().registry(registry))
        .unwrap()
        .wrap(handler_fn(move |request: Request| {
            let handled = Arc::clone(&handled);
            async move {
                let input: UpdateUser = valmid::get(&request);
                handled.handled.lock().push(input);
                Response::text(StatusCode::OK, "ok")
            }
        }))
}

fn request(method: &str, uri: &str, headers: &[(&str, &str)], body: &str) -> Request {
    let mut builder = http::Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let mut request = builder
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap();

    // Stand-in for the router: `/users/{id}`.
    if let Some(id) = request.uri().path().strip_prefix("/users/") {
        let params: Params = [("id", id.to_string())].into_iter().collect();
        request.extensions_mut().insert(params);
    }
    request
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_update_user_reaches_handler() {
    let recorder = Arc::new(Recorder::default());
    let handler = pipeline(Arc::new(Registry::new()), &recorder);

    let response = handler
        .call(request(
            "POST",
            "/users/42?page=2",
            &[("X-Token", "secret"), ("Content-Type", "application/json")],
            r#"{"name":"John"}"#,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        recorder.handled.lock().as_slice(),
        &[UpdateUser {
            id: 42,
            page: 2,
            token: "secret".to_string(),
            tags: vec![],
            body: Some(Body {
                name: "John".to_string()
            }),
        }]
    );
    assert_eq!(recorder.error_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_short_name_is_rejected_by_default_handler() {
    let recorder = Arc::new(Recorder::default());
    let registry = Arc::new(Registry::new());
    let handler = pipeline(Arc::clone(&registry), &recorder);
    registry.reset_error_handler();

    let response = handler
        .call(request(
            "POST",
            "/users/42?page=2",
            &[("X-Token", "secret")],
            r#"{"name":"Jo"}"#,
        ))
        .await;

    assert!(response.status().is_client_error());
    assert!(body_text(response).await.contains("'body.name' failed on the 'min=3' rule"));
    assert!(recorder.handled.lock().is_empty());
}

#[tokio::test]
async fn test_validation_reports_every_violation() {
    let recorder = Arc::new(Recorder::default());
    let handler = pipeline(Arc::new(Registry::new()), &recorder);

    let response = handler
        .call(request(
            "POST",
            "/users/0?tag=a&tag=",
            &[("X-Token", "secret")],
            r#"{"name":""}"#,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(recorder.handled.lock().is_empty());
    assert_eq!(recorder.error_calls.load(Ordering::SeqCst), 1);

    let errors = recorder.errors.lock();
    assert!(errors[0].contains("'id' failed on the 'gt=0' rule"));
    assert!(errors[0].contains("'tags[1]' failed on the 'required' rule"));
    assert!(errors[0].contains("'body.name' failed on the 'required' rule"));
}

#[tokio::test]
async fn test_missing_required_field_calls_error_handler_once() {
    let recorder = Arc::new(Recorder::default());
    let registry = Arc::new(Registry::new());
    let handler = pipeline(Arc::clone(&registry), &recorder);

    let kinds = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&kinds);
    registry.set_error_handler(move |_request: &Request, error: &Error| {
        let binding = error.as_binding().expect("binding error");
        seen.lock().push((
            binding.field().map(str::to_string),
            binding.is_missing(),
            binding.source_kind(),
        ));
        Response::text(StatusCode::BAD_REQUEST, "missing")
    });

    let response = handler
        .call(request("POST", "/users/42", &[], r#"{"name":"John"}"#))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(recorder.handled.lock().is_empty());
    assert_eq!(
        kinds.lock().as_slice(),
        &[(Some("token".to_string()), true, Some(SourceKind::Query))]
    );
}

#[tokio::test]
async fn test_malformed_body_is_a_binding_error() {
    let recorder = Arc::new(Recorder::default());
    let handler = pipeline(Arc::new(Registry::new()), &recorder);

    let response = handler
        .call(request("POST", "/users/42", &[("X-Token", "secret")], "not json"))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(recorder.handled.lock().is_empty());
    assert!(recorder.errors.lock()[0].contains("body"));
}

#[tokio::test]
async fn test_wrongly_typed_body_field_is_named() {
    let recorder = Arc::new(Recorder::default());
    let registry = Arc::new(Registry::new());
    let handler = pipeline(Arc::clone(&registry), &recorder);

    let fields = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&fields);
    registry.set_error_handler(move |_request: &Request, error: &Error| {
        let binding = error.as_binding().expect("binding error");
        seen.lock().push((binding.error_code(), binding.field().map(str::to_string)));
        Response::text(error.status_code(), &error.to_string())
    });

    let response = handler
        .call(request("POST", "/users/42", &[("X-Token", "secret")], r#"{"name":5}"#))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(recorder.handled.lock().is_empty());
    assert_eq!(
        fields.lock().as_slice(),
        &[("DECODE_FAILED", Some("body.name".to_string()))]
    );
}

#[test]
fn test_schema_disagreeing_with_input_fails_before_serving() {
    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct TwoFields {
        id: i64,
        name: String,
    }

    let undeclared = Schema::<TwoFields>::builder()
        .field("id", FieldType::INTEGER, "query=id", "")
        .build();
    assert!(matches!(undeclared, Err(valmid::SchemaError::InputMismatch { .. })));

    let mistyped = Schema::<TwoFields>::builder()
        .field("id", FieldType::STRING, "query=id", "")
        .field("name", FieldType::STRING, "query=name", "")
        .build();
    assert!(matches!(mistyped, Err(valmid::SchemaError::InputMismatch { .. })));

    let matching = Schema::<TwoFields>::builder()
        .field("id", FieldType::INTEGER, "query=id", "")
        .field("name", FieldType::STRING, "query=name", "")
        .build()
        .unwrap();
    assert!(valmid::middleware(matching, Options::new().registry(Arc::new(Registry::new()))).is_ok());
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let recorder = Arc::new(Recorder::default());
    let registry = Arc::new(Registry::new());
    registry.set_max_body_size(8);
    let handler = pipeline(Arc::clone(&registry), &recorder);

    let statuses = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&statuses);
    registry.set_error_handler(move |_request: &Request, error: &Error| {
        seen.lock().push(error.status_code());
        Response::text(error.status_code(), &error.to_string())
    });

    let response = handler
        .call(request(
            "POST",
            "/users/42",
            &[("X-Token", "secret")],
            r#"{"name":"Johnathan"}"#,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(statuses.lock().as_slice(), &[StatusCode::PAYLOAD_TOO_LARGE]);
}

#[tokio::test]
async fn test_token_falls_back_to_header_only_when_query_absent() {
    let recorder = Arc::new(Recorder::default());
    let handler = pipeline(Arc::new(Registry::new()), &recorder);
    let body = r#"{"name":"John"}"#;

    handler
        .call(request("POST", "/users/1?access_token=abc", &[("X-Token", "secret")], body))
        .await;
    handler
        .call(request("POST", "/users/1", &[("X-Token", "secret")], body))
        .await;
    handler
        .call(request("POST", "/users/1?access_token=", &[("X-Token", "secret")], body))
        .await;

    let tokens: Vec<String> = recorder.handled.lock().iter().map(|u| u.token.clone()).collect();
    assert_eq!(tokens, vec!["abc", "secret", ""]);
}

#[tokio::test]
async fn test_repeated_query_keeps_order() {
    let recorder = Arc::new(Recorder::default());
    let handler = pipeline(Arc::new(Registry::new()), &recorder);

    handler
        .call(request(
            "POST",
            "/users/1?tag=a&tag=b&tag=c",
            &[("X-Token", "t")],
            r#"{"name":"John"}"#,
        ))
        .await;

    assert_eq!(recorder.handled.lock()[0].tags, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_default_applies_only_on_absence() {
    let recorder = Arc::new(Recorder::default());
    let handler = pipeline(Arc::new(Registry::new()), &recorder);
    let body = r#"{"name":"John"}"#;

    handler
        .call(request("POST", "/users/1", &[("X-Token", "t")], body))
        .await;
    handler
        .call(request("POST", "/users/1?page=2", &[("X-Token", "t")], body))
        .await;

    let pages: Vec<i64> = recorder.handled.lock().iter().map(|u| u.page).collect();
    assert_eq!(pages, vec![1, 2]);
}

#[tokio::test]
async fn test_supplied_value_beats_default_even_when_invalid() {
    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Listing {
        page: i64,
    }

    let registry = Arc::new(Registry::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let errors = Arc::clone(&seen);
    let options = Options::new()
        .registry(registry)
        .error_handler(move |_request: &Request, error: &Error| {
            errors.lock().push(error.to_string());
            Response::text(StatusCode::BAD_REQUEST, "bad page")
        });

    let schema = Schema::<Listing>::builder()
        .field("page", FieldType::INTEGER, "query=page;default=1", "gte=1")
        .build()
        .unwrap();
    let handler = valmid::middleware(schema, options)
        .unwrap()
        .wrap(handler_fn(|request: Request| async move {
            let listing: Listing = valmid::get(&request);
            Response::text(StatusCode::OK, &listing.page.to_string())
        }));

    let response = handler.call(request("GET", "/items", &[], "")).await;
    assert_eq!(body_text(response).await, "1");

    let response = handler.call(request("GET", "/items?page=0", &[], "")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(seen.lock()[0].contains("'page' failed on the 'gte=1' rule"));
}

#[tokio::test]
async fn test_accessor_is_idempotent_and_defaults_without_middleware() {
    let checked = handler_fn(|request: Request| async move {
        let first: UpdateUser = valmid::get(&request);
        let second: UpdateUser = valmid::get(&request);
        assert_eq!(first, second);
        assert_eq!(valmid::try_get::<UpdateUser>(&request), Some(&first));
        Response::text(StatusCode::OK, &first.token)
    });
    let handler = valmid::middleware(schema(), Options::new().registry(Arc::new(Registry::new())))
        .unwrap()
        .wrap(checked);

    let response = handler
        .call(request("POST", "/users/7", &[("X-Token", "t")], r#"{"name":"John"}"#))
        .await;
    assert_eq!(body_text(response).await, "t");

    let bare = request("GET", "/users", &[], "");
    assert_eq!(valmid::get::<UpdateUser>(&bare), UpdateUser::default());
    assert!(valmid::try_get::<UpdateUser>(&bare).is_none());
}

#[tokio::test]
async fn test_per_call_override_beats_registry_handler() {
    let registry = Arc::new(Registry::new());
    registry.set_error_handler(|_: &Request, _: &Error| Response::text(StatusCode::CONFLICT, "registry"));

    let options = Options::new()
        .registry(Arc::clone(&registry))
        .error_handler(|_: &Request, error: &Error| {
            Response::text(StatusCode::IM_A_TEAPOT, error.error_code())
        });
    let handler = valmid::middleware(schema(), options)
        .unwrap()
        .wrap(handler_fn(|_request: Request| async {
            Response::text(StatusCode::OK, "ok")
        }));

    let response = handler.call(request("POST", "/users/1", &[], "")).await;
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);

    assert_eq!(body_text(response).await, "MISSING_FIELD");
}

#[tokio::test]
async fn test_registry_handler_replaced_after_construction() {
    let registry = Arc::new(Registry::new());
    let handler = valmid::middleware(schema(), Options::new().registry(Arc::clone(&registry)))
        .unwrap()
        .wrap(handler_fn(|_request: Request| async {
            Response::text(StatusCode::OK, "ok")
        }));

    let response = handler.call(request("POST", "/users/1", &[], "")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    registry.set_error_handler(|_: &Request, _: &Error| {
        Response::text(StatusCode::UNAUTHORIZED, "replaced")
    });
    let response = handler.call(request("POST", "/users/1", &[], "")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_custom_rule_through_registry_validator() {
    let registry = Arc::new(Registry::new());
    let mut validator = valmid::Validator::new();
    validator
        .register_rule(
            "lowercase",
            Arc::new(|value: &serde_json::Value, _: Option<&str>| {
                value.as_str().is_some_and(|s| s.chars().all(|c| !c.is_uppercase()))
            }),
        )
        .unwrap();

    let lowercase_schema = || {
        Schema::<Body>::builder()
            .field("name", FieldType::STRING, "query=name", "lowercase")
            .build()
            .unwrap()
    };

    let options = Options::new().registry(Arc::clone(&registry));
    assert!(valmid::middleware(lowercase_schema(), options.clone()).is_err());

    registry.set_validator(validator);
    let handler = valmid::middleware(lowercase_schema(), options)
        .unwrap()
        .wrap(handler_fn(|_request: Request| async {
            Response::text(StatusCode::OK, "ok")
        }));

    let ok = handler.call(request("GET", "/?name=john", &[], "")).await;
    let bad = handler.call(request("GET", "/?name=John", &[], "")).await;
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_form_body_then_query() {
    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Login {
        user: String,
        remember: bool,
    }

    let schema = Schema::<Login>::builder()
        .field("user", FieldType::STRING, "form=user;required", "alphanum")
        .field("remember", FieldType::BOOLEAN, "form=remember", "")
        .build()
        .unwrap();
    let handler = valmid::middleware(schema, Options::new().registry(Arc::new(Registry::new())))
        .unwrap()
        .wrap(handler_fn(|request: Request| async move {
            let login: Login = valmid::get(&request);
            Response::text(StatusCode::OK, &format!("{}:{}", login.user, login.remember))
        }));

    let response = handler
        .call(request(
            "POST",
            "/login?user=fromquery&remember=true",
            &[("Content-Type", "application/x-www-form-urlencoded")],
            "user=alice",
        ))
        .await;
    assert_eq!(body_text(response).await, "alice:true");
}

proptest! {
    #[test]
    fn prop_bound_input_equals_request_values(
        id in 1i64..1_000_000,
        page in 1i64..500,
        token in "[a-z0-9]{1,16}",
        name in "[A-Za-z]{3,24}",
        tags in proptest::collection::vec("[a-z]{1,6}", 0..6),
    ) {
        let recorder = Arc::new(Recorder::default());
        let handler = pipeline(Arc::new(Registry::new()), &recorder);

        let mut uri = format!("/users/{id}?page={page}&access_token={token}");
        for tag in &tags {
            uri.push_str(&format!("&tag={tag}"));
        }
        let body = serde_json::json!({ "name": name.clone() }).to_string();

        let response = tokio_test::block_on(handler.call(request("POST", &uri, &[], &body)));
        prop_assert_eq!(response.status(), StatusCode::OK);

        let expected = UpdateUser {
            id,
            page,
            token,
            tags,
            body: Some(Body { name }),
        };
        let handled = recorder.handled.lock();
        prop_assert_eq!(handled.as_slice(), &[expected]);
    }
}
