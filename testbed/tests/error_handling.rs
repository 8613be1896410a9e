//! Integration tests for the permanent `notFound` and `errorHandler` layers.

mod common;

use serde_json::{Value, json};
use testbed::prelude::*;

use common::harness;

#[tokio::test]
async fn test_not_found_body() {
    let harness = harness().await;

    let response = harness.test_get("/nowhere").send().await;

    response
        .assert_status(StatusCode::NOT_FOUND)
        .assert_header("content-type", "application/json");
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["message"], "cannot GET /nowhere");
    assert_eq!(body["trace_id"], response.header("x-trace-id").unwrap());
}

#[tokio::test]
async fn test_handler_errors_are_rendered() {
    let harness = harness().await;
    harness.app().post("/users", |_, _| async {
        Err::<Json<Value>, _>(
            Error::conflict("email already taken").with_details(json!({"field": "email"})),
        )
    });

    let response = harness.test_post("/users").send().await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert_eq!(body["error"]["details"], json!({"field": "email"}));
    assert!(body["trace_id"].is_string());
}

#[tokio::test]
async fn test_custom_error_handler() {
    let harness = harness().await;
    harness.app().error_handler(|error, ctx| {
        (
            error.status_code(),
            format!("{} ({})", error.message, ctx.path),
        )
            .into_response()
    });
    harness
        .app()
        .get("/broken", |_, _| async { Error::internal("boom") });

    harness
        .test_get("/broken")
        .send()
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_text("boom (/broken)");

    harness
        .test_get("/missing")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .assert_text("cannot GET /missing (/missing)");
}

#[tokio::test]
async fn test_custom_not_found_survives_clear() {
    let harness = harness().await;
    harness
        .app()
        .not_found(|method, path| (StatusCode::GONE, format!("{method} {path}")).into_response());

    harness.clear();

    harness
        .test_delete("/users/1")
        .send()
        .await
        .assert_status(StatusCode::GONE)
        .assert_text("DELETE /users/1");
}
