//! Integration tests for the generic request helpers.

mod common;

use http_body_util::BodyExt;
use serde_json::{Value, json};
use testbed::prelude::*;

use common::{TEXT_FIXTURE, harness, parse_multipart};

const UNMOUNTED: &str = "/v1/users";

#[tokio::test]
async fn test_option_answers_preflight() {
    let harness = harness().await;

    let response = harness.test_option(UNMOUNTED).send().await;

    response
        .assert_status(StatusCode::NO_CONTENT)
        .assert_header("access-control-allow-origin", "*");
    assert!(response.bytes().is_empty());
}

#[tokio::test]
async fn test_unmounted_paths_are_not_found() {
    let harness = harness().await;

    for builder in [
        harness.test_head(UNMOUNTED),
        harness.test_get(UNMOUNTED),
        harness.test_post(UNMOUNTED),
        harness.test_patch(UNMOUNTED),
        harness.test_put(UNMOUNTED),
        harness.test_delete(UNMOUNTED),
    ] {
        let method = builder.method().clone();
        let response = builder.send().await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method}");
    }

    harness
        .test_request(Method::GET, UNMOUNTED)
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_verbs_reach_mounted_routes() {
    let harness = harness().await;
    let app = harness.app();

    app.get("/v1/users", |_, _| async { Json(json!([{"id": 1}])) });
    app.post("/v1/users", |_, _| async {
        (StatusCode::CREATED, Json(json!({"id": 2})))
    });
    app.patch("/v1/users/:id", |_, params| async move {
        Json(json!({"patched": params["id"]}))
    });
    app.put("/v1/users/:id", |_, params| async move {
        Json(json!({"replaced": params["id"]}))
    });
    app.delete("/v1/users/:id", |_, _| async { StatusCode::NO_CONTENT });

    harness
        .test_get("/v1/users")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json(&json!([{"id": 1}]));

    let head = harness.test_head("/v1/users").send().await;
    head.assert_status(StatusCode::OK);
    assert!(head.bytes().is_empty());

    harness
        .test_post("/v1/users")
        .send()
        .await
        .assert_status(StatusCode::CREATED);
    harness
        .test_patch("/v1/users/7")
        .send()
        .await
        .assert_json(&json!({"patched": "7"}));
    harness
        .test_put("/v1/users/7")
        .send()
        .await
        .assert_json(&json!({"replaced": "7"}));
    harness
        .test_delete("/v1/users/7")
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_body_verbs_default_to_empty_object() {
    let harness = harness().await;

    harness.app().post("/echo", |req, _| async move {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = req.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        Json(json!({"contentType": content_type, "body": body}))
    });

    harness
        .test_post("/echo")
        .send()
        .await
        .assert_json(&json!({"contentType": "application/json", "body": {}}));

    harness
        .test_post("/echo")
        .json(&json!({"name": "Ada"}))
        .send()
        .await
        .assert_json(&json!({"contentType": "application/json", "body": {"name": "Ada"}}));
}

#[tokio::test]
async fn test_upload_sends_fields_and_files() {
    let harness = harness().await;

    harness.app().post("/v1/uploads", |req, _| async move {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = req.into_body().collect().await.unwrap().to_bytes();
        let parts = parse_multipart(&content_type, &body);

        let file = parts.iter().find(|p| p.file_name.is_some()).unwrap();
        let caption = parts.iter().find(|p| p.name == "caption").unwrap();
        Json(json!({
            "fieldname": file.name,
            "originalname": file.file_name,
            "mimetype": file.content_type,
            "size": file.data.len(),
            "caption": String::from_utf8_lossy(&caption.data),
        }))
    });

    let body = MultipartBody::new()
        .field("caption", "avatar")
        .attach("avatar", TEXT_FIXTURE);
    let response = harness.test_upload("/v1/uploads", body).send().await;

    let size = std::fs::metadata(TEXT_FIXTURE).unwrap().len();
    response.assert_status(StatusCode::OK).assert_json(&json!({
        "fieldname": "avatar",
        "originalname": "test.txt",
        "mimetype": "text/plain",
        "size": size,
        "caption": "avatar",
    }));
}

#[tokio::test]
async fn test_upload_from_record_with_options() {
    let harness = harness().await;

    harness.app().post("/v1/uploads", |req, _| async move {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = req.into_body().collect().await.unwrap().to_bytes();
        let parts = parse_multipart(&content_type, &body);
        let names: Vec<_> = parts
            .iter()
            .map(|p| json!([p.name, p.file_name, p.content_type]))
            .collect();
        Json(Value::Array(names))
    });

    let body = MultipartBody::from_value(json!({
        "title": "report",
        "attach": {
            "doc": { "file": TEXT_FIXTURE, "filename": "notes.csv", "contentType": "text/csv" }
        }
    }))
    .unwrap();

    harness
        .test_upload("/v1/uploads", body)
        .send()
        .await
        .assert_json(&json!([
            ["title", null, null],
            ["doc", "notes.csv", "text/csv"],
        ]));
}

#[tokio::test]
async fn test_upload_of_missing_file_fails_before_sending() {
    let harness = harness().await;

    let body = MultipartBody::new().attach("avatar", "/no/such/file.txt");
    let err = harness
        .test_upload("/v1/uploads", body)
        .try_send()
        .await
        .unwrap_err();

    assert!(err.to_string().contains("/no/such/file.txt"), "{err}");
}

#[tokio::test]
async fn test_clear_removes_mounted_routes() {
    let harness = harness().await;
    let baseline = harness.app().len();

    harness.app().get("/v1/users", |_, _| async { "users" });
    harness.mount(Router::new().get("/v1/posts", |_, _| async { "posts" }));
    assert_eq!(harness.app().len(), baseline + 2);

    harness.clear();
    assert_eq!(harness.app().len(), baseline);
    assert_eq!(
        harness.app().layer_names(),
        vec!["traceId", "requestLog", "cors", "notFound", "errorHandler"]
    );

    harness.clear();
    assert_eq!(harness.app().len(), baseline);

    harness
        .test_get("/v1/users")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
