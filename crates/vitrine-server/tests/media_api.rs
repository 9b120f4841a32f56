// Vitrine - Media Library Service
// Copyright (C) 2025 Vitrine Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! Integration tests for the media HTTP API
//!
//! Exercises the full router over the in-memory mock backend, including
//! overlay-ordered listings, mutation endpoints, and the admin guard.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use vitrine_server::state::AppState;
use vitrine_storage::mock::MockBackend;

fn app(backend: MockBackend) -> Router {
    vitrine_server::create_router(Arc::new(AppState::new(Arc::new(backend))))
}

fn app_with_token(backend: MockBackend, token: &str) -> Router {
    vitrine_server::create_router(Arc::new(AppState::new_with_token(
        Arc::new(backend),
        Some(token.to_string()),
    )))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

async fn seed_three(backend: &MockBackend, folder: &str) {
    backend
        .seed_asset(folder, "a.jpg", Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        .await;
    backend
        .seed_asset(folder, "b.jpg", Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap())
        .await;
    backend
        .seed_asset(folder, "c.jpg", Utc.with_ymd_and_hms(2025, 1, 3, 0, 0, 0).unwrap())
        .await;
}

fn item_ids(body: &Value) -> Vec<&str> {
    body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn list_applies_overlay_order_then_newest_first() {
    let backend = MockBackend::new();
    seed_three(&backend, "carousel").await;
    backend
        .seed_blob(
            "carousel.meta.json",
            json!({
                "order": ["b.jpg", "stale.jpg"],
                "descriptions": {"b.jpg": "second photo"}
            }),
        )
        .await;

    let response = app(backend)
        .oneshot(
            Request::builder()
                .uri("/media?folder=carousel")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    // Pinned id first, stale id dropped, the rest newest first.
    assert_eq!(item_ids(&body), vec!["b.jpg", "c.jpg", "a.jpg"]);
    assert_eq!(body["items"][0]["description"], "second photo");
    assert_eq!(body["items"][1]["description"], "");
    assert!(body["items"][0]["createdAt"].is_string());
}

#[tokio::test]
async fn list_defaults_to_gallery_folder() {
    let backend = MockBackend::new();
    backend
        .seed_asset("gallery", "g.jpg", Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap())
        .await;

    let response = app(backend)
        .oneshot(Request::builder().uri("/media").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(item_ids(&body), vec!["g.jpg"]);
}

#[tokio::test]
async fn list_returns_empty_items_when_backend_fails() {
    let backend = MockBackend::new();
    backend.fail_listings(true);

    let response = app(backend)
        .oneshot(
            Request::builder()
                .uri("/media?folder=carousel")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn reorder_replaces_order_and_subsequent_listing_follows_it() {
    let backend = MockBackend::new();
    seed_three(&backend, "carousel").await;
    let app = app(backend.clone());

    let response = app
        .clone()
        .oneshot(json_post(
            "/media/reorder",
            &json!({"folder": "carousel", "order": ["a.jpg", "c.jpg"]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"ok": true}));

    let stored = backend.blob("carousel.meta.json").await.unwrap();
    assert_eq!(stored["order"], json!(["a.jpg", "c.jpg"]));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/media?folder=carousel")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(item_ids(&body), vec!["a.jpg", "c.jpg", "b.jpg"]);
}

#[tokio::test]
async fn reorder_rejects_missing_fields() {
    let response = app(MockBackend::new())
        .oneshot(json_post("/media/reorder", &json!({"folder": "carousel"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn descriptions_merge_without_clobbering_existing_entries() {
    let backend = MockBackend::new();
    backend
        .seed_blob(
            "gallery.meta.json",
            json!({"order": [], "descriptions": {"a.jpg": "keep me"}}),
        )
        .await;
    let app = app(backend.clone());

    let response = app
        .oneshot(json_post(
            "/media/descriptions",
            &json!({"folder": "gallery", "descriptions": {"b.jpg": "new"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = backend.blob("gallery.meta.json").await.unwrap();
    assert_eq!(stored["descriptions"]["a.jpg"], "keep me");
    assert_eq!(stored["descriptions"]["b.jpg"], "new");
}

#[tokio::test]
async fn delete_removes_asset_and_prunes_overlay() {
    let backend = MockBackend::new();
    seed_three(&backend, "carousel").await;
    backend
        .seed_blob(
            "carousel.meta.json",
            json!({"order": ["b.jpg", "a.jpg"], "descriptions": {"b.jpg": "gone soon"}}),
        )
        .await;
    let app = app(backend.clone());

    let response = app
        .clone()
        .oneshot(json_post(
            "/media/delete",
            &json!({"folder": "carousel", "id": "b.jpg"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"success": true}));

    let stored = backend.blob("carousel.meta.json").await.unwrap();
    assert_eq!(stored["order"], json!(["a.jpg"]));
    assert!(stored["descriptions"].get("b.jpg").is_none());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/media?folder=carousel")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(item_ids(&body), vec!["a.jpg", "c.jpg"]);
}

#[tokio::test]
async fn delete_unknown_asset_reports_error() {
    let backend = MockBackend::new();
    seed_three(&backend, "carousel").await;

    let response = app(backend)
        .oneshot(json_post(
            "/media/delete",
            &json!({"folder": "carousel", "id": "missing.jpg"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("missing.jpg"));
}

#[tokio::test]
async fn upload_accepts_multipart_batch() {
    let backend = MockBackend::new();
    let app = app(backend.clone());

    let boundary = "vitrine-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         content-disposition: form-data; name=\"folder\"\r\n\r\n\
         gallery\r\n\
         --{boundary}\r\n\
         content-disposition: form-data; name=\"files\"; filename=\"sunset.jpg\"\r\n\
         content-type: image/jpeg\r\n\r\n\
         fakejpegdata\r\n\
         --{boundary}--\r\n"
    );

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/media/upload")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"ok": true}));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/media?folder=gallery")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    let ids = item_ids(&body);
    assert_eq!(ids.len(), 1);
    assert!(ids[0].ends_with("sunset.jpg"));
}

#[tokio::test]
async fn upload_without_files_is_rejected() {
    let boundary = "vitrine-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         content-disposition: form-data; name=\"folder\"\r\n\r\n\
         gallery\r\n\
         --{boundary}--\r\n"
    );

    let response = app(MockBackend::new())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/media/upload")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Missing folder/files");
}

#[tokio::test]
async fn settings_roundtrip_and_default() {
    let app = app(MockBackend::new());

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/settings").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({}));

    let response = app
        .clone()
        .oneshot(json_post("/settings", &json!({"siteTitle": "Atelier"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"success": true}));

    let response = app
        .oneshot(Request::builder().uri("/settings").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json(response).await, json!({"siteTitle": "Atelier"}));
}

#[tokio::test]
async fn settings_rejects_non_object_payload() {
    let response = app(MockBackend::new())
        .oneshot(json_post("/settings", &json!(["not", "an", "object"])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mutations_require_admin_token_when_configured() {
    let backend = MockBackend::new();
    seed_three(&backend, "carousel").await;
    let app = app_with_token(backend, "sesame");

    // Reads stay open.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/media?folder=carousel")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Unauthenticated mutation is refused.
    let response = app
        .clone()
        .oneshot(json_post(
            "/media/reorder",
            &json!({"folder": "carousel", "order": ["a.jpg"]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({"error": "unauthorized"}));

    // Header token is accepted.
    let mut request = json_post(
        "/media/reorder",
        &json!({"folder": "carousel", "order": ["a.jpg"]}),
    );
    request
        .headers_mut()
        .insert("x-admin-token", "sesame".parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // So is the dashboard cookie.
    let mut request = json_post(
        "/media/delete",
        &json!({"folder": "carousel", "id": "a.jpg"}),
    );
    request
        .headers_mut()
        .insert("cookie", "theme=dark; dashboard=sesame".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_admin_token_is_refused() {
    let app = app_with_token(MockBackend::new(), "sesame");

    let mut request = json_post(
        "/media/reorder",
        &json!({"folder": "carousel", "order": []}),
    );
    request
        .headers_mut()
        .insert("x-admin-token", "open-sesame".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
