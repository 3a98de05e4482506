//! Admin API over stored purchases.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tower::ServiceExt;

use purchases_listener::purchases::ContentDigest;
use purchases_listener::storage::{MemoryStore, NewPurchase, PurchaseStore};

mod common;

use common::{body_string, test_app, test_config, ADMIN_KEY};

fn admin_request(method: Method, uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {ADMIN_KEY}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap()
}

async fn seed(store: &MemoryStore, text: &str) -> i32 {
    store
        .insert(NewPurchase {
            xml_content: text.to_string(),
            version: Some("1.0".to_string()),
            purchases_count: None,
            content_hash: ContentDigest::of(text),
        })
        .await
        .unwrap()
        .id
}

async fn json_body(response: axum::http::Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

#[tokio::test]
async fn test_rejects_missing_or_wrong_key() {
    let (app, _) = test_app(test_config());

    let no_key = Request::get("/admin/status").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(no_key).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let wrong_key = Request::get("/admin/status")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(wrong_key).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_absent_when_disabled() {
    let mut config = test_config();
    config.admin.enabled = false;
    let (app, _) = test_app(config);

    let response = app
        .oneshot(admin_request(Method::GET, "/admin/status", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_reports_record_count() {
    let (app, store) = test_app(test_config());
    seed(&store, "<purchases count=\"1\"/>").await;
    seed(&store, "<purchases count=\"2\"/>").await;

    let response = app
        .oneshot(admin_request(Method::GET, "/admin/status", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let status = json_body(response).await;
    assert_eq!(status["service"], "purchases-listener");
    assert_eq!(status["records"], 2);
}

#[tokio::test]
async fn test_list_is_newest_first_and_searchable() {
    let (app, store) = test_app(test_config());
    let first = seed(&store, "<purchases shop=\"north\"/>").await;
    let second = seed(&store, "<purchases shop=\"south\"/>").await;

    let response = app
        .clone()
        .oneshot(admin_request(Method::GET, "/admin/purchases", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = json_body(response).await;
    let ids: Vec<i64> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![second as i64, first as i64]);
    assert!(listed[0].get("xml_content").is_none());

    let response = app
        .oneshot(admin_request(Method::GET, "/admin/purchases?q=north&limit=10", Body::empty()))
        .await
        .unwrap();
    let listed = json_body(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], first);
}

#[tokio::test]
async fn test_get_returns_full_record_or_404() {
    let (app, store) = test_app(test_config());
    let id = seed(&store, "<purchases/>").await;

    let response = app
        .clone()
        .oneshot(admin_request(Method::GET, &format!("/admin/purchases/{id}"), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let record = json_body(response).await;
    assert_eq!(record["xml_content"], "<purchases/>");
    assert_eq!(record["content_hash"], ContentDigest::of("<purchases/>").as_str());

    let response = app
        .oneshot(admin_request(Method::GET, "/admin/purchases/9999", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_edit_rehashes_content() {
    let (app, store) = test_app(test_config());
    let id = seed(&store, "<purchases/>").await;
    let edited = r#"{"xml_content":"<purchases count=\"4\"/>","version":"2.0","purchases_count":4}"#;

    let response = app
        .oneshot(admin_request(
            Method::PUT,
            &format!("/admin/purchases/{id}"),
            Body::from(edited),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let record = store.get(id).await.unwrap().unwrap();
    assert_eq!(record.xml_content, "<purchases count=\"4\"/>");
    assert_eq!(record.purchases_count, Some(4));
    assert_eq!(record.content_hash, ContentDigest::of("<purchases count=\"4\"/>"));
    assert!(store
        .find_by_digest(&ContentDigest::of("<purchases/>"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_edit_into_existing_content_conflicts() {
    let (app, store) = test_app(test_config());
    seed(&store, "<a/>").await;
    let id = seed(&store, "<b/>").await;

    let response = app
        .oneshot(admin_request(
            Method::PUT,
            &format!("/admin/purchases/{id}"),
            Body::from(r#"{"xml_content":"<a/>"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(json_body(response).await["error"].is_string());

    let record = store.get(id).await.unwrap().unwrap();
    assert_eq!(record.xml_content, "<b/>");
}

#[tokio::test]
async fn test_delete_frees_the_digest() {
    let (app, store) = test_app(test_config());
    let id = seed(&store, "<purchases/>").await;

    let response = app
        .clone()
        .oneshot(admin_request(Method::DELETE, &format!("/admin/purchases/{id}"), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(store.is_empty());

    let response = app
        .oneshot(admin_request(Method::DELETE, &format!("/admin/purchases/{id}"), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The same content can be received again after deletion.
    seed(&store, "<purchases/>").await;
    assert_eq!(store.len(), 1);
}
