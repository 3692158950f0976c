use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::diagnosis::router::{PROXY_SECRET_HEADER, SESSION_ID_HEADER, USER_ID_HEADER};
use crate::diagnosis::{
    diagnosis_router, DiagnosisService, IdentityPolicy, MatchingConfig, NonceGuard, Owner,
    SessionId, DIAGNOSIS_NONCE_ACTION,
};

const PROXY_SECRET: &str = "edge-proxy-secret";

fn guard() -> NonceGuard {
    NonceGuard::new("routing-secret", 86_400)
}

fn identity_policy() -> IdentityPolicy {
    IdentityPolicy::trusting_proxy(PROXY_SECRET)
}

fn router_for(harness: &Harness, debug: bool) -> Router {
    diagnosis_router(Arc::clone(&harness.service), guard(), identity_policy(), debug)
}

fn user_nonce() -> String {
    guard().issue(DIAGNOSIS_NONCE_ACTION, &user())
}

fn post_json(uri: &str, payload: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(USER_ID_HEADER, "7")
        .header(PROXY_SECRET_HEADER, PROXY_SECRET)
        .body(Body::from(payload.to_string()))
        .expect("request")
}

#[tokio::test]
async fn questions_route_lists_catalog() {
    let harness = harness();
    let response = router_for(&harness, false)
        .oneshot(
            Request::get("/api/v1/diagnosis/questions")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"].as_array().map(Vec::len), Some(7));
    assert_eq!(body["data"][0]["id"], json!("business_type"));
}

#[tokio::test]
async fn anonymous_visitor_gets_session_and_usable_nonce() {
    let harness = harness();
    let router = router_for(&harness, false);

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/v1/diagnosis/nonce")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let session = response
        .headers()
        .get(SESSION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .expect("session header issued");
    let body = json_body(response).await;
    assert_eq!(body["data"]["session_id"], json!(session));
    let nonce = body["data"]["nonce"].as_str().expect("nonce").to_string();

    let response = router
        .oneshot(
            Request::post("/api/v1/diagnosis")
                .header(header::CONTENT_TYPE, "application/json")
                .header(SESSION_ID_HEADER, session.as_str())
                .body(Body::from(
                    json!({ "nonce": nonce, "answers": startup_answers() }).to_string(),
                ))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SESSION_ID_HEADER).is_none());
    let body = json_body(response).await;
    assert_eq!(body["data"]["session_id"], json!(session));
}

#[tokio::test]
async fn diagnose_route_returns_matches_reasons_and_recommendations() {
    let harness = harness();
    let response = router_for(&harness, false)
        .oneshot(post_json(
            "/api/v1/diagnosis",
            &json!({ "nonce": user_nonce(), "answers": startup_answers() }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let data = &body["data"];

    assert_eq!(body["success"], json!(true));
    assert_eq!(data["matched_grants"].as_array().map(Vec::len), Some(2));
    assert_eq!(data["matched_grants"][0]["id"], json!(101));
    assert!(data["matched_grants"][0]["match_score"].as_f64().is_some());
    assert_eq!(
        data["match_reasons"]["101"],
        json!(["業種が一致しています", "地域の助成金です"])
    );
    assert_eq!(
        data["recommendations"][0],
        json!("創業支援の助成金を優先的に検討することをお勧めします。")
    );
    assert!(data["diagnosis_id"].as_str().is_some());
    assert!(data.get("fallback_grants").is_none());
    assert!(data.get("session_id").is_none());
}

#[tokio::test]
async fn answers_may_arrive_as_json_string() {
    let harness = harness();
    let response = router_for(&harness, false)
        .oneshot(post_json(
            "/api/v1/diagnosis",
            &json!({ "nonce": user_nonce(), "answers": startup_answers().to_string() }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_or_foreign_nonce_is_forbidden_before_data_access() {
    let harness = harness();

    let response = router_for(&harness, false)
        .oneshot(post_json(
            "/api/v1/diagnosis",
            &json!({ "answers": startup_answers() }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["data"]["message"], json!("security check failed"));
    assert!(body["data"].get("fallback_grants").is_none());

    let foreign = guard().issue(DIAGNOSIS_NONCE_ACTION, &Owner::User(8));
    let response = router_for(&harness, false)
        .oneshot(post_json(
            "/api/v1/diagnosis",
            &json!({ "nonce": foreign, "answers": startup_answers() }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router_for(&harness, false)
        .oneshot(
            Request::post("/api/v1/diagnosis")
                .header(USER_ID_HEADER, "7")
                .header(PROXY_SECRET_HEADER, PROXY_SECRET)
                .body(Body::from("not json"))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert_eq!(harness.grants.searches(), 0);
    assert_eq!(harness.history.len(), 0);
}

#[tokio::test]
async fn validation_failure_returns_fallback_grants() {
    let harness = harness();
    let response = router_for(&harness, false)
        .oneshot(post_json(
            "/api/v1/diagnosis",
            &json!({ "nonce": user_nonce(), "answers": {} }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], json!(422));
    assert_eq!(
        body["data"]["message"],
        json!("「事業形態を選択してください」は必須項目です。")
    );
    assert_eq!(
        body["data"]["fallback_grants"].as_array().map(Vec::len),
        Some(4)
    );
}

#[tokio::test]
async fn storage_failure_degrades_to_fallback_and_hides_detail() {
    for debug in [false, true] {
        let (service, _worker) = DiagnosisService::spawn(
            Arc::new(FailingSearchRepository),
            Arc::new(MemoryHistoryRepository::default()),
            MatchingConfig::default(),
        );
        let router = diagnosis_router(Arc::new(service), guard(), identity_policy(), debug);

        let response = router
            .oneshot(post_json(
                "/api/v1/diagnosis",
                &json!({ "nonce": user_nonce(), "answers": startup_answers() }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert!(body["data"]["fallback_grants"]
            .as_array()
            .is_some_and(|grants| !grants.is_empty()));
        assert_eq!(body["data"].get("debug").is_some(), debug);
    }
}

#[tokio::test]
async fn history_route_returns_callers_records() {
    let harness = harness();
    let router = router_for(&harness, false);

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/v1/diagnosis",
            &json!({ "nonce": user_nonce(), "answers": startup_answers() }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    wait_for_rows(&harness.history, 1).await;

    let response = router
        .oneshot(post_json(
            "/api/v1/diagnosis/history",
            &json!({ "nonce": user_nonce() }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let history = body["data"]["history"].as_array().expect("history list");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["answers"]["industry"], json!("it"));
    assert_eq!(history[0]["results"][0]["grant_id"], json!(101));
}

#[tokio::test]
async fn unvouched_user_header_cannot_read_another_users_history() {
    let harness = harness();
    let router = router_for(&harness, false);

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/v1/diagnosis",
            &json!({ "nonce": user_nonce(), "answers": startup_answers() }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    wait_for_rows(&harness.history, 1).await;

    for proof in [None, Some("guessed-secret")] {
        let mut request = Request::get("/api/v1/diagnosis/nonce").header(USER_ID_HEADER, "7");
        if let Some(proof) = proof {
            request = request.header(PROXY_SECRET_HEADER, proof);
        }
        let response = router
            .clone()
            .oneshot(request.body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let session = response
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .expect("spoofed caller is given a session");
        let body = json_body(response).await;
        let nonce = body["data"]["nonce"].as_str().expect("nonce").to_string();
        assert_ne!(nonce, user_nonce());

        let mut request = Request::post("/api/v1/diagnosis/history")
            .header(header::CONTENT_TYPE, "application/json")
            .header(USER_ID_HEADER, "7")
            .header(SESSION_ID_HEADER, session.as_str());
        if let Some(proof) = proof {
            request = request.header(PROXY_SECRET_HEADER, proof);
        }
        let response = router
            .clone()
            .oneshot(
                request
                    .body(Body::from(json!({ "nonce": nonce }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["history"], json!([]));
    }
}

#[test]
fn identity_prefers_vouched_user_over_session() {
    let policy = identity_policy();
    let mut headers = axum::http::HeaderMap::new();
    headers.insert(USER_ID_HEADER, "15".parse().expect("header value"));
    headers.insert(SESSION_ID_HEADER, "abc".parse().expect("header value"));

    let identity = policy.resolve(&headers);
    assert_eq!(identity.owner, Owner::Session(SessionId("abc".to_string())));

    headers.insert(PROXY_SECRET_HEADER, PROXY_SECRET.parse().expect("header value"));
    let identity = policy.resolve(&headers);
    assert_eq!(identity.owner, Owner::User(15));
    assert!(!identity.issued_session);

    let identity = IdentityPolicy::sessions_only().resolve(&headers);
    assert_eq!(identity.owner, Owner::Session(SessionId("abc".to_string())));

    headers.remove(USER_ID_HEADER);
    let identity = policy.resolve(&headers);
    assert_eq!(identity.owner, Owner::Session(SessionId("abc".to_string())));

    let identity = policy.resolve(&axum::http::HeaderMap::new());
    assert!(identity.issued_session);
    assert!(identity.owner.session_id().is_some());
}
