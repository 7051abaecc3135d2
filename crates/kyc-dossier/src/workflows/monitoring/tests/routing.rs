use super::common::*;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn add_route_returns_created_then_ok_for_existing_entries() {
    let harness = build_service();
    let router = router_for(harness.service.clone());

    let created = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/monitoring",
            "tenant-a",
            json!({ "document": COMPANY, "notes": "supplier" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = read_json_body(created).await;
    assert_eq!(created["already_exists"], json!(false));
    assert_eq!(created["status"], json!("ACTIVE"));
    assert_eq!(created["entity_name"], json!("ACME INDUSTRIA LTDA"));

    let repeated = router
        .oneshot(json_request(
            "POST",
            "/api/v1/monitoring",
            "tenant-a",
            json!({ "document": COMPANY_DIGITS }),
        ))
        .await
        .expect("route executes");
    assert_eq!(repeated.status(), StatusCode::OK);
    let repeated = read_json_body(repeated).await;
    assert_eq!(repeated["already_exists"], json!(true));
    assert_eq!(repeated["record_id"], created["record_id"]);
}

#[tokio::test]
async fn add_route_rejects_invalid_documents() {
    let harness = build_service();
    let router = router_for(harness.service.clone());

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/monitoring",
            "tenant-a",
            json!({ "document": "1234" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_route_returns_not_found_for_unwatched_documents() {
    let harness = build_service();
    let router = router_for(harness.service.clone());

    let response = router
        .oneshot(empty_request(
            "PUT",
            &format!("/api/v1/monitoring/{PERSON_DIGITS}"),
            "tenant-a",
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], json!("monitoring entry not found"));
    assert!(harness.repository.writes().is_empty());
}

#[tokio::test]
async fn update_route_reports_restriction_changes() {
    let harness = build_service();
    harness
        .service
        .add("tenant-a", PERSON, None)
        .await
        .expect("entry added");
    harness.upstreams.sanctions.set_hits(PERSON_DIGITS, 1);
    let router = router_for(harness.service.clone());

    let response = router
        .oneshot(empty_request(
            "PUT",
            &format!("/api/v1/monitoring/{PERSON_DIGITS}"),
            "tenant-a",
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["old_restrictions"], json!(0));
    assert_eq!(payload["new_restrictions"], json!(1));
    assert_eq!(payload["has_changes"], json!(true));
    assert_eq!(payload["status"], json!("IRREGULAR"));
}

#[tokio::test]
async fn static_routes_are_not_captured_by_the_document_segment() {
    let harness = build_service();
    harness
        .service
        .add("tenant-a", COMPANY, None)
        .await
        .expect("entry added");
    let router = router_for(harness.service.clone());

    let stats = router
        .clone()
        .oneshot(empty_request("GET", "/api/v1/monitoring/stats", "tenant-a"))
        .await
        .expect("route executes");
    assert_eq!(stats.status(), StatusCode::OK);
    let stats = read_json_body(stats).await;
    assert_eq!(stats["total_monitored"], json!(1));
    assert_eq!(stats["by_type"]["CNPJ"], json!(1));

    let all = router
        .oneshot(empty_request("PUT", "/api/v1/monitoring/all", "tenant-a"))
        .await
        .expect("route executes");
    assert_eq!(all.status(), StatusCode::OK);
    let all = read_json_body(all).await;
    assert_eq!(all["total"], json!(1));
    assert_eq!(all["updated"], json!(1));
}

#[tokio::test]
async fn list_route_filters_and_validates_document_type() {
    let harness = build_service();
    for document in [COMPANY, PERSON] {
        harness
            .service
            .add("tenant-a", document, None)
            .await
            .expect("entry added");
    }
    let router = router_for(harness.service.clone());

    let companies = router
        .clone()
        .oneshot(empty_request(
            "GET",
            "/api/v1/monitoring?doc_type=cnpj",
            "tenant-a",
        ))
        .await
        .expect("route executes");
    assert_eq!(companies.status(), StatusCode::OK);
    let companies = read_json_body(companies).await;
    assert_eq!(companies["total"], json!(1));
    assert_eq!(companies["records"][0]["document_type"], json!("CNPJ"));

    let invalid = router
        .oneshot(empty_request(
            "GET",
            "/api/v1/monitoring?doc_type=passport",
            "tenant-a",
        ))
        .await
        .expect("route executes");
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_route_removes_then_reports_not_found() {
    let harness = build_service();
    harness
        .service
        .add("tenant-a", COMPANY, None)
        .await
        .expect("entry added");
    let router = router_for(harness.service.clone());
    let uri = format!("/api/v1/monitoring/{COMPANY_DIGITS}");

    let removed = router
        .clone()
        .oneshot(empty_request("DELETE", &uri, "tenant-a"))
        .await
        .expect("route executes");
    assert_eq!(removed.status(), StatusCode::OK);

    let missing = router
        .oneshot(empty_request("DELETE", &uri, "tenant-a"))
        .await
        .expect("route executes");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn recent_changes_route_defaults_to_two_days() {
    let harness = build_service();
    harness
        .service
        .add("tenant-a", PERSON, None)
        .await
        .expect("entry added");
    harness.upstreams.sanctions.set_hits(PERSON_DIGITS, 2);
    harness
        .service
        .update("tenant-a", PERSON)
        .await
        .expect("entry rechecked");
    let router = router_for(harness.service.clone());

    let response = router
        .oneshot(empty_request(
            "GET",
            "/api/v1/monitoring/changes/recent",
            "tenant-a",
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["total"], json!(1));
    assert_eq!(payload["changes"][0]["restriction_count"], json!(2));
}

#[tokio::test]
async fn malformed_tokens_are_rejected() {
    let harness = build_service();
    let router = router_for(harness.service.clone());

    let response = router
        .oneshot(
            Request::get("/api/v1/monitoring")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn recent_changes_route_accepts_oversized_windows() {
    let harness = build_service();
    harness
        .service
        .add("tenant-a", PERSON, None)
        .await
        .expect("entry added");
    harness.upstreams.sanctions.set_hits(PERSON_DIGITS, 1);
    harness
        .service
        .update("tenant-a", PERSON)
        .await
        .expect("entry rechecked");
    let router = router_for(harness.service.clone());

    let response = router
        .oneshot(empty_request(
            "GET",
            "/api/v1/monitoring/changes/recent?days=100000000",
            "tenant-a",
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["total"], json!(1));
}
