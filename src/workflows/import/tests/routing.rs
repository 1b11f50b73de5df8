use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use uuid::Uuid;

use super::common::*;
use crate::workflows::import::memory::{InMemoryDocumentStore, InMemoryProgressionNotifier};
use crate::workflows::import::router::{import_router, session_view_handler, ImportRouterState};
use crate::workflows::import::service::ImportService;
use crate::workflows::import::session::SessionStatus;
use crate::workflows::import::worker::ImportQueue;
use crate::workflows::recruitment::UserId;

#[tokio::test]
async fn start_import_returns_accepted_and_enqueues() {
    let (service, store, _, _) = build_service();
    let recruitment = seeded_recruitment(&store, &["Screening"]);
    let (router, mut receiver) = test_router(service);

    let payload = json!({
        "requested_by": UserId::generate(),
        "file_name": "roster.csv",
        "roster_csv": "Full Name,Email\nAlice Stone,alice@example.com\n",
    });
    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/recruitments/{}/imports", recruitment.id))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request builds");
    let response = router.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "processing");

    let queued = receiver.try_recv().expect("request enqueued");
    assert_eq!(body["session_id"], json!(queued.session_id));
    assert_eq!(
        queued.roster_csv,
        b"Full Name,Email\nAlice Stone,alice@example.com\n".to_vec()
    );
}

#[tokio::test]
async fn unknown_sessions_return_not_found() {
    let (service, _, _, _) = build_service();
    let (router, _receiver) = test_router(service);

    let request = Request::builder()
        .uri(format!("/api/v1/imports/{}", Uuid::new_v4()))
        .body(Body::empty())
        .expect("request builds");
    let response = router.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "record not found");
}

#[tokio::test]
async fn confirming_rows_on_processing_sessions_conflicts() {
    let (service, store, _, _) = build_service();
    let recruitment = seeded_recruitment(&store, &["Screening"]);
    let session = service
        .start_session(recruitment.id, "roster.csv".to_string(), UserId::generate())
        .expect("session starts");
    let (router, _receiver) = test_router(service);

    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/imports/{}/rows/2/confirm", session.id))
        .body(Body::empty())
        .expect("request builds");
    let response = router.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn bundles_that_are_not_pdfs_are_rejected() {
    let (service, store, _, _) = build_service();
    let recruitment = seeded_recruitment(&store, &["Screening"]);
    let session = service
        .start_session(recruitment.id, "roster.csv".to_string(), UserId::generate())
        .expect("session starts");
    let (router, _receiver) = test_router(service);

    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/imports/{}/bundle", session.id))
        .header(header::CONTENT_TYPE, "application/pdf")
        .body(Body::from("not a pdf"))
        .expect("request builds");
    let response = router.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn queue_outages_fail_the_session() {
    let (service, store, _, _) = build_service();
    let recruitment = seeded_recruitment(&store, &["Screening"]);
    let (router, receiver) = test_router(service);
    drop(receiver);

    let payload = json!({
        "requested_by": UserId::generate(),
        "file_name": "roster.csv",
        "roster_csv": "Full Name,Email\nAlice Stone,alice@example.com\n",
    });
    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/recruitments/{}/imports", recruitment.id))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request builds");
    let response = router.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let sessions = store.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status(), SessionStatus::Failed);
    assert_eq!(
        sessions[0].failure_reason(),
        Some("import queue is not accepting work")
    );
}

#[tokio::test]
async fn store_outages_surface_as_internal_errors() {
    let service = Arc::new(ImportService::new(
        Arc::new(UnavailableImportStore),
        Arc::new(InMemoryDocumentStore::default()),
        Arc::new(InMemoryProgressionNotifier::default()),
    ));
    let (queue, _receiver) = ImportQueue::bounded(1);
    let router = import_router(service, queue, CancellationToken::new());

    let request = Request::builder()
        .uri(format!("/api/v1/imports/{}", Uuid::new_v4()))
        .body(Body::empty())
        .expect("request builds");
    let response = router.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "store unavailable: store offline");
}

#[tokio::test]
async fn session_view_handler_reports_the_ledger() {
    let (service, store, _, _) = build_service();
    let recruitment = seeded_recruitment(&store, &["Screening"]);
    let session = service
        .start_session(recruitment.id, "roster.csv".to_string(), UserId::generate())
        .expect("session starts");
    run_import(
        store.clone(),
        session.id,
        &roster_csv(&[("Alice Stone", "alice@example.com", "")]),
    )
    .await;

    let (queue, _receiver) = ImportQueue::bounded(1);
    let state = ImportRouterState {
        service,
        queue,
        cancel: CancellationToken::new(),
    };
    let response = session_view_handler(State(state), Path(session.id.0)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["total_rows"], 1);
    assert_eq!(body["tallies"]["created"], 1);
    assert_eq!(body["rows"][0]["action"], "created");
    assert_eq!(body["rows"][0]["resolution"], "unresolved");
}
