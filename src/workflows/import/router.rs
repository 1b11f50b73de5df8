use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::workflows::recruitment::{
    CandidateId, DocumentId, ImportSessionId, RecruitmentId, UserId, WorkflowError,
};

use super::bundle::BundleSplitError;
use super::repository::{DocumentStore, DocumentStoreError, ImportStore, ProgressionNotifier, StoreError};
use super::service::{ImportService, ImportServiceError, RecordOutcomeCommand};
use super::session::SessionError;
use super::worker::{ImportQueue, ImportRequest};

/// Shared handler state: the interactive service, the queue feeding the
/// worker, and the server's shutdown token (bundle splits honour it).
pub struct ImportRouterState<S, D, N> {
    pub(crate) service: Arc<ImportService<S, D, N>>,
    pub(crate) queue: ImportQueue,
    pub(crate) cancel: CancellationToken,
}

impl<S, D, N> Clone for ImportRouterState<S, D, N> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            queue: self.queue.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

/// Router builder exposing HTTP endpoints for the import pipeline and
/// interactive progression.
pub fn import_router<S, D, N>(
    service: Arc<ImportService<S, D, N>>,
    queue: ImportQueue,
    cancel: CancellationToken,
) -> Router
where
    S: ImportStore + 'static,
    D: DocumentStore + 'static,
    N: ProgressionNotifier + 'static,
{
    let state = ImportRouterState {
        service,
        queue,
        cancel,
    };
    Router::new()
        .route(
            "/api/v1/recruitments/:recruitment_id/imports",
            post(start_import_handler::<S, D, N>),
        )
        .route(
            "/api/v1/recruitments/:recruitment_id/outcomes",
            post(record_outcome_handler::<S, D, N>),
        )
        .route(
            "/api/v1/imports/:session_id",
            get(session_view_handler::<S, D, N>),
        )
        .route(
            "/api/v1/imports/:session_id/bundle",
            post(split_bundle_handler::<S, D, N>),
        )
        .route(
            "/api/v1/imports/:session_id/rows/:row_number/confirm",
            post(confirm_match_handler::<S, D, N>),
        )
        .route(
            "/api/v1/imports/:session_id/rows/:row_number/reject",
            post(reject_match_handler::<S, D, N>),
        )
        .route(
            "/api/v1/documents/:document_id/assign",
            post(assign_document_handler::<S, D, N>),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct StartImportBody {
    pub requested_by: UserId,
    pub file_name: String,
    pub roster_csv: String,
}

#[derive(Debug, Deserialize)]
pub struct RejectMatchBody {
    pub reviewed_by: UserId,
}

#[derive(Debug, Deserialize)]
pub struct AssignDocumentBody {
    pub candidate_id: CandidateId,
}

pub(crate) async fn start_import_handler<S, D, N>(
    State(state): State<ImportRouterState<S, D, N>>,
    Path(recruitment_id): Path<Uuid>,
    axum::Json(body): axum::Json<StartImportBody>,
) -> Response
where
    S: ImportStore + 'static,
    D: DocumentStore + 'static,
    N: ProgressionNotifier + 'static,
{
    let session = match state.service.start_session(
        RecruitmentId(recruitment_id),
        body.file_name,
        body.requested_by,
    ) {
        Ok(session) => session,
        Err(error) => return error_response(error),
    };
    let session_id = session.id;

    let request = ImportRequest {
        session_id,
        roster_csv: body.roster_csv.into_bytes(),
    };
    if state.queue.submit(request).await.is_err() {
        tracing::error!(session_id = %session_id, "import queue rejected the request");
        if let Err(error) = state
            .service
            .fail_session(&session_id, "import queue is not accepting work")
        {
            tracing::error!(
                session_id = %session_id,
                error = %error,
                "could not settle the unqueued session"
            );
        }
        let payload = json!({
            "error": "import queue is not accepting work",
        });
        return (StatusCode::SERVICE_UNAVAILABLE, axum::Json(payload)).into_response();
    }

    let payload = json!({
        "session_id": session_id,
        "status": session.status().label(),
    });
    (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
}

pub(crate) async fn session_view_handler<S, D, N>(
    State(state): State<ImportRouterState<S, D, N>>,
    Path(session_id): Path<Uuid>,
) -> Response
where
    S: ImportStore + 'static,
    D: DocumentStore + 'static,
    N: ProgressionNotifier + 'static,
{
    match state.service.session_view(&ImportSessionId(session_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn confirm_match_handler<S, D, N>(
    State(state): State<ImportRouterState<S, D, N>>,
    Path((session_id, row_number)): Path<(Uuid, u32)>,
) -> Response
where
    S: ImportStore + 'static,
    D: DocumentStore + 'static,
    N: ProgressionNotifier + 'static,
{
    match state
        .service
        .confirm_match(&ImportSessionId(session_id), row_number)
    {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reject_match_handler<S, D, N>(
    State(state): State<ImportRouterState<S, D, N>>,
    Path((session_id, row_number)): Path<(Uuid, u32)>,
    axum::Json(body): axum::Json<RejectMatchBody>,
) -> Response
where
    S: ImportStore + 'static,
    D: DocumentStore + 'static,
    N: ProgressionNotifier + 'static,
{
    match state
        .service
        .reject_match(&ImportSessionId(session_id), row_number, body.reviewed_by)
    {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn record_outcome_handler<S, D, N>(
    State(state): State<ImportRouterState<S, D, N>>,
    Path(recruitment_id): Path<Uuid>,
    axum::Json(command): axum::Json<RecordOutcomeCommand>,
) -> Response
where
    S: ImportStore + 'static,
    D: DocumentStore + 'static,
    N: ProgressionNotifier + 'static,
{
    match state
        .service
        .record_outcome(RecruitmentId(recruitment_id), command)
    {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn split_bundle_handler<S, D, N>(
    State(state): State<ImportRouterState<S, D, N>>,
    Path(session_id): Path<Uuid>,
    body: axum::body::Bytes,
) -> Response
where
    S: ImportStore + 'static,
    D: DocumentStore + 'static,
    N: ProgressionNotifier + 'static,
{
    match state
        .service
        .split_bundle(&ImportSessionId(session_id), &body, &state.cancel)
    {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn assign_document_handler<S, D, N>(
    State(state): State<ImportRouterState<S, D, N>>,
    Path(document_id): Path<Uuid>,
    axum::Json(body): axum::Json<AssignDocumentBody>,
) -> Response
where
    S: ImportStore + 'static,
    D: DocumentStore + 'static,
    N: ProgressionNotifier + 'static,
{
    match state
        .service
        .assign_document(&DocumentId(document_id), &body.candidate_id)
    {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: ImportServiceError) -> Response {
    let status = match &error {
        ImportServiceError::Store(StoreError::NotFound)
        | ImportServiceError::Documents(DocumentStoreError::NotFound)
        | ImportServiceError::Session(SessionError::RowNotFound { .. }) => StatusCode::NOT_FOUND,
        ImportServiceError::Store(StoreError::Conflict)
        | ImportServiceError::Documents(DocumentStoreError::Conflict)
        | ImportServiceError::Session(
            SessionError::AlreadyFinished
            | SessionError::SessionNotCompleted
            | SessionError::SessionFailed
            | SessionError::RowNotFlagged { .. }
            | SessionError::RowAlreadyResolved { .. },
        ) => StatusCode::CONFLICT,
        ImportServiceError::Workflow(
            WorkflowError::StepNotAssigned
            | WorkflowError::AlreadyCompleted
            | WorkflowError::StepMismatch { .. },
        ) => StatusCode::CONFLICT,
        ImportServiceError::Workflow(_) | ImportServiceError::ForeignCandidate => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ImportServiceError::Split(BundleSplitError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
        ImportServiceError::Split(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ImportServiceError::Store(StoreError::Unavailable(_))
        | ImportServiceError::Documents(DocumentStoreError::Unavailable(_))
        | ImportServiceError::Notify(_)
        | ImportServiceError::RowWithoutCandidate { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
