use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json, Router};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::ServeArgs;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::telemetry;
use crate::workflows::import::{
    import_router, CsvRosterReader, ImportQueue, ImportService, ImportStore, ImportWorker,
    InMemoryDocumentStore, InMemoryImportStore, InMemoryProgressionNotifier,
};
use crate::workflows::recruitment::Recruitment;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
}

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let store = Arc::new(InMemoryImportStore::default());
    let documents = Arc::new(InMemoryDocumentStore::default());
    let notifier = Arc::new(InMemoryProgressionNotifier::default());
    let service = Arc::new(ImportService::new(store.clone(), documents, notifier));

    let recruitment = seed_recruitment(&store)?;

    let cancel = CancellationToken::new();
    let (queue, receiver) = ImportQueue::bounded(config.import.queue_capacity);
    let worker = ImportWorker::new(
        store.clone(),
        Arc::new(CsvRosterReader::default()),
        receiver,
        cancel.clone(),
    );
    let worker_handle = tokio::spawn(worker.run());

    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
    };

    let app = with_service_routes(import_router(service, queue, cancel.clone()))
        .layer(Extension(state))
        .layer(DefaultBodyLimit::max(config.import.max_bundle_bytes));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        recruitment_id = %recruitment.id,
        "roster import service ready"
    );

    let shutdown = {
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_err() {
                tracing::error!("could not listen for the shutdown signal");
            }
            cancel.cancel();
        }
    };
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    cancel.cancel();
    if let Err(error) = worker_handle.await {
        tracing::error!(error = %error, "import worker task aborted");
    }
    Ok(())
}

/// There is no recruitment administration endpoint; the in-memory store
/// starts with one recruitment whose id is logged at startup.
fn seed_recruitment(store: &InMemoryImportStore) -> Result<Recruitment, AppError> {
    let mut recruitment = Recruitment::new("Software Engineer");
    for step in ["Screening", "Interview", "Offer"] {
        recruitment.add_step(step)?;
    }
    store.insert_recruitment(recruitment.clone())?;
    Ok(recruitment)
}

fn with_service_routes(router: Router) -> Router {
    router
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}
