use std::sync::Arc;

use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::workflows::import::memory::{
    InMemoryDocumentStore, InMemoryImportStore, InMemoryProgressionNotifier,
};
use crate::workflows::import::repository::{ImportCommit, ImportStore, StoreError};
use crate::workflows::import::roster::CsvRosterReader;
use crate::workflows::import::router::import_router;
use crate::workflows::import::service::ImportService;
use crate::workflows::import::session::ImportSession;
use crate::workflows::import::worker::{ImportQueue, ImportRequest, ImportWorker};
use crate::workflows::recruitment::{
    Candidate, CandidateId, ImportSessionId, Recruitment, RecruitmentId,
};

pub(super) type MemoryService =
    ImportService<InMemoryImportStore, InMemoryDocumentStore, InMemoryProgressionNotifier>;

pub(super) fn build_service() -> (
    Arc<MemoryService>,
    Arc<InMemoryImportStore>,
    Arc<InMemoryDocumentStore>,
    Arc<InMemoryProgressionNotifier>,
) {
    let store = Arc::new(InMemoryImportStore::default());
    let documents = Arc::new(InMemoryDocumentStore::default());
    let notifier = Arc::new(InMemoryProgressionNotifier::default());
    let service = Arc::new(ImportService::new(
        store.clone(),
        documents.clone(),
        notifier.clone(),
    ));
    (service, store, documents, notifier)
}

pub(super) fn seeded_recruitment(store: &InMemoryImportStore, steps: &[&str]) -> Recruitment {
    let mut recruitment = Recruitment::new("Backend Engineer");
    for step in steps {
        recruitment.add_step(*step).expect("unique step name");
    }
    store
        .insert_recruitment(recruitment.clone())
        .expect("insert recruitment");
    recruitment
}

pub(super) fn roster_csv(rows: &[(&str, &str, &str)]) -> String {
    let mut csv = String::from("Full Name,Email,Phone\n");
    for (name, email, phone) in rows {
        csv.push_str(&format!("{name},{email},{phone}\n"));
    }
    csv
}

/// Push one request through a dedicated worker and wait for it to finish.
pub(super) async fn run_import(store: Arc<InMemoryImportStore>, session_id: ImportSessionId, csv: &str) {
    let (queue, receiver) = ImportQueue::bounded(4);
    let worker = ImportWorker::new(
        store,
        Arc::new(CsvRosterReader::default()),
        receiver,
        CancellationToken::new(),
    );
    queue
        .submit(ImportRequest {
            session_id,
            roster_csv: csv.as_bytes().to_vec(),
        })
        .await
        .expect("queue accepts while the receiver lives");
    drop(queue);
    worker.run().await;
}

pub(super) fn test_router(service: Arc<MemoryService>) -> (Router, mpsc::Receiver<ImportRequest>) {
    let (queue, receiver) = ImportQueue::bounded(4);
    let router = import_router(service, queue, CancellationToken::new());
    (router, receiver)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) struct UnavailableImportStore;

impl ImportStore for UnavailableImportStore {
    fn insert_recruitment(&self, _recruitment: Recruitment) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn fetch_recruitment(&self, _id: &RecruitmentId) -> Result<Option<Recruitment>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn update_recruitment(&self, _recruitment: Recruitment) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn insert_session(&self, _session: ImportSession) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn fetch_session(&self, _id: &ImportSessionId) -> Result<Option<ImportSession>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn update_session(&self, _session: ImportSession) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn list_candidates(&self, _recruitment_id: &RecruitmentId) -> Result<Vec<Candidate>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn fetch_candidate(&self, _id: &CandidateId) -> Result<Option<Candidate>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn insert_candidate(&self, _candidate: Candidate) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn update_candidate(&self, _candidate: Candidate) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn commit_import(&self, _commit: ImportCommit) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }
}
