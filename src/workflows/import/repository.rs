use serde::Serialize;

use crate::workflows::recruitment::{
    Candidate, CandidateEvent, CandidateId, DocumentId, ImportSessionId, Recruitment,
    RecruitmentId,
};

use super::documents::ImportDocument;
use super::session::ImportSession;

/// Everything one finished batch writes in a single step: the settled
/// session plus every candidate it created or changed. Readers never observe
/// a half-applied batch.
#[derive(Debug)]
pub struct ImportCommit {
    pub session: ImportSession,
    pub candidates: Vec<Candidate>,
}

/// Storage abstraction so the pipeline and service can be exercised in
/// isolation.
pub trait ImportStore: Send + Sync {
    fn insert_recruitment(&self, recruitment: Recruitment) -> Result<(), StoreError>;
    fn fetch_recruitment(&self, id: &RecruitmentId) -> Result<Option<Recruitment>, StoreError>;
    fn update_recruitment(&self, recruitment: Recruitment) -> Result<(), StoreError>;

    fn insert_session(&self, session: ImportSession) -> Result<(), StoreError>;
    fn fetch_session(&self, id: &ImportSessionId) -> Result<Option<ImportSession>, StoreError>;
    fn update_session(&self, session: ImportSession) -> Result<(), StoreError>;

    /// Candidates come back in insertion order; matching depends on a stable
    /// scan order.
    fn list_candidates(&self, recruitment_id: &RecruitmentId) -> Result<Vec<Candidate>, StoreError>;
    fn fetch_candidate(&self, id: &CandidateId) -> Result<Option<Candidate>, StoreError>;
    fn insert_candidate(&self, candidate: Candidate) -> Result<(), StoreError>;
    fn update_candidate(&self, candidate: Candidate) -> Result<(), StoreError>;

    /// Applies a finished batch atomically.
    fn commit_import(&self, commit: ImportCommit) -> Result<(), StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage for split documents and their PDF payloads.
pub trait DocumentStore: Send + Sync {
    fn insert_document(&self, document: ImportDocument) -> Result<(), DocumentStoreError>;
    fn fetch_document(&self, id: &DocumentId) -> Result<Option<ImportDocument>, DocumentStoreError>;
    fn update_document(&self, document: ImportDocument) -> Result<(), DocumentStoreError>;
    fn list_documents(
        &self,
        session_id: &ImportSessionId,
    ) -> Result<Vec<ImportDocument>, DocumentStoreError>;
    fn put_file(&self, storage_key: &str, bytes: Vec<u8>) -> Result<(), DocumentStoreError>;
}

/// Document store error enumeration.
#[derive(Debug, thiserror::Error)]
pub enum DocumentStoreError {
    #[error("document already exists")]
    Conflict,
    #[error("document not found")]
    NotFound,
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

/// Trait describing outbound progression hooks (e.g., e-mail or webhook
/// adapters told when a candidate moves).
pub trait ProgressionNotifier: Send + Sync {
    fn publish(&self, update: ProgressionUpdate) -> Result<(), NotifyError>;
}

/// Payload handed to notifier adapters after an outcome is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressionUpdate {
    pub recruitment_id: RecruitmentId,
    pub candidate_id: CandidateId,
    pub events: Vec<CandidateEvent>,
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
