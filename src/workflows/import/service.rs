use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::workflows::recruitment::{
    Candidate, CandidateDocument, CandidateId, DocumentId, ImportSessionId, OutcomeStatus,
    RecruitmentId, UserId, WorkflowError, WorkflowStepId,
};

use super::bundle::{self, BundleSplitError, SplitFailure};
use super::documents::ImportDocument;
use super::matching::{match_document, DocumentMatch};
use super::repository::{
    DocumentStore, DocumentStoreError, ImportStore, NotifyError, ProgressionNotifier,
    ProgressionUpdate, StoreError,
};
use super::session::{
    ImportSession, RowResult, SessionError, SessionTallies, SplitProgress,
};

/// Service composing the store, document store, and progression notifier.
/// Owns every interactive operation; the batch pipeline itself lives in the
/// worker.
pub struct ImportService<S, D, N> {
    store: Arc<S>,
    documents: Arc<D>,
    notifier: Arc<N>,
}

impl<S, D, N> ImportService<S, D, N>
where
    S: ImportStore + 'static,
    D: DocumentStore + 'static,
    N: ProgressionNotifier + 'static,
{
    pub fn new(store: Arc<S>, documents: Arc<D>, notifier: Arc<N>) -> Self {
        Self {
            store,
            documents,
            notifier,
        }
    }

    /// Open a new import session in `Processing`. The caller hands the
    /// session to the queue afterwards; a session is never enqueued before it
    /// is visible in the store.
    pub fn start_session(
        &self,
        recruitment_id: RecruitmentId,
        file_name: String,
        requested_by: UserId,
    ) -> Result<ImportSession, ImportServiceError> {
        self.store
            .fetch_recruitment(&recruitment_id)?
            .ok_or(StoreError::NotFound)?;
        let session = ImportSession::new(recruitment_id, file_name, requested_by, Utc::now());
        self.store.insert_session(session.clone())?;
        Ok(session)
    }

    /// Settle a session as failed outside the worker, e.g. when it could not
    /// be enqueued.
    pub fn fail_session(
        &self,
        session_id: &ImportSessionId,
        reason: &str,
    ) -> Result<(), ImportServiceError> {
        let mut session = self
            .store
            .fetch_session(session_id)?
            .ok_or(StoreError::NotFound)?;
        session.mark_failed(reason, Utc::now())?;
        self.store.update_session(session)?;
        Ok(())
    }

    /// Read model for one session, rows and documents included.
    pub fn session_view(
        &self,
        session_id: &ImportSessionId,
    ) -> Result<SessionView, ImportServiceError> {
        let session = self
            .store
            .fetch_session(session_id)?
            .ok_or(StoreError::NotFound)?;
        let documents = self.documents.list_documents(session_id)?;
        Ok(SessionView::build(&session, &documents))
    }

    /// Accept a flagged row's low-confidence match and apply the row to the
    /// matched candidate.
    pub fn confirm_match(
        &self,
        session_id: &ImportSessionId,
        row_number: u32,
    ) -> Result<SessionView, ImportServiceError> {
        let mut session = self
            .store
            .fetch_session(session_id)?
            .ok_or(StoreError::NotFound)?;
        let (candidate_id, row) = {
            let resolved = session.confirm_match(row_number)?;
            (resolved.candidate_id, resolved.row.clone())
        };
        let candidate_id =
            candidate_id.ok_or(ImportServiceError::RowWithoutCandidate { row_number })?;

        let mut candidate = self
            .store
            .fetch_candidate(&candidate_id)?
            .ok_or(StoreError::NotFound)?;
        candidate.update_profile(
            &row.full_name,
            row.phone.as_deref(),
            row.location.as_deref(),
            row.applied_on,
        );
        self.store.update_candidate(candidate)?;

        let documents = self.documents.list_documents(session_id)?;
        let view = SessionView::build(&session, &documents);
        self.store.update_session(session)?;
        Ok(view)
    }

    /// Turn down a flagged row's match and create a fresh candidate from the
    /// row snapshot instead.
    pub fn reject_match(
        &self,
        session_id: &ImportSessionId,
        row_number: u32,
        reviewed_by: UserId,
    ) -> Result<SessionView, ImportServiceError> {
        let mut session = self
            .store
            .fetch_session(session_id)?
            .ok_or(StoreError::NotFound)?;
        let row = session.reject_match(row_number)?.row.clone();
        let recruitment = self
            .store
            .fetch_recruitment(&session.recruitment_id)?
            .ok_or(StoreError::NotFound)?;

        let mut candidate = Candidate::new(
            session.recruitment_id,
            row.full_name.clone(),
            row.email.clone(),
        );
        candidate.update_profile(
            &row.full_name,
            row.phone.as_deref(),
            row.location.as_deref(),
            row.applied_on,
        );
        if let Some(first) = recruitment.first_step() {
            candidate.assign_first_step(first, reviewed_by, Utc::now());
        }
        self.store.insert_candidate(candidate)?;

        let documents = self.documents.list_documents(session_id)?;
        let view = SessionView::build(&session, &documents);
        self.store.update_session(session)?;
        Ok(view)
    }

    /// Score a candidate at their current workflow step and dispatch any
    /// progression notifications after the candidate is persisted.
    pub fn record_outcome(
        &self,
        recruitment_id: RecruitmentId,
        command: RecordOutcomeCommand,
    ) -> Result<CandidateView, ImportServiceError> {
        let recruitment = self
            .store
            .fetch_recruitment(&recruitment_id)?
            .ok_or(StoreError::NotFound)?;
        let mut candidate = self
            .store
            .fetch_candidate(&command.candidate_id)?
            .ok_or(StoreError::NotFound)?;
        if candidate.recruitment_id != recruitment.id {
            return Err(ImportServiceError::ForeignCandidate);
        }

        candidate.record_outcome(
            command.step_id,
            command.status,
            command.recorded_by,
            command.reason,
            recruitment.ordered_steps(),
            Utc::now(),
        )?;
        let events = candidate.take_events();
        let view = CandidateView::build(&candidate);
        self.store.update_candidate(candidate)?;

        if !events.is_empty() {
            self.notifier.publish(ProgressionUpdate {
                recruitment_id: recruitment.id,
                candidate_id: command.candidate_id,
                events,
            })?;
        }
        Ok(view)
    }

    /// Split an uploaded bundle along its bookmarks, store every
    /// sub-document, and auto-match each one against the session's
    /// candidates.
    pub fn split_bundle(
        &self,
        session_id: &ImportSessionId,
        bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<BundleSplitReport, ImportServiceError> {
        let mut session = self
            .store
            .fetch_session(session_id)?
            .ok_or(StoreError::NotFound)?;
        session.ensure_not_failed()?;
        let candidates = self.store.list_candidates(&session.recruitment_id)?;

        let mut last_progress = None;
        let outcome = bundle::split_bundle(bytes, cancel, |update| {
            tracing::debug!(
                completed = update.completed,
                total = update.total,
                name = %update.current_name,
                "bundle entry processed"
            );
            last_progress = Some((update.completed, update.total));
        })?;

        let mut views = Vec::with_capacity(outcome.entries.len());
        let mut auto_matched = 0u32;
        let mut unmatched = 0u32;
        for entry in outcome.entries {
            let file_name = entry_file_name(&entry.name);
            let storage_key = format!(
                "imports/{}/{}-{}",
                session.id, entry.first_page, file_name
            );
            let mut document = ImportDocument::new(
                session.id,
                entry.name.clone(),
                entry.external_id.clone(),
                file_name,
                storage_key.clone(),
                entry.first_page,
                entry.last_page,
            );
            match match_document(&entry.name, &candidates) {
                DocumentMatch::Auto(candidate_id) => {
                    document.mark_auto_matched(candidate_id);
                    auto_matched += 1;
                    if let Some(mut candidate) = self.store.fetch_candidate(&candidate_id)? {
                        candidate.attach_document(CandidateDocument {
                            id: document.id,
                            name: document.extracted_name.clone(),
                            storage_key: storage_key.clone(),
                        });
                        self.store.update_candidate(candidate)?;
                    }
                }
                DocumentMatch::Unmatched => {
                    document.mark_unmatched();
                    unmatched += 1;
                }
            }
            self.documents.put_file(&storage_key, entry.pdf)?;
            self.documents.insert_document(document.clone())?;
            views.push(DocumentView::build(&document));
        }

        for failure in &outcome.failures {
            tracing::warn!(
                name = %failure.name,
                page = failure.page,
                detail = %failure.detail,
                "bundle entry failed"
            );
        }

        if let Some((completed, total)) = last_progress {
            session.record_split_progress(SplitProgress { completed, total })?;
        }
        self.store.update_session(session)?;

        Ok(BundleSplitReport {
            page_count: outcome.page_count,
            auto_matched,
            unmatched,
            documents: views,
            failures: outcome
                .failures
                .iter()
                .map(SplitFailureView::build)
                .collect(),
        })
    }

    /// Point a split document at a candidate by hand. Reassignment detaches
    /// the document from the previous candidate first.
    pub fn assign_document(
        &self,
        document_id: &DocumentId,
        candidate_id: &CandidateId,
    ) -> Result<DocumentView, ImportServiceError> {
        let mut document = self
            .documents
            .fetch_document(document_id)?
            .ok_or(DocumentStoreError::NotFound)?;
        let session = self
            .store
            .fetch_session(&document.session_id)?
            .ok_or(StoreError::NotFound)?;
        session.ensure_not_failed()?;

        let mut candidate = self
            .store
            .fetch_candidate(candidate_id)?
            .ok_or(StoreError::NotFound)?;
        if candidate.recruitment_id != session.recruitment_id {
            return Err(ImportServiceError::ForeignCandidate);
        }

        if let Some(previous) = document.candidate_id {
            if previous != *candidate_id {
                if let Some(mut former) = self.store.fetch_candidate(&previous)? {
                    former.detach_document(document.id);
                    self.store.update_candidate(former)?;
                }
            }
        }

        document.assign_candidate(*candidate_id);
        candidate.attach_document(CandidateDocument {
            id: document.id,
            name: document.extracted_name.clone(),
            storage_key: document.storage_key.clone(),
        });
        self.store.update_candidate(candidate)?;
        self.documents.update_document(document.clone())?;
        Ok(DocumentView::build(&document))
    }
}

pub(crate) fn entry_file_name(name: &str) -> String {
    let mapped: String = name
        .to_lowercase()
        .chars()
        .map(|ch| if ch.is_alphanumeric() { ch } else { '-' })
        .collect();
    let slug = mapped
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "document.pdf".to_string()
    } else {
        format!("{slug}.pdf")
    }
}

/// Payload for the interactive record-outcome operation.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordOutcomeCommand {
    pub candidate_id: CandidateId,
    pub step_id: WorkflowStepId,
    pub status: OutcomeStatus,
    #[serde(default)]
    pub reason: Option<String>,
    pub recorded_by: UserId,
}

/// Sanitized representation of a session exposed to API consumers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: ImportSessionId,
    pub recruitment_id: RecruitmentId,
    pub file_name: String,
    pub status: &'static str,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub tallies: SessionTallies,
    pub total_rows: u32,
    pub unresolved_flags: u32,
    pub rows: Vec<RowResultView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_progress: Option<SplitProgress>,
    pub documents: Vec<DocumentView>,
}

impl SessionView {
    fn build(session: &ImportSession, documents: &[ImportDocument]) -> Self {
        let tallies = session.tallies();
        Self {
            session_id: session.id,
            recruitment_id: session.recruitment_id,
            file_name: session.file_name.clone(),
            status: session.status().label(),
            started_at: session.started_at,
            finished_at: session.finished_at(),
            failure_reason: session.failure_reason().map(str::to_string),
            tallies,
            total_rows: tallies.total(),
            unresolved_flags: session.unresolved_flags() as u32,
            rows: session.rows().iter().map(RowResultView::build).collect(),
            split_progress: session.split_progress(),
            documents: documents.iter().map(DocumentView::build).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RowResultView {
    pub row_number: u32,
    pub full_name: String,
    pub email: String,
    pub action: &'static str,
    pub confidence: &'static str,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<CandidateId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub resolution: &'static str,
}

impl RowResultView {
    fn build(row: &RowResult) -> Self {
        Self {
            row_number: row.row_number(),
            full_name: row.row.full_name.clone(),
            email: row.row.email.clone(),
            action: row.action.label(),
            confidence: row.confidence.label(),
            method: row.method.label(),
            candidate_id: row.candidate_id,
            error: row.error.clone(),
            resolution: row.resolution().label(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    pub document_id: DocumentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<CandidateId>,
    pub extracted_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_identifier: Option<String>,
    pub file_name: String,
    pub first_page: u32,
    pub last_page: u32,
    pub status: &'static str,
}

impl DocumentView {
    fn build(document: &ImportDocument) -> Self {
        Self {
            document_id: document.id,
            candidate_id: document.candidate_id,
            extracted_name: document.extracted_name.clone(),
            extracted_identifier: document.extracted_identifier.clone(),
            file_name: document.file_name.clone(),
            first_page: document.first_page,
            last_page: document.last_page,
            status: document.status.label(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SplitFailureView {
    pub name: String,
    pub page: u32,
    pub detail: String,
}

impl SplitFailureView {
    fn build(failure: &SplitFailure) -> Self {
        Self {
            name: failure.name.clone(),
            page: failure.page,
            detail: failure.detail.clone(),
        }
    }
}

/// Outcome of one bundle split, returned to the uploader.
#[derive(Debug, Clone, Serialize)]
pub struct BundleSplitReport {
    pub page_count: u32,
    pub auto_matched: u32,
    pub unmatched: u32,
    pub documents: Vec<DocumentView>,
    pub failures: Vec<SplitFailureView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateView {
    pub candidate_id: CandidateId,
    pub recruitment_id: RecruitmentId,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step_id: Option<WorkflowStepId>,
    pub is_completed: bool,
    pub outcomes: Vec<OutcomeView>,
}

impl CandidateView {
    fn build(candidate: &Candidate) -> Self {
        Self {
            candidate_id: candidate.id,
            recruitment_id: candidate.recruitment_id,
            full_name: candidate.full_name.clone(),
            email: candidate.email.clone(),
            current_step_id: candidate.current_step_id(),
            is_completed: candidate.is_completed(),
            outcomes: candidate
                .outcomes()
                .iter()
                .map(|outcome| OutcomeView {
                    step_id: outcome.step_id,
                    status: outcome.status.label(),
                    reason: outcome.reason.clone(),
                    recorded_at: outcome.recorded_at,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutcomeView {
    pub step_id: WorkflowStepId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Error raised by the import service.
#[derive(Debug, thiserror::Error)]
pub enum ImportServiceError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Documents(#[from] DocumentStoreError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error(transparent)]
    Split(#[from] BundleSplitError),
    #[error("candidate does not belong to this recruitment")]
    ForeignCandidate,
    #[error("row {row_number} does not reference a candidate")]
    RowWithoutCandidate { row_number: u32 },
}
