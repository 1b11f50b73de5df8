use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::workflows::recruitment::{
    Candidate, CandidateId, ImportSessionId, RecruitmentId, UserId, WorkflowStep,
};

use super::matching::{classify_row, RosterMatch};
use super::repository::{ImportCommit, ImportStore, StoreError};
use super::roster::{RosterReader, RosterRow};
use super::session::{ImportSession, RowAction, RowResult, SessionError, SessionTallies};

/// One queued roster import. Redelivery is possible; the worker treats a
/// settled session as already handled.
#[derive(Debug)]
pub struct ImportRequest {
    pub session_id: ImportSessionId,
    pub roster_csv: Vec<u8>,
}

/// Bounded handle for submitting imports to the worker.
#[derive(Clone)]
pub struct ImportQueue {
    sender: mpsc::Sender<ImportRequest>,
}

impl ImportQueue {
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<ImportRequest>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    pub async fn submit(&self, request: ImportRequest) -> Result<(), QueueClosed> {
        self.sender.send(request).await.map_err(|_| QueueClosed)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("import queue is closed")]
pub struct QueueClosed;

/// Single consumer of the import queue. Requests are processed strictly one
/// at a time and rows strictly in file order; later rows must see candidates
/// created by earlier rows of the same batch.
pub struct ImportWorker<S, R> {
    store: Arc<S>,
    reader: Arc<R>,
    receiver: mpsc::Receiver<ImportRequest>,
    cancel: CancellationToken,
}

enum BatchOutcome {
    Completed { tallies: SessionTallies },
    Failed { reason: String },
}

#[derive(Debug, thiserror::Error)]
enum BatchError {
    #[error("import session not found")]
    SessionMissing,
    #[error("import session already settled")]
    AlreadySettled,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-row failure, isolated into an `Errored` ledger entry.
#[derive(Debug, thiserror::Error)]
enum RowFailure {
    #[error("matched candidate disappeared from the batch pool")]
    StaleMatch,
}

impl<S, R> ImportWorker<S, R>
where
    S: ImportStore + 'static,
    R: RosterReader + 'static,
{
    pub fn new(
        store: Arc<S>,
        reader: Arc<R>,
        receiver: mpsc::Receiver<ImportRequest>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            reader,
            receiver,
            cancel,
        }
    }

    /// Runs until the queue closes or shutdown is signalled. The cancel check
    /// sits at the top of the loop, so an in-flight batch always finishes.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::info!("import worker stopping");
                    break;
                }
                request = self.receiver.recv() => {
                    match request {
                        Some(request) => self.process(request),
                        None => {
                            tracing::info!("import queue closed, worker exiting");
                            break;
                        }
                    }
                }
            }
        }
    }

    fn process(&self, request: ImportRequest) {
        let session_id = request.session_id;
        match self.run_batch(request) {
            Ok(BatchOutcome::Completed { tallies }) => {
                tracing::info!(
                    session_id = %session_id,
                    created = tallies.created,
                    updated = tallies.updated,
                    flagged = tallies.flagged,
                    errored = tallies.errored,
                    "import session completed"
                );
            }
            Ok(BatchOutcome::Failed { reason }) => {
                tracing::warn!(session_id = %session_id, reason = %reason, "import session failed");
            }
            Err(BatchError::SessionMissing) => {
                tracing::error!(
                    session_id = %session_id,
                    "import request references no stored session, dropping it"
                );
            }
            Err(BatchError::AlreadySettled) => {
                tracing::warn!(
                    session_id = %session_id,
                    "import session already settled, dropping redelivered request"
                );
            }
            Err(error) => {
                tracing::error!(session_id = %session_id, error = %error, "import batch aborted");
            }
        }
    }

    fn run_batch(&self, request: ImportRequest) -> Result<BatchOutcome, BatchError> {
        let mut session = self
            .store
            .fetch_session(&request.session_id)?
            .ok_or(BatchError::SessionMissing)?;
        if session.status().is_terminal() {
            return Err(BatchError::AlreadySettled);
        }

        let rows = match self.reader.parse(&request.roster_csv) {
            Ok(rows) => rows,
            Err(error) => return self.settle_failed(session, error.to_string()),
        };

        let recruitment = match self.store.fetch_recruitment(&session.recruitment_id)? {
            Some(recruitment) => recruitment,
            None => {
                return self.settle_failed(session, "recruitment no longer exists".to_string())
            }
        };
        let first_step = recruitment.first_step().cloned();

        let mut candidates = self.store.list_candidates(&session.recruitment_id)?;
        let mut changed: HashSet<CandidateId> = HashSet::new();
        let now = Utc::now();

        for row in rows {
            let result = match apply_row(
                &row,
                &mut candidates,
                session.recruitment_id,
                first_step.as_ref(),
                session.requested_by,
                now,
            ) {
                Ok(result) => result,
                Err(failure) => RowResult::errored(row, failure.to_string()),
            };
            if matches!(result.action, RowAction::Created | RowAction::Updated) {
                if let Some(candidate_id) = result.candidate_id {
                    changed.insert(candidate_id);
                }
            }
            session.record_row(result)?;
        }

        session.complete(Utc::now())?;
        let tallies = session.tallies();
        let committed: Vec<Candidate> = candidates
            .into_iter()
            .filter(|candidate| changed.contains(&candidate.id))
            .collect();
        self.store.commit_import(ImportCommit {
            session,
            candidates: committed,
        })?;
        Ok(BatchOutcome::Completed { tallies })
    }

    fn settle_failed(
        &self,
        mut session: ImportSession,
        reason: String,
    ) -> Result<BatchOutcome, BatchError> {
        session.mark_failed(&reason, Utc::now())?;
        self.store.update_session(session)?;
        Ok(BatchOutcome::Failed { reason })
    }
}

/// Classify one roster row against the batch pool and apply its effect.
/// High-confidence matches update in place, unmatched rows create, and
/// low-confidence matches only flag; the pool mutation is what lets later
/// rows of the same file match candidates created moments earlier.
fn apply_row(
    row: &RosterRow,
    candidates: &mut Vec<Candidate>,
    recruitment_id: RecruitmentId,
    first_step: Option<&WorkflowStep>,
    imported_by: UserId,
    now: DateTime<Utc>,
) -> Result<RowResult, RowFailure> {
    match classify_row(row, candidates) {
        RosterMatch::High { candidate_id } => {
            let candidate = candidates
                .iter_mut()
                .find(|candidate| candidate.id == candidate_id)
                .ok_or(RowFailure::StaleMatch)?;
            candidate.update_profile(
                &row.full_name,
                row.phone.as_deref(),
                row.location.as_deref(),
                row.applied_on,
            );
            Ok(RowResult::updated(row.clone(), candidate_id))
        }
        RosterMatch::Low { candidate_id } => Ok(RowResult::flagged(row.clone(), candidate_id)),
        RosterMatch::None => {
            let mut candidate =
                Candidate::new(recruitment_id, row.full_name.clone(), row.email.clone());
            candidate.update_profile(
                &row.full_name,
                row.phone.as_deref(),
                row.location.as_deref(),
                row.applied_on,
            );
            if let Some(step) = first_step {
                candidate.assign_first_step(step, imported_by, now);
            }
            let candidate_id = candidate.id;
            candidates.push(candidate);
            Ok(RowResult::created(row.clone(), candidate_id))
        }
    }
}
