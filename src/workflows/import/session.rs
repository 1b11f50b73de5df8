use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::workflows::recruitment::{CandidateId, ImportSessionId, RecruitmentId, UserId};

use super::matching::{MatchConfidence, MatchMethod};
use super::roster::RosterRow;

/// Failure reasons are operator-facing and stored verbatim up to this many
/// characters; anything longer is cut, not rejected.
pub const MAX_FAILURE_REASON_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    Processing,
    Completed,
    Failed,
}

impl SessionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SessionStatus::Processing => "processing",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowAction {
    Created,
    Updated,
    Flagged,
    Errored,
}

impl RowAction {
    pub const fn label(self) -> &'static str {
        match self {
            RowAction::Created => "created",
            RowAction::Updated => "updated",
            RowAction::Flagged => "flagged",
            RowAction::Errored => "errored",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchResolution {
    Unresolved,
    Confirmed,
    Rejected,
}

impl MatchResolution {
    pub const fn label(self) -> &'static str {
        match self {
            MatchResolution::Unresolved => "unresolved",
            MatchResolution::Confirmed => "confirmed",
            MatchResolution::Rejected => "rejected",
        }
    }
}

/// Ledger entry for one processed roster row. Flagged entries keep the full
/// row snapshot so a later confirm or reject can still apply it; resolution
/// state is private and moves away from `Unresolved` at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowResult {
    pub row: RosterRow,
    pub action: RowAction,
    pub confidence: MatchConfidence,
    pub method: MatchMethod,
    pub candidate_id: Option<CandidateId>,
    pub error: Option<String>,
    resolution: MatchResolution,
}

impl RowResult {
    pub fn created(row: RosterRow, candidate_id: CandidateId) -> Self {
        Self {
            row,
            action: RowAction::Created,
            confidence: MatchConfidence::None,
            method: MatchMethod::None,
            candidate_id: Some(candidate_id),
            error: None,
            resolution: MatchResolution::Unresolved,
        }
    }

    pub fn updated(row: RosterRow, candidate_id: CandidateId) -> Self {
        Self {
            row,
            action: RowAction::Updated,
            confidence: MatchConfidence::High,
            method: MatchMethod::Email,
            candidate_id: Some(candidate_id),
            error: None,
            resolution: MatchResolution::Unresolved,
        }
    }

    pub fn flagged(row: RosterRow, candidate_id: CandidateId) -> Self {
        Self {
            row,
            action: RowAction::Flagged,
            confidence: MatchConfidence::Low,
            method: MatchMethod::NameAndPhone,
            candidate_id: Some(candidate_id),
            error: None,
            resolution: MatchResolution::Unresolved,
        }
    }

    pub fn errored(row: RosterRow, detail: String) -> Self {
        Self {
            row,
            action: RowAction::Errored,
            confidence: MatchConfidence::None,
            method: MatchMethod::None,
            candidate_id: None,
            error: Some(detail),
            resolution: MatchResolution::Unresolved,
        }
    }

    pub fn row_number(&self) -> u32 {
        self.row.row_number
    }

    pub fn resolution(&self) -> MatchResolution {
        self.resolution
    }
}

/// Row counts per action, always derived from the ledger itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionTallies {
    pub created: u32,
    pub updated: u32,
    pub flagged: u32,
    pub errored: u32,
}

impl SessionTallies {
    pub const fn total(&self) -> u32 {
        self.created + self.updated + self.flagged + self.errored
    }
}

/// Running count of documents carved out of an uploaded bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitProgress {
    pub completed: u32,
    pub total: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("import session has already finished")]
    AlreadyFinished,
    #[error("import session is not completed yet")]
    SessionNotCompleted,
    #[error("import session failed and accepts no further work")]
    SessionFailed,
    #[error("no row {row_number} in this import session")]
    RowNotFound { row_number: u32 },
    #[error("row {row_number} was not flagged for review")]
    RowNotFlagged { row_number: u32 },
    #[error("row {row_number} has already been resolved")]
    RowAlreadyResolved { row_number: u32 },
}

/// One roster upload tracked end to end. Starts in `Processing`, records a
/// ledger entry per row, and settles exactly once into `Completed` or
/// `Failed`. Flagged-row review happens strictly after completion.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSession {
    pub id: ImportSessionId,
    pub recruitment_id: RecruitmentId,
    pub file_name: String,
    pub requested_by: UserId,
    pub started_at: DateTime<Utc>,
    status: SessionStatus,
    finished_at: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
    rows: Vec<RowResult>,
    split_progress: Option<SplitProgress>,
}

impl ImportSession {
    pub fn new(
        recruitment_id: RecruitmentId,
        file_name: String,
        requested_by: UserId,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ImportSessionId::generate(),
            recruitment_id,
            file_name,
            requested_by,
            started_at,
            status: SessionStatus::Processing,
            finished_at: None,
            failure_reason: None,
            rows: Vec::new(),
            split_progress: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn rows(&self) -> &[RowResult] {
        &self.rows
    }

    pub fn row(&self, row_number: u32) -> Option<&RowResult> {
        self.rows.iter().find(|row| row.row_number() == row_number)
    }

    pub fn split_progress(&self) -> Option<SplitProgress> {
        self.split_progress
    }

    pub fn tallies(&self) -> SessionTallies {
        let mut tallies = SessionTallies::default();
        for row in &self.rows {
            match row.action {
                RowAction::Created => tallies.created += 1,
                RowAction::Updated => tallies.updated += 1,
                RowAction::Flagged => tallies.flagged += 1,
                RowAction::Errored => tallies.errored += 1,
            }
        }
        tallies
    }

    pub fn unresolved_flags(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| {
                row.action == RowAction::Flagged && row.resolution == MatchResolution::Unresolved
            })
            .count()
    }

    pub fn record_row(&mut self, result: RowResult) -> Result<(), SessionError> {
        if self.status.is_terminal() {
            return Err(SessionError::AlreadyFinished);
        }
        self.rows.push(result);
        Ok(())
    }

    pub fn complete(&mut self, finished_at: DateTime<Utc>) -> Result<(), SessionError> {
        if self.status.is_terminal() {
            return Err(SessionError::AlreadyFinished);
        }
        self.status = SessionStatus::Completed;
        self.finished_at = Some(finished_at);
        Ok(())
    }

    pub fn mark_failed(
        &mut self,
        reason: &str,
        finished_at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        if self.status.is_terminal() {
            return Err(SessionError::AlreadyFinished);
        }
        self.status = SessionStatus::Failed;
        self.finished_at = Some(finished_at);
        self.failure_reason = Some(reason.chars().take(MAX_FAILURE_REASON_CHARS).collect());
        Ok(())
    }

    /// Document work rides on a session while it processes and after it
    /// completes, but never on a failed one.
    pub fn record_split_progress(&mut self, progress: SplitProgress) -> Result<(), SessionError> {
        self.ensure_not_failed()?;
        self.split_progress = Some(progress);
        Ok(())
    }

    pub fn confirm_match(&mut self, row_number: u32) -> Result<&RowResult, SessionError> {
        self.resolve(row_number, MatchResolution::Confirmed)
    }

    pub fn reject_match(&mut self, row_number: u32) -> Result<&RowResult, SessionError> {
        self.resolve(row_number, MatchResolution::Rejected)
    }

    pub fn ensure_not_failed(&self) -> Result<(), SessionError> {
        if self.status == SessionStatus::Failed {
            return Err(SessionError::SessionFailed);
        }
        Ok(())
    }

    fn resolve(
        &mut self,
        row_number: u32,
        resolution: MatchResolution,
    ) -> Result<&RowResult, SessionError> {
        if self.status != SessionStatus::Completed {
            return Err(SessionError::SessionNotCompleted);
        }
        let index = self
            .rows
            .iter()
            .position(|row| row.row_number() == row_number)
            .ok_or(SessionError::RowNotFound { row_number })?;
        let row = &mut self.rows[index];
        if row.action != RowAction::Flagged {
            return Err(SessionError::RowNotFlagged { row_number });
        }
        if row.resolution != MatchResolution::Unresolved {
            return Err(SessionError::RowAlreadyResolved { row_number });
        }
        row.resolution = resolution;
        Ok(&self.rows[index])
    }
}
