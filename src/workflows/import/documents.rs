use serde::Serialize;

use crate::workflows::recruitment::{CandidateId, DocumentId, ImportSessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DocumentMatchStatus {
    Pending,
    AutoMatched,
    Unmatched,
    ManuallyAssigned,
}

impl DocumentMatchStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentMatchStatus::Pending => "pending",
            DocumentMatchStatus::AutoMatched => "auto_matched",
            DocumentMatchStatus::Unmatched => "unmatched",
            DocumentMatchStatus::ManuallyAssigned => "manually_assigned",
        }
    }
}

/// One per-candidate PDF carved out of an uploaded bundle. The extracted
/// name and page range come from the bundle's bookmarks; the candidate link
/// is filled in by auto-matching or by a reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportDocument {
    pub id: DocumentId,
    pub session_id: ImportSessionId,
    pub candidate_id: Option<CandidateId>,
    pub extracted_name: String,
    pub extracted_identifier: Option<String>,
    pub file_name: String,
    pub storage_key: String,
    pub first_page: u32,
    pub last_page: u32,
    pub status: DocumentMatchStatus,
}

impl ImportDocument {
    pub fn new(
        session_id: ImportSessionId,
        extracted_name: String,
        extracted_identifier: Option<String>,
        file_name: String,
        storage_key: String,
        first_page: u32,
        last_page: u32,
    ) -> Self {
        Self {
            id: DocumentId::generate(),
            session_id,
            candidate_id: None,
            extracted_name,
            extracted_identifier,
            file_name,
            storage_key,
            first_page,
            last_page,
            status: DocumentMatchStatus::Pending,
        }
    }

    pub fn mark_auto_matched(&mut self, candidate_id: CandidateId) {
        self.candidate_id = Some(candidate_id);
        self.status = DocumentMatchStatus::AutoMatched;
    }

    pub fn mark_unmatched(&mut self) {
        self.candidate_id = None;
        self.status = DocumentMatchStatus::Unmatched;
    }

    /// Reviewer link. Reassignment is allowed; the status records that a
    /// human made the call regardless of what automation concluded before.
    pub fn assign_candidate(&mut self, candidate_id: CandidateId) {
        self.candidate_id = Some(candidate_id);
        self.status = DocumentMatchStatus::ManuallyAssigned;
    }
}
