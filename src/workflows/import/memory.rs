use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::workflows::recruitment::{
    Candidate, CandidateId, DocumentId, ImportSessionId, Recruitment, RecruitmentId,
};

use super::documents::ImportDocument;
use super::repository::{
    DocumentStore, DocumentStoreError, ImportCommit, ImportStore, NotifyError,
    ProgressionNotifier, ProgressionUpdate, StoreError,
};
use super::session::ImportSession;

/// Mutex-backed store for local serving and tests. Candidates live in a
/// `Vec` because listing order must follow insertion order.
#[derive(Default, Clone)]
pub struct InMemoryImportStore {
    recruitments: Arc<Mutex<HashMap<RecruitmentId, Recruitment>>>,
    sessions: Arc<Mutex<HashMap<ImportSessionId, ImportSession>>>,
    candidates: Arc<Mutex<Vec<Candidate>>>,
}

impl InMemoryImportStore {
    pub fn sessions(&self) -> Vec<ImportSession> {
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .values()
            .cloned()
            .collect()
    }
}

impl ImportStore for InMemoryImportStore {
    fn insert_recruitment(&self, recruitment: Recruitment) -> Result<(), StoreError> {
        let mut guard = self.recruitments.lock().expect("recruitment mutex poisoned");
        if guard.contains_key(&recruitment.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(recruitment.id, recruitment);
        Ok(())
    }

    fn fetch_recruitment(&self, id: &RecruitmentId) -> Result<Option<Recruitment>, StoreError> {
        let guard = self.recruitments.lock().expect("recruitment mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_recruitment(&self, recruitment: Recruitment) -> Result<(), StoreError> {
        let mut guard = self.recruitments.lock().expect("recruitment mutex poisoned");
        if guard.contains_key(&recruitment.id) {
            guard.insert(recruitment.id, recruitment);
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    fn insert_session(&self, session: ImportSession) -> Result<(), StoreError> {
        let mut guard = self.sessions.lock().expect("session mutex poisoned");
        if guard.contains_key(&session.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(session.id, session);
        Ok(())
    }

    fn fetch_session(&self, id: &ImportSessionId) -> Result<Option<ImportSession>, StoreError> {
        let guard = self.sessions.lock().expect("session mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_session(&self, session: ImportSession) -> Result<(), StoreError> {
        let mut guard = self.sessions.lock().expect("session mutex poisoned");
        if guard.contains_key(&session.id) {
            guard.insert(session.id, session);
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    fn list_candidates(
        &self,
        recruitment_id: &RecruitmentId,
    ) -> Result<Vec<Candidate>, StoreError> {
        let guard = self.candidates.lock().expect("candidate mutex poisoned");
        Ok(guard
            .iter()
            .filter(|candidate| candidate.recruitment_id == *recruitment_id)
            .cloned()
            .collect())
    }

    fn fetch_candidate(&self, id: &CandidateId) -> Result<Option<Candidate>, StoreError> {
        let guard = self.candidates.lock().expect("candidate mutex poisoned");
        Ok(guard.iter().find(|candidate| candidate.id == *id).cloned())
    }

    fn insert_candidate(&self, candidate: Candidate) -> Result<(), StoreError> {
        let mut guard = self.candidates.lock().expect("candidate mutex poisoned");
        if guard.iter().any(|existing| existing.id == candidate.id) {
            return Err(StoreError::Conflict);
        }
        guard.push(candidate);
        Ok(())
    }

    fn update_candidate(&self, candidate: Candidate) -> Result<(), StoreError> {
        let mut guard = self.candidates.lock().expect("candidate mutex poisoned");
        match guard.iter().position(|existing| existing.id == candidate.id) {
            Some(index) => {
                guard[index] = candidate;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn commit_import(&self, commit: ImportCommit) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        let mut candidates = self.candidates.lock().expect("candidate mutex poisoned");
        if !sessions.contains_key(&commit.session.id) {
            return Err(StoreError::NotFound);
        }
        sessions.insert(commit.session.id, commit.session);
        for candidate in commit.candidates {
            match candidates
                .iter()
                .position(|existing| existing.id == candidate.id)
            {
                Some(index) => candidates[index] = candidate,
                None => candidates.push(candidate),
            }
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryDocumentStore {
    documents: Arc<Mutex<Vec<ImportDocument>>>,
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl DocumentStore for InMemoryDocumentStore {
    fn insert_document(&self, document: ImportDocument) -> Result<(), DocumentStoreError> {
        let mut guard = self.documents.lock().expect("document mutex poisoned");
        if guard.iter().any(|existing| existing.id == document.id) {
            return Err(DocumentStoreError::Conflict);
        }
        guard.push(document);
        Ok(())
    }

    fn fetch_document(&self, id: &DocumentId) -> Result<Option<ImportDocument>, DocumentStoreError> {
        let guard = self.documents.lock().expect("document mutex poisoned");
        Ok(guard.iter().find(|document| document.id == *id).cloned())
    }

    fn update_document(&self, document: ImportDocument) -> Result<(), DocumentStoreError> {
        let mut guard = self.documents.lock().expect("document mutex poisoned");
        match guard.iter().position(|existing| existing.id == document.id) {
            Some(index) => {
                guard[index] = document;
                Ok(())
            }
            None => Err(DocumentStoreError::NotFound),
        }
    }

    fn list_documents(
        &self,
        session_id: &ImportSessionId,
    ) -> Result<Vec<ImportDocument>, DocumentStoreError> {
        let guard = self.documents.lock().expect("document mutex poisoned");
        Ok(guard
            .iter()
            .filter(|document| document.session_id == *session_id)
            .cloned()
            .collect())
    }

    fn put_file(&self, storage_key: &str, bytes: Vec<u8>) -> Result<(), DocumentStoreError> {
        let mut guard = self.files.lock().expect("file mutex poisoned");
        guard.insert(storage_key.to_string(), bytes);
        Ok(())
    }
}

impl InMemoryDocumentStore {
    pub fn file(&self, storage_key: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .expect("file mutex poisoned")
            .get(storage_key)
            .cloned()
    }
}

#[derive(Default, Clone)]
pub struct InMemoryProgressionNotifier {
    updates: Arc<Mutex<Vec<ProgressionUpdate>>>,
}

impl ProgressionNotifier for InMemoryProgressionNotifier {
    fn publish(&self, update: ProgressionUpdate) -> Result<(), NotifyError> {
        let mut guard = self.updates.lock().expect("notifier mutex poisoned");
        guard.push(update);
        Ok(())
    }
}

impl InMemoryProgressionNotifier {
    pub fn updates(&self) -> Vec<ProgressionUpdate> {
        self.updates.lock().expect("notifier mutex poisoned").clone()
    }
}
