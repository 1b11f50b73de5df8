//! Recruitment aggregate: the ordered workflow step chain and per-candidate
//! progression rules shared by the import pipeline and interactive scoring.

pub mod candidate;
pub mod domain;

pub use candidate::{Candidate, CandidateDocument, CandidateEvent};
pub use domain::{
    CandidateId, DocumentId, ImportSessionId, Outcome, OutcomeStatus, Recruitment, RecruitmentId,
    RecruitmentStatus, UserId, WorkflowError, WorkflowStep, WorkflowStepId,
};
