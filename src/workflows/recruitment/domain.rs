use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::candidate::Candidate;

/// Identifier wrapper for a recruitment (one tracked job opening).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecruitmentId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowStepId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportSessionId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl RecruitmentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl CandidateId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl WorkflowStepId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl ImportSessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl UserId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl DocumentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RecruitmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for WorkflowStepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for ImportSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// High level status of a recruitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecruitmentStatus {
    Active,
    Closed,
}

impl RecruitmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RecruitmentStatus::Active => "active",
            RecruitmentStatus::Closed => "closed",
        }
    }
}

/// One ordered stage in a recruitment's candidate evaluation sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: WorkflowStepId,
    pub name: String,
    pub order: u32,
}

/// Status recorded against a candidate at one workflow step. `NotStarted`
/// denotes the absence of a result and is never accepted as a recorded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    NotStarted,
    Pass,
    Fail,
    Hold,
}

impl OutcomeStatus {
    pub const fn label(self) -> &'static str {
        match self {
            OutcomeStatus::NotStarted => "not_started",
            OutcomeStatus::Pass => "pass",
            OutcomeStatus::Fail => "fail",
            OutcomeStatus::Hold => "hold",
        }
    }
}

/// A candidate's recorded result at one workflow step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub step_id: WorkflowStepId,
    pub status: OutcomeStatus,
    pub reason: Option<String>,
    pub recorded_by: UserId,
    pub recorded_at: DateTime<Utc>,
}

/// Errors raised by the workflow step chain and candidate progression rules.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("candidate is not yet assigned to a workflow step")]
    StepNotAssigned,
    #[error("candidate occupies step {current}, cannot record an outcome for step {attempted}")]
    StepMismatch {
        current: WorkflowStepId,
        attempted: WorkflowStepId,
    },
    #[error("candidate already completed the workflow")]
    AlreadyCompleted,
    #[error("an outcome status of not_started denotes absence and cannot be recorded")]
    OutcomeNotRecordable,
    #[error("workflow step {0} is not part of this recruitment")]
    StepNotFound(WorkflowStepId),
    #[error("step order must be a permutation of the existing chain")]
    StepOrderInvalid,
    #[error("step {0} has recorded outcomes and cannot be removed")]
    StepHasRecordedOutcomes(WorkflowStepId),
    #[error("a step named '{0}' already exists on this recruitment")]
    DuplicateStepName(String),
}

/// One job-opening tracking instance. Owns the ordered workflow step chain;
/// steps are only mutable through the methods below so the contiguous 1..N
/// order invariant cannot be broken from outside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recruitment {
    pub id: RecruitmentId,
    pub title: String,
    pub status: RecruitmentStatus,
    steps: Vec<WorkflowStep>,
    members: Vec<UserId>,
}

impl Recruitment {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: RecruitmentId::generate(),
            title: title.into(),
            status: RecruitmentStatus::Active,
            steps: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Append a step at the end of the chain.
    pub fn add_step(&mut self, name: impl Into<String>) -> Result<WorkflowStepId, WorkflowError> {
        let name = name.into();
        let trimmed = name.trim();
        if self
            .steps
            .iter()
            .any(|step| step.name.eq_ignore_ascii_case(trimmed))
        {
            return Err(WorkflowError::DuplicateStepName(trimmed.to_string()));
        }

        let step = WorkflowStep {
            id: WorkflowStepId::generate(),
            name: trimmed.to_string(),
            order: self.steps.len() as u32 + 1,
        };
        let id = step.id;
        self.steps.push(step);
        Ok(id)
    }

    pub fn rename_step(
        &mut self,
        id: WorkflowStepId,
        name: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        let name = name.into();
        let trimmed = name.trim();
        if self
            .steps
            .iter()
            .any(|step| step.id != id && step.name.eq_ignore_ascii_case(trimmed))
        {
            return Err(WorkflowError::DuplicateStepName(trimmed.to_string()));
        }

        let step = self
            .steps
            .iter_mut()
            .find(|step| step.id == id)
            .ok_or(WorkflowError::StepNotFound(id))?;
        step.name = trimmed.to_string();
        Ok(())
    }

    /// Remove a step and renumber the remainder contiguously. Refused while
    /// any candidate occupies the step or holds a recorded outcome for it.
    pub fn remove_step(
        &mut self,
        id: WorkflowStepId,
        candidates: &[Candidate],
    ) -> Result<(), WorkflowError> {
        if !self.steps.iter().any(|step| step.id == id) {
            return Err(WorkflowError::StepNotFound(id));
        }

        let in_use = candidates.iter().any(|candidate| {
            candidate.current_step_id() == Some(id)
                || candidate
                    .outcome_for(id)
                    .is_some_and(|outcome| outcome.status != OutcomeStatus::NotStarted)
        });
        if in_use {
            return Err(WorkflowError::StepHasRecordedOutcomes(id));
        }

        self.steps.retain(|step| step.id != id);
        for (index, step) in self.steps.iter_mut().enumerate() {
            step.order = index as u32 + 1;
        }
        Ok(())
    }

    /// Reorder the chain. `ids` must be exactly a permutation of the current
    /// step ids; anything else is rejected without touching the chain.
    pub fn reorder_steps(&mut self, ids: &[WorkflowStepId]) -> Result<(), WorkflowError> {
        if ids.len() != self.steps.len() {
            return Err(WorkflowError::StepOrderInvalid);
        }
        let mut seen = Vec::with_capacity(ids.len());
        for id in ids {
            if seen.contains(id) || !self.steps.iter().any(|step| step.id == *id) {
                return Err(WorkflowError::StepOrderInvalid);
            }
            seen.push(*id);
        }

        let mut reordered = Vec::with_capacity(self.steps.len());
        for (index, id) in ids.iter().enumerate() {
            if let Some(mut step) = self.steps.iter().find(|step| step.id == *id).cloned() {
                step.order = index as u32 + 1;
                reordered.push(step);
            }
        }
        self.steps = reordered;
        Ok(())
    }

    /// Steps in ascending chain order.
    pub fn ordered_steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    pub fn first_step(&self) -> Option<&WorkflowStep> {
        self.steps.first()
    }

    pub fn last_step(&self) -> Option<&WorkflowStep> {
        self.steps.last()
    }

    pub fn step(&self, id: WorkflowStepId) -> Option<&WorkflowStep> {
        self.steps.iter().find(|step| step.id == id)
    }

    pub fn add_member(&mut self, user: UserId) {
        if !self.members.contains(&user) {
            self.members.push(user);
        }
    }

    pub fn members(&self) -> &[UserId] {
        &self.members
    }
}
