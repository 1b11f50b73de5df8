use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    CandidateId, DocumentId, Outcome, OutcomeStatus, RecruitmentId, UserId, WorkflowError,
    WorkflowStep, WorkflowStepId,
};

/// A document linked to a candidate, by reference into the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDocument {
    pub id: DocumentId,
    pub name: String,
    pub storage_key: String,
}

/// Progression notification accumulated by [`Candidate::record_outcome`].
/// Exactly one is emitted per successful call; the orchestrator drains and
/// dispatches them only after the surrounding commit succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CandidateEvent {
    OutcomeRecorded {
        candidate_id: CandidateId,
        recruitment_id: RecruitmentId,
        step_id: WorkflowStepId,
        status: OutcomeStatus,
        at: DateTime<Utc>,
    },
    StepAdvanced {
        candidate_id: CandidateId,
        recruitment_id: RecruitmentId,
        from: WorkflowStepId,
        to: WorkflowStepId,
        at: DateTime<Utc>,
    },
    Completed {
        candidate_id: CandidateId,
        recruitment_id: RecruitmentId,
        step_id: WorkflowStepId,
        at: DateTime<Utc>,
    },
}

/// A tracked candidate inside one recruitment. Progression state and the
/// outcome history are only mutable through the methods below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub recruitment_id: RecruitmentId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub applied_on: Option<NaiveDate>,
    current_step_id: Option<WorkflowStepId>,
    is_completed: bool,
    outcomes: Vec<Outcome>,
    documents: Vec<CandidateDocument>,
    #[serde(skip)]
    pending_events: Vec<CandidateEvent>,
}

impl Candidate {
    pub fn new(recruitment_id: RecruitmentId, full_name: String, email: String) -> Self {
        Self {
            id: CandidateId::generate(),
            recruitment_id,
            full_name,
            email,
            phone: None,
            location: None,
            applied_on: None,
            current_step_id: None,
            is_completed: false,
            outcomes: Vec::new(),
            documents: Vec::new(),
            pending_events: Vec::new(),
        }
    }

    pub fn current_step_id(&self) -> Option<WorkflowStepId> {
        self.current_step_id
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn outcome_for(&self, step_id: WorkflowStepId) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.step_id == step_id)
    }

    pub fn documents(&self) -> &[CandidateDocument] {
        &self.documents
    }

    /// Place a freshly created candidate at the opening step, seeding the
    /// `NotStarted` entry that marks the step as pending. Does nothing once a
    /// step is assigned.
    pub fn assign_first_step(&mut self, step: &WorkflowStep, assigned_by: UserId, at: DateTime<Utc>) {
        if self.current_step_id.is_some() {
            return;
        }
        self.current_step_id = Some(step.id);
        self.outcomes.push(Outcome {
            step_id: step.id,
            status: OutcomeStatus::NotStarted,
            reason: None,
            recorded_by: assigned_by,
            recorded_at: at,
        });
    }

    /// Refresh profile fields from a newer source. Blank incoming values never
    /// overwrite existing data; the email is the match key and stays fixed.
    pub fn update_profile(
        &mut self,
        full_name: &str,
        phone: Option<&str>,
        location: Option<&str>,
        applied_on: Option<NaiveDate>,
    ) {
        let full_name = full_name.trim();
        if !full_name.is_empty() {
            self.full_name = full_name.to_string();
        }
        if let Some(phone) = phone.map(str::trim).filter(|value| !value.is_empty()) {
            self.phone = Some(phone.to_string());
        }
        if let Some(location) = location.map(str::trim).filter(|value| !value.is_empty()) {
            self.location = Some(location.to_string());
        }
        if let Some(applied_on) = applied_on {
            self.applied_on = Some(applied_on);
        }
    }

    pub fn attach_document(&mut self, document: CandidateDocument) {
        if !self.documents.iter().any(|existing| existing.id == document.id) {
            self.documents.push(document);
        }
    }

    pub fn detach_document(&mut self, document_id: DocumentId) {
        self.documents.retain(|existing| existing.id != document_id);
    }

    /// Record a scoring outcome for the step the candidate currently occupies.
    ///
    /// A candidate can only be scored at their current step; anything else is a
    /// transition error regardless of the outcome value. Re-recording the
    /// current step replaces the existing entry in place. `Pass` on the final
    /// step of `steps` completes the candidate without moving them; `Pass`
    /// elsewhere advances to the next step; `Fail` and `Hold` leave the
    /// candidate parked for re-scoring.
    pub fn record_outcome(
        &mut self,
        step_id: WorkflowStepId,
        status: OutcomeStatus,
        recorded_by: UserId,
        reason: Option<String>,
        steps: &[WorkflowStep],
        at: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        let current = self.current_step_id.ok_or(WorkflowError::StepNotAssigned)?;
        if self.is_completed {
            return Err(WorkflowError::AlreadyCompleted);
        }
        if step_id != current {
            return Err(WorkflowError::StepMismatch {
                current,
                attempted: step_id,
            });
        }
        if status == OutcomeStatus::NotStarted {
            return Err(WorkflowError::OutcomeNotRecordable);
        }
        let position = steps
            .iter()
            .position(|step| step.id == step_id)
            .ok_or(WorkflowError::StepNotFound(step_id))?;

        let recorded = Outcome {
            step_id,
            status,
            reason,
            recorded_by,
            recorded_at: at,
        };
        match self
            .outcomes
            .iter_mut()
            .find(|outcome| outcome.step_id == step_id)
        {
            Some(existing) => *existing = recorded,
            None => self.outcomes.push(recorded),
        }

        let event = if status == OutcomeStatus::Pass {
            if position + 1 == steps.len() {
                self.is_completed = true;
                CandidateEvent::Completed {
                    candidate_id: self.id,
                    recruitment_id: self.recruitment_id,
                    step_id,
                    at,
                }
            } else {
                let next = steps[position + 1].id;
                self.current_step_id = Some(next);
                CandidateEvent::StepAdvanced {
                    candidate_id: self.id,
                    recruitment_id: self.recruitment_id,
                    from: step_id,
                    to: next,
                    at,
                }
            }
        } else {
            CandidateEvent::OutcomeRecorded {
                candidate_id: self.id,
                recruitment_id: self.recruitment_id,
                step_id,
                status,
                at,
            }
        };
        self.pending_events.push(event);
        Ok(())
    }

    /// Hand the accumulated progression notifications to the caller, leaving
    /// the candidate with none pending.
    pub fn take_events(&mut self) -> Vec<CandidateEvent> {
        std::mem::take(&mut self.pending_events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::recruitment::domain::Recruitment;

    fn three_step_recruitment() -> Recruitment {
        let mut recruitment = Recruitment::new("Site Reliability Engineer");
        recruitment.add_step("Screening").expect("step");
        recruitment.add_step("Interview").expect("step");
        recruitment.add_step("Offer").expect("step");
        recruitment
    }

    fn candidate_at_first_step(recruitment: &Recruitment) -> Candidate {
        let mut candidate = Candidate::new(
            recruitment.id,
            "Priya Nair".to_string(),
            "priya@example.com".to_string(),
        );
        let first = recruitment.first_step().expect("chain not empty").clone();
        candidate.assign_first_step(&first, UserId::generate(), Utc::now());
        candidate
    }

    #[test]
    fn unassigned_candidate_cannot_be_scored() {
        let recruitment = three_step_recruitment();
        let mut candidate = Candidate::new(
            recruitment.id,
            "Priya Nair".to_string(),
            "priya@example.com".to_string(),
        );
        let step = recruitment.first_step().expect("step").id;

        match candidate.record_outcome(
            step,
            OutcomeStatus::Pass,
            UserId::generate(),
            None,
            recruitment.ordered_steps(),
            Utc::now(),
        ) {
            Err(WorkflowError::StepNotAssigned) => {}
            other => panic!("expected step-not-assigned, got {other:?}"),
        }
    }

    #[test]
    fn scoring_a_non_current_step_fails_regardless_of_status() {
        let recruitment = three_step_recruitment();
        let mut candidate = candidate_at_first_step(&recruitment);
        let second = recruitment.ordered_steps()[1].id;

        for status in [OutcomeStatus::Pass, OutcomeStatus::Fail, OutcomeStatus::Hold] {
            match candidate.record_outcome(
                second,
                status,
                UserId::generate(),
                None,
                recruitment.ordered_steps(),
                Utc::now(),
            ) {
                Err(WorkflowError::StepMismatch { attempted, .. }) => {
                    assert_eq!(attempted, second)
                }
                other => panic!("expected step mismatch, got {other:?}"),
            }
        }
    }

    #[test]
    fn not_started_is_rejected_as_an_argument() {
        let recruitment = three_step_recruitment();
        let mut candidate = candidate_at_first_step(&recruitment);
        let first = recruitment.first_step().expect("step").id;

        match candidate.record_outcome(
            first,
            OutcomeStatus::NotStarted,
            UserId::generate(),
            None,
            recruitment.ordered_steps(),
            Utc::now(),
        ) {
            Err(WorkflowError::OutcomeNotRecordable) => {}
            other => panic!("expected not-recordable, got {other:?}"),
        }
    }

    #[test]
    fn pass_on_a_middle_step_advances_without_completing() {
        let recruitment = three_step_recruitment();
        let mut candidate = candidate_at_first_step(&recruitment);
        let steps = recruitment.ordered_steps();

        candidate
            .record_outcome(
                steps[0].id,
                OutcomeStatus::Pass,
                UserId::generate(),
                None,
                steps,
                Utc::now(),
            )
            .expect("pass at first step");

        assert_eq!(candidate.current_step_id(), Some(steps[1].id));
        assert!(!candidate.is_completed());
    }

    #[test]
    fn pass_on_the_last_step_completes_in_place() {
        let recruitment = three_step_recruitment();
        let mut candidate = candidate_at_first_step(&recruitment);
        let steps = recruitment.ordered_steps();
        let scorer = UserId::generate();

        for step in steps {
            candidate
                .record_outcome(step.id, OutcomeStatus::Pass, scorer, None, steps, Utc::now())
                .expect("pass");
        }

        assert!(candidate.is_completed());
        assert_eq!(candidate.current_step_id(), Some(steps[2].id));

        match candidate.record_outcome(
            steps[2].id,
            OutcomeStatus::Pass,
            scorer,
            None,
            steps,
            Utc::now(),
        ) {
            Err(WorkflowError::AlreadyCompleted) => {}
            other => panic!("expected already-completed, got {other:?}"),
        }
    }

    #[test]
    fn fail_parks_the_candidate_with_one_recorded_outcome() {
        let recruitment = three_step_recruitment();
        let mut candidate = candidate_at_first_step(&recruitment);
        let steps = recruitment.ordered_steps();
        let scorer = UserId::generate();

        candidate
            .record_outcome(steps[0].id, OutcomeStatus::Pass, scorer, None, steps, Utc::now())
            .expect("pass to interview");
        candidate
            .record_outcome(
                steps[1].id,
                OutcomeStatus::Fail,
                scorer,
                Some("missed systems round".to_string()),
                steps,
                Utc::now(),
            )
            .expect("fail at interview");

        assert_eq!(candidate.current_step_id(), Some(steps[1].id));
        assert!(!candidate.is_completed());
        let failed: Vec<_> = candidate
            .outcomes()
            .iter()
            .filter(|outcome| outcome.status == OutcomeStatus::Fail)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].step_id, steps[1].id);
    }

    #[test]
    fn rescoring_the_current_step_replaces_in_place() {
        let recruitment = three_step_recruitment();
        let mut candidate = candidate_at_first_step(&recruitment);
        let steps = recruitment.ordered_steps();
        let scorer = UserId::generate();

        candidate
            .record_outcome(steps[0].id, OutcomeStatus::Pass, scorer, None, steps, Utc::now())
            .expect("pass");
        candidate
            .record_outcome(steps[1].id, OutcomeStatus::Hold, scorer, None, steps, Utc::now())
            .expect("hold");
        candidate
            .record_outcome(steps[1].id, OutcomeStatus::Fail, scorer, None, steps, Utc::now())
            .expect("re-score");

        assert_eq!(candidate.outcomes().len(), 2);
        let interview = candidate
            .outcome_for(steps[1].id)
            .expect("interview outcome");
        assert_eq!(interview.status, OutcomeStatus::Fail);
    }

    #[test]
    fn one_event_accumulates_per_successful_call() {
        let recruitment = three_step_recruitment();
        let mut candidate = candidate_at_first_step(&recruitment);
        let steps = recruitment.ordered_steps();
        let scorer = UserId::generate();

        candidate
            .record_outcome(steps[0].id, OutcomeStatus::Pass, scorer, None, steps, Utc::now())
            .expect("pass");
        candidate
            .record_outcome(steps[1].id, OutcomeStatus::Hold, scorer, None, steps, Utc::now())
            .expect("hold");

        let events = candidate.take_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], CandidateEvent::StepAdvanced { .. }));
        assert!(matches!(
            events[1],
            CandidateEvent::OutcomeRecorded {
                status: OutcomeStatus::Hold,
                ..
            }
        ));
        assert!(candidate.take_events().is_empty());
    }
}
