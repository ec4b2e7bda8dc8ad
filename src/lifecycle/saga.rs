//! Finalize run bookkeeping.
//!
//! A finalize is a fixed sequence of steps with one recorded outcome each.
//! The run is persisted after every step so a later attempt can pick up at
//! the first step that has not completed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::ContractStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeStep {
    PersistContent,
    RenderPdf,
    UploadPdf,
    RecordArtifact,
    LinkDocument,
}

impl FinalizeStep {
    pub const ALL: [FinalizeStep; 5] = [
        FinalizeStep::PersistContent,
        FinalizeStep::RenderPdf,
        FinalizeStep::UploadPdf,
        FinalizeStep::RecordArtifact,
        FinalizeStep::LinkDocument,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FinalizeStep::PersistContent => "persist_content",
            FinalizeStep::RenderPdf => "render_pdf",
            FinalizeStep::UploadPdf => "upload_pdf",
            FinalizeStep::RecordArtifact => "record_artifact",
            FinalizeStep::LinkDocument => "link_document",
        }
    }
}

impl std::fmt::Display for FinalizeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum StepOutcome {
    #[default]
    Pending,
    Done,
    Failed(String),
}

impl StepOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, StepOutcome::Done)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: FinalizeStep,
    pub outcome: StepOutcome,
}

fn first_attempt() -> u32 {
    1
}

/// Progress of finalizing a contract, kept across retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeRun {
    pub contract_id: Uuid,
    pub content: String,
    pub target_status: ContractStatus,
    pub steps: Vec<StepRecord>,
    /// Set once the upload succeeded
    #[serde(default)]
    pub storage_id: Option<String>,
    #[serde(default)]
    pub pdf_size: Option<u64>,
    /// Artifact of earlier content, removed once the new one is recorded
    #[serde(default)]
    pub replaced_storage_id: Option<String>,
    #[serde(default = "first_attempt")]
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FinalizeRun {
    pub fn new(contract_id: Uuid, content: String, target_status: ContractStatus) -> Self {
        let now = Utc::now();
        Self {
            contract_id,
            content,
            target_status,
            steps: FinalizeStep::ALL
                .iter()
                .map(|step| StepRecord {
                    step: *step,
                    outcome: StepOutcome::Pending,
                })
                .collect(),
            storage_id: None,
            pdf_size: None,
            replaced_storage_id: None,
            attempts: first_attempt(),
            started_at: now,
            updated_at: now,
        }
    }

    pub fn outcome(&self, step: FinalizeStep) -> StepOutcome {
        self.steps
            .iter()
            .find(|r| r.step == step)
            .map(|r| r.outcome.clone())
            .unwrap_or_default()
    }

    pub fn mark(&mut self, step: FinalizeStep, outcome: StepOutcome) {
        match self.steps.iter_mut().find(|r| r.step == step) {
            Some(record) => record.outcome = outcome,
            None => self.steps.push(StepRecord { step, outcome }),
        }
        self.updated_at = Utc::now();
    }

    /// First step that still has to run, in order.
    pub fn next_step(&self) -> Option<FinalizeStep> {
        FinalizeStep::ALL
            .into_iter()
            .find(|step| !self.outcome(*step).is_done())
    }

    pub fn is_complete(&self) -> bool {
        self.next_step().is_none()
    }

    /// The recorded failure, if any.
    pub fn failure(&self) -> Option<(FinalizeStep, &str)> {
        self.steps.iter().find_map(|r| match &r.outcome {
            StepOutcome::Failed(message) => Some((r.step, message.as_str())),
            _ => None,
        })
    }

    /// A retry with the same inputs continues this run instead of starting over.
    pub fn continues_with(&self, content: &str, target_status: ContractStatus) -> bool {
        !self.is_complete() && self.content == content && self.target_status == target_status
    }

    /// Rendered bytes are never persisted, so a run that stopped before the
    /// upload completed has to render again.
    pub fn prepare_resume(&mut self) {
        self.attempts += 1;
        if !self.outcome(FinalizeStep::UploadPdf).is_done() {
            self.mark(FinalizeStep::RenderPdf, StepOutcome::Pending);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> FinalizeRun {
        FinalizeRun::new(Uuid::new_v4(), "<p>x</p>".to_string(), ContractStatus::Final)
    }

    #[test]
    fn test_new_run_starts_at_persist() {
        let run = run();
        assert_eq!(run.next_step(), Some(FinalizeStep::PersistContent));
        assert!(!run.is_complete());
        assert!(run.failure().is_none());
    }

    #[test]
    fn test_mark_advances_and_records_failure() {
        let mut run = run();
        run.mark(FinalizeStep::PersistContent, StepOutcome::Done);
        run.mark(FinalizeStep::RenderPdf, StepOutcome::Failed("boom".into()));
        assert_eq!(run.next_step(), Some(FinalizeStep::RenderPdf));
        assert_eq!(run.failure(), Some((FinalizeStep::RenderPdf, "boom")));
    }

    #[test]
    fn test_resume_rerenders_until_uploaded() {
        let mut run = run();
        run.mark(FinalizeStep::PersistContent, StepOutcome::Done);
        run.mark(FinalizeStep::RenderPdf, StepOutcome::Done);
        run.mark(FinalizeStep::UploadPdf, StepOutcome::Failed("offline".into()));
        run.prepare_resume();
        assert_eq!(run.outcome(FinalizeStep::RenderPdf), StepOutcome::Pending);

        run.mark(FinalizeStep::RenderPdf, StepOutcome::Done);
        run.mark(FinalizeStep::UploadPdf, StepOutcome::Done);
        run.mark(FinalizeStep::RecordArtifact, StepOutcome::Failed("db".into()));
        run.prepare_resume();
        assert!(run.outcome(FinalizeStep::RenderPdf).is_done());
        assert_eq!(run.next_step(), Some(FinalizeStep::RecordArtifact));
    }

    #[test]
    fn test_continues_with_same_inputs_only() {
        let mut run = run();
        assert!(run.continues_with("<p>x</p>", ContractStatus::Final));
        assert!(!run.continues_with("<p>y</p>", ContractStatus::Final));
        assert!(!run.continues_with("<p>x</p>", ContractStatus::Signed));
        for step in FinalizeStep::ALL {
            run.mark(step, StepOutcome::Done);
        }
        assert!(!run.continues_with("<p>x</p>", ContractStatus::Final));
    }

    #[test]
    fn test_run_survives_json() {
        let mut run = run();
        run.mark(FinalizeStep::PersistContent, StepOutcome::Done);
        run.mark(FinalizeStep::RenderPdf, StepOutcome::Failed("sem memória".into()));
        let json = serde_json::to_string(&run).unwrap();
        assert!(json.contains("\"state\":\"failed\""));
        let back: FinalizeRun = serde_json::from_str(&json).unwrap();
        assert_eq!(back, run);
    }
}
