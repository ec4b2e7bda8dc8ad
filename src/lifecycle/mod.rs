//! Persisting contracts and producing their PDF artifacts.
//!
//! Saving a draft is a single write. Finalizing runs the steps of a
//! [`FinalizeRun`] in order and records each outcome, so the contract text is
//! saved even when rendering or upload fails, and a retry resumes where the
//! previous attempt stopped.

mod saga;

pub use saga::{FinalizeRun, FinalizeStep, StepOutcome, StepRecord};

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::entity::{Contract, ContractStatus, NewContract, PropertyDocument};
use crate::error::{MinutaError, Result};
use crate::render::DocumentRenderer;
use crate::storage::{
    BlobStorage, ContractUpdate, DocumentRegistry, EntityStore, FinalizeLedger, PDF_MIME_TYPE,
};

/// Where a save goes: a new contract record or an existing one.
#[derive(Debug, Clone)]
pub enum SaveTarget {
    Create(NewContract),
    Existing(Uuid),
}

/// Status a finalize leaves the contract in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinalStatus {
    #[default]
    Final,
    Signed,
}

impl From<FinalStatus> for ContractStatus {
    fn from(status: FinalStatus) -> Self {
        match status {
            FinalStatus::Final => ContractStatus::Final,
            FinalStatus::Signed => ContractStatus::Signed,
        }
    }
}

/// Result of a completed finalize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeOutcome {
    pub contract_id: Uuid,
    pub status: ContractStatus,
    pub storage_id: String,
    pub pdf_size: u64,
    /// First step executed by this call when it continued an earlier run
    pub resumed_from: Option<FinalizeStep>,
}

/// Orchestrates saves and finalizes over the persistence collaborators.
pub struct Lifecycle<'a> {
    store: &'a dyn EntityStore,
    blobs: &'a dyn BlobStorage,
    documents: &'a dyn DocumentRegistry,
    ledger: &'a dyn FinalizeLedger,
    renderer: &'a dyn DocumentRenderer,
}

impl<'a> Lifecycle<'a> {
    pub fn new(
        store: &'a dyn EntityStore,
        blobs: &'a dyn BlobStorage,
        documents: &'a dyn DocumentRegistry,
        ledger: &'a dyn FinalizeLedger,
        renderer: &'a dyn DocumentRenderer,
    ) -> Self {
        Self {
            store,
            blobs,
            documents,
            ledger,
            renderer,
        }
    }

    fn load_contract(&self, id: &Uuid) -> Result<Contract> {
        self.store
            .get_contract(id)?
            .ok_or_else(|| MinutaError::EntityNotFound(id.to_string()))
    }

    /// Persist `content` with status draft. Never renders.
    pub fn save_draft(&self, target: SaveTarget, content: &str) -> Result<Uuid> {
        match target {
            SaveTarget::Create(fields) => {
                let id = self.store.create_contract(NewContract {
                    content: content.to_string(),
                    status: ContractStatus::Draft,
                    ..fields
                })?;
                info!(contract_id = %id, "draft created");
                Ok(id)
            }
            SaveTarget::Existing(id) => {
                let contract = self.load_contract(&id)?;
                contract.status.transition_to(ContractStatus::Draft)?;
                self.store.update_contract(
                    &id,
                    ContractUpdate {
                        content: Some(content.to_string()),
                        status: Some(ContractStatus::Draft),
                        ..Default::default()
                    },
                )?;
                info!(contract_id = %id, "draft saved");
                Ok(id)
            }
        }
    }

    /// Persist `content` with a final status, then render, upload and link
    /// the PDF.
    ///
    /// When a later step fails the error is returned but the text stays
    /// saved with the final status, and the run records where it stopped.
    pub fn finalize(
        &self,
        target: SaveTarget,
        content: &str,
        status: FinalStatus,
    ) -> Result<FinalizeOutcome> {
        let run = self.prepare_finalize(target, content, status)?;
        self.run_finalize(run)
    }

    /// Finalize an existing contract again with its stored content.
    ///
    /// Without an explicit status the contract keeps its current final
    /// status, or becomes final if it is still a draft.
    pub fn retry_finalize(
        &self,
        contract_id: &Uuid,
        status: Option<FinalStatus>,
    ) -> Result<FinalizeOutcome> {
        let contract = self.load_contract(contract_id)?;
        let status = status.unwrap_or(match contract.status {
            ContractStatus::Signed => FinalStatus::Signed,
            _ => FinalStatus::Final,
        });
        self.finalize(SaveTarget::Existing(*contract_id), &contract.content, status)
    }

    /// Run the persist step and return the run holding the remaining steps.
    ///
    /// An unfinished run for the same contract, content and status is
    /// continued instead of replaced.
    pub fn prepare_finalize(
        &self,
        target: SaveTarget,
        content: &str,
        status: FinalStatus,
    ) -> Result<FinalizeRun> {
        let target_status = ContractStatus::from(status);
        let id = match target {
            SaveTarget::Create(fields) => {
                let id = self.store.create_contract(NewContract {
                    content: content.to_string(),
                    status: target_status,
                    ..fields
                })?;
                info!(contract_id = %id, status = %target_status, "contract created for finalize");
                let mut run = FinalizeRun::new(id, content.to_string(), target_status);
                run.mark(FinalizeStep::PersistContent, StepOutcome::Done);
                self.ledger.save_run(&run)?;
                return Ok(run);
            }
            SaveTarget::Existing(id) => id,
        };

        let contract = self.load_contract(&id)?;
        contract.status.transition_to(target_status)?;

        let previous = self.ledger.load_run(&id)?;
        let mut run = match previous {
            Some(mut run) if run.continues_with(content, target_status) => {
                run.prepare_resume();
                info!(contract_id = %id, next = ?run.next_step(), "resuming finalize");
                run
            }
            previous => {
                let mut run = FinalizeRun::new(id, content.to_string(), target_status);
                // An abandoned run may have uploaded a blob nobody recorded
                if let Some(stale) = previous.filter(|p| !p.is_complete()) {
                    if let Some(orphan) = stale.storage_id {
                        self.discard_blob(&orphan);
                    }
                    run.replaced_storage_id = stale.replaced_storage_id;
                }
                if run.replaced_storage_id.is_none() {
                    run.replaced_storage_id = contract.pdf_storage_id.clone();
                }
                run
            }
        };

        if !run.outcome(FinalizeStep::PersistContent).is_done() {
            let result = self.store.update_contract(
                &id,
                ContractUpdate {
                    content: Some(content.to_string()),
                    status: Some(target_status),
                    pdf_storage_id: Some(None),
                    pdf_size: Some(None),
                    ..Default::default()
                },
            );
            self.record(&mut run, FinalizeStep::PersistContent, result)?;
            info!(contract_id = %id, status = %target_status, "contract content persisted");
        }
        Ok(run)
    }

    /// Execute every step of `run` that is not done yet.
    pub fn run_finalize(&self, mut run: FinalizeRun) -> Result<FinalizeOutcome> {
        let contract_id = run.contract_id;
        let resumed_from = run.next_step().filter(|_| run.attempts > 1);
        let mut pdf: Option<Vec<u8>> = None;

        for step in FinalizeStep::ALL {
            if run.outcome(step).is_done() {
                continue;
            }
            let result = match step {
                FinalizeStep::PersistContent => Err(MinutaError::InvalidStep {
                    step: step.to_string(),
                    action: "run".to_string(),
                }),
                FinalizeStep::RenderPdf => match self.renderer.render(&run.content) {
                    Ok(bytes) => {
                        info!(contract_id = %contract_id, bytes = bytes.len(), "pdf rendered");
                        pdf = Some(bytes);
                        Ok(())
                    }
                    Err(e) => Err(e.into()),
                },
                FinalizeStep::UploadPdf => self.upload(&mut run, pdf.as_deref()),
                FinalizeStep::RecordArtifact => self.record_artifact(&mut run),
                FinalizeStep::LinkDocument => self.link_document(&run),
            };
            self.record(&mut run, step, result)?;
        }

        let storage_id = run
            .storage_id
            .clone()
            .ok_or_else(|| MinutaError::Storage("finalize finished without an artifact".to_string()))?;
        info!(contract_id = %contract_id, storage_id = %storage_id, "contract finalized");
        Ok(FinalizeOutcome {
            contract_id,
            status: run.target_status,
            storage_id,
            pdf_size: run.pdf_size.unwrap_or_default(),
            resumed_from,
        })
    }

    /// Store the outcome of `step` and pass its error through.
    fn record(&self, run: &mut FinalizeRun, step: FinalizeStep, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                run.mark(step, StepOutcome::Done);
                self.ledger.save_run(run)
            }
            Err(e) => {
                error!(contract_id = %run.contract_id, step = %step, error = %e, "finalize step failed");
                run.mark(step, StepOutcome::Failed(e.to_string()));
                if let Err(save_err) = self.ledger.save_run(run) {
                    warn!(contract_id = %run.contract_id, error = %save_err, "could not record finalize failure");
                }
                Err(e)
            }
        }
    }

    fn upload(&self, run: &mut FinalizeRun, pdf: Option<&[u8]>) -> Result<()> {
        let bytes = pdf.ok_or_else(|| {
            MinutaError::Storage("no rendered pdf to upload".to_string())
        })?;
        let destination = self.blobs.request_upload_destination()?;
        let receipt = self.blobs.upload(&destination, bytes, PDF_MIME_TYPE)?;
        info!(contract_id = %run.contract_id, storage_id = %receipt.storage_id, size = receipt.size, "pdf uploaded");
        run.storage_id = Some(receipt.storage_id);
        run.pdf_size = Some(receipt.size);
        Ok(())
    }

    fn record_artifact(&self, run: &mut FinalizeRun) -> Result<()> {
        let storage_id = run
            .storage_id
            .clone()
            .ok_or_else(|| MinutaError::Storage("no uploaded pdf to record".to_string()))?;
        self.store.update_contract(
            &run.contract_id,
            ContractUpdate {
                pdf_storage_id: Some(Some(storage_id.clone())),
                pdf_size: Some(run.pdf_size),
                ..Default::default()
            },
        )?;

        if let Some(replaced) = run.replaced_storage_id.take() {
            if replaced != storage_id {
                self.discard_blob(&replaced);
                if let Err(e) = self.documents.detach(&replaced) {
                    warn!(storage_id = %replaced, error = %e, "could not unlink replaced pdf");
                }
            }
        }
        Ok(())
    }

    fn link_document(&self, run: &FinalizeRun) -> Result<()> {
        let storage_id = run
            .storage_id
            .as_deref()
            .ok_or_else(|| MinutaError::Storage("no uploaded pdf to link".to_string()))?;
        let contract = self.load_contract(&run.contract_id)?;
        let mut document = PropertyDocument::new(
            contract.property_id,
            format!("{}.pdf", contract.name),
            storage_id,
            PDF_MIME_TYPE,
            run.pdf_size.unwrap_or_default(),
        );
        document.contract_id = Some(contract.id);
        self.documents.attach(&document)
    }

    fn discard_blob(&self, storage_id: &str) {
        match self.blobs.delete(storage_id) {
            Ok(()) => info!(storage_id = %storage_id, "replaced pdf removed"),
            Err(e) => warn!(storage_id = %storage_id, error = %e, "could not remove stored pdf"),
        }
    }

    /// Delete a contract together with its artifact, document link and run.
    pub fn delete_contract(&self, id: &Uuid) -> Result<()> {
        let contract = self.load_contract(id)?;
        let run = self.ledger.load_run(id)?;

        let mut artifacts: Vec<String> = contract.pdf_storage_id.into_iter().collect();
        if let Some(run) = run {
            artifacts.extend(run.storage_id);
            artifacts.extend(run.replaced_storage_id);
        }
        artifacts.sort();
        artifacts.dedup();

        for storage_id in &artifacts {
            if let Err(e) = self.blobs.delete(storage_id) {
                warn!(contract_id = %id, storage_id = %storage_id, error = %e, "could not delete stored pdf");
            }
            self.documents.detach(storage_id)?;
        }
        self.ledger.clear_run(id)?;
        self.store.delete_contract(id)?;
        info!(contract_id = %id, "contract deleted");
        Ok(())
    }

    /// Download URL of the contract's PDF, if it has one.
    pub fn artifact_url(&self, id: &Uuid) -> Result<Option<String>> {
        let contract = self.load_contract(id)?;
        match contract.pdf_storage_id {
            Some(storage_id) => self.blobs.download_url(&storage_id),
            None => Ok(None),
        }
    }
}
