//! Authoring session for one contract.
//!
//! A new contract goes `select -> preview -> edit`, or straight from
//! `select` to `edit` when no template is chosen. An existing draft opens
//! directly in `edit` and has no way back to `select`. Nothing is persisted
//! until the session is submitted.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::entity::{ContractStatus, NewContract};
use crate::error::{MinutaError, ResolutionError, Result, ValidationError};
use crate::lifecycle::{FinalStatus, FinalizeOutcome, Lifecycle, SaveTarget};
use crate::placeholder::ReplacementData;
use crate::storage::EntityStore;
use crate::substitution::substitute;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStep {
    Select,
    Preview,
    Edit,
    /// Generation could not load a referenced entity
    Failed,
}

impl fmt::Display for DraftStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DraftStep::Select => "select",
            DraftStep::Preview => "preview",
            DraftStep::Edit => "edit",
            DraftStep::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftMode {
    Create,
    /// Edit-only session over a persisted draft
    EditExisting(Uuid),
}

/// What the user picked in the select step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub name: String,
    pub description: Option<String>,
    pub template_id: Option<Uuid>,
    pub property_id: Option<Uuid>,
    pub client_ids: Vec<Uuid>,
    /// Defaults to the first selected client
    pub primary_client_id: Option<Uuid>,
    pub notary_office_ids: Vec<Uuid>,
}

impl Selection {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::NameRequired);
        }
        if self.client_ids.is_empty() {
            return Err(ValidationError::ClientRequired);
        }
        if let Some(primary) = self.primary_client_id {
            if !self.client_ids.contains(&primary) {
                return Err(ValidationError::PrimaryClientNotSelected);
            }
        }
        if self.property_id.is_none() {
            return Err(ValidationError::PropertyRequired);
        }
        Ok(())
    }

    pub fn primary_client(&self) -> Option<Uuid> {
        self.primary_client_id.or_else(|| self.client_ids.first().copied())
    }

    fn to_new_contract(&self) -> std::result::Result<NewContract, ValidationError> {
        self.validate()?;
        let property_id = self.property_id.ok_or(ValidationError::PropertyRequired)?;
        let primary_client_id = self.primary_client().ok_or(ValidationError::ClientRequired)?;
        Ok(NewContract {
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            template_id: self.template_id,
            property_id,
            primary_client_id,
            client_ids: self.client_ids.clone(),
            notary_office_ids: self.notary_office_ids.clone(),
            content: String::new(),
            status: ContractStatus::Draft,
        })
    }
}

/// How the user leaves the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitAction {
    SaveDraft,
    Finalize,
    Sign,
}

/// Content and destination handed to the lifecycle on exit.
#[derive(Debug, Clone)]
pub struct Submission {
    pub target: SaveTarget,
    pub content: String,
    pub action: ExitAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Saved {
    Draft(Uuid),
    Finalized(FinalizeOutcome),
}

impl Submission {
    pub fn execute(self, lifecycle: &Lifecycle<'_>) -> Result<Saved> {
        match self.action {
            ExitAction::SaveDraft => lifecycle
                .save_draft(self.target, &self.content)
                .map(Saved::Draft),
            ExitAction::Finalize => lifecycle
                .finalize(self.target, &self.content, FinalStatus::Final)
                .map(Saved::Finalized),
            ExitAction::Sign => lifecycle
                .finalize(self.target, &self.content, FinalStatus::Signed)
                .map(Saved::Finalized),
        }
    }
}

#[derive(Debug)]
pub struct DraftSession {
    mode: DraftMode,
    step: DraftStep,
    selection: Selection,
    content: String,
    failure: Option<ResolutionError>,
}

impl Default for DraftSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DraftSession {
    /// Start authoring a new contract.
    pub fn new() -> Self {
        Self {
            mode: DraftMode::Create,
            step: DraftStep::Select,
            selection: Selection::default(),
            content: String::new(),
            failure: None,
        }
    }

    /// Open a persisted draft for editing. Final and signed contracts can't
    /// be reopened.
    pub fn open_existing(store: &dyn EntityStore, contract_id: &Uuid) -> Result<Self> {
        let contract = store
            .get_contract(contract_id)?
            .ok_or_else(|| MinutaError::EntityNotFound(contract_id.to_string()))?;
        contract.status.transition_to(ContractStatus::Draft)?;

        debug!(contract_id = %contract_id, "draft opened for editing");
        Ok(Self {
            mode: DraftMode::EditExisting(contract.id),
            step: DraftStep::Edit,
            selection: Selection {
                name: contract.name,
                description: contract.description,
                template_id: contract.template_id,
                property_id: Some(contract.property_id),
                client_ids: contract.client_ids,
                primary_client_id: Some(contract.primary_client_id),
                notary_office_ids: contract.notary_office_ids,
            },
            content: contract.content,
            failure: None,
        })
    }

    pub fn mode(&self) -> DraftMode {
        self.mode
    }

    pub fn step(&self) -> DraftStep {
        self.step
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn failure(&self) -> Option<&ResolutionError> {
        self.failure.as_ref()
    }

    fn invalid(&self, action: &str) -> MinutaError {
        MinutaError::InvalidStep {
            step: self.step.to_string(),
            action: action.to_string(),
        }
    }

    /// Replace the selection. Only in the select step.
    pub fn select(&mut self, selection: Selection) -> Result<()> {
        if self.step != DraftStep::Select {
            return Err(self.invalid("select"));
        }
        self.selection = selection;
        Ok(())
    }

    /// Leave the select step.
    ///
    /// With a template, loads every referenced entity and generates the
    /// preview; a missing entity moves the session to the failed step. Without
    /// a template, goes straight to edit with empty content.
    pub fn proceed(&mut self, store: &dyn EntityStore) -> Result<DraftStep> {
        if self.step != DraftStep::Select {
            return Err(self.invalid("continue"));
        }
        self.selection.validate()?;

        let Some(template_id) = self.selection.template_id else {
            self.content.clear();
            self.step = DraftStep::Edit;
            return Ok(self.step);
        };

        match self.generate(store, template_id) {
            Ok(content) => {
                info!(template_id = %template_id, bytes = content.len(), "contract content generated");
                self.content = content;
                self.step = DraftStep::Preview;
                Ok(self.step)
            }
            Err(MinutaError::Resolution(err)) => {
                self.failure = Some(err.clone());
                self.step = DraftStep::Failed;
                Err(err.into())
            }
            Err(e) => Err(e),
        }
    }

    fn generate(&self, store: &dyn EntityStore, template_id: Uuid) -> Result<String> {
        let selection = &self.selection;
        let template = store
            .get_template(&template_id)?
            .ok_or(ResolutionError::TemplateNotFound(template_id))?;

        let client_id = selection.primary_client().ok_or(ValidationError::ClientRequired)?;
        let client = store
            .get_client(&client_id)?
            .ok_or(ResolutionError::ClientNotFound(client_id))?;

        let property_id = selection.property_id.ok_or(ValidationError::PropertyRequired)?;
        let property = store
            .get_property(&property_id)?
            .ok_or(ResolutionError::PropertyNotFound(property_id))?;

        let notary_office = match selection.notary_office_ids.first() {
            Some(id) => Some(
                store
                    .get_notary_office(id)?
                    .ok_or(ResolutionError::NotaryOfficeNotFound(*id))?,
            ),
            None => None,
        };

        let data = ReplacementData::new(&client, &property, notary_office.as_ref());
        Ok(substitute(&template.content, &data))
    }

    /// Carry the preview into the editor.
    pub fn begin_editing(&mut self) -> Result<()> {
        if self.step != DraftStep::Preview {
            return Err(self.invalid("edit"));
        }
        self.step = DraftStep::Edit;
        Ok(())
    }

    /// Return to the select step, dropping generated or typed content.
    pub fn back(&mut self) -> Result<()> {
        let allowed = self.mode == DraftMode::Create
            && matches!(self.step, DraftStep::Preview | DraftStep::Edit | DraftStep::Failed);
        if !allowed {
            return Err(self.invalid("back"));
        }
        self.content.clear();
        self.failure = None;
        self.step = DraftStep::Select;
        Ok(())
    }

    pub fn set_content(&mut self, content: impl Into<String>) -> Result<()> {
        if self.step != DraftStep::Edit {
            return Err(self.invalid("set content"));
        }
        self.content = content.into();
        Ok(())
    }

    /// Package the current content for saving.
    pub fn submission(&self, action: ExitAction) -> Result<Submission> {
        if !matches!(self.step, DraftStep::Preview | DraftStep::Edit) {
            return Err(self.invalid("save"));
        }
        let target = match self.mode {
            DraftMode::Create => SaveTarget::Create(self.selection.to_new_contract()?),
            DraftMode::EditExisting(id) => SaveTarget::Existing(id),
        };
        Ok(Submission {
            target,
            content: self.content.clone(),
            action,
        })
    }

    /// Discard the session. Persisted data is left as it was.
    pub fn close(self) {
        debug!(step = %self.step, "draft session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ContractTemplate;
    use crate::placeholder::fixtures;
    use crate::storage::SqliteStore;

    struct Seeded {
        store: SqliteStore,
        template_id: Uuid,
        client_id: Uuid,
        property_id: Uuid,
        office_id: Uuid,
    }

    fn seeded() -> Seeded {
        let store = SqliteStore::open_in_memory().unwrap();
        let client = fixtures::client();
        let property = fixtures::property();
        let office = fixtures::notary_office();
        let template = ContractTemplate::new(
            "Compra e venda",
            "<p>{{client.name}} adquire o imóvel em {{property.address}}, CEP {{property.zipCode}}, \
             perante o {{notaryOffice.name}}. {{foo.bar}}</p>",
        );
        store.add_client(&client).unwrap();
        store.add_property(&property).unwrap();
        store.add_notary_office(&office).unwrap();
        store.add_template(&template).unwrap();
        Seeded {
            store,
            template_id: template.id,
            client_id: client.id,
            property_id: property.id,
            office_id: office.id,
        }
    }

    fn selection(seed: &Seeded, template: bool) -> Selection {
        Selection {
            name: "Compra e venda - Apto 501".to_string(),
            template_id: template.then_some(seed.template_id),
            property_id: Some(seed.property_id),
            client_ids: vec![seed.client_id],
            notary_office_ids: vec![seed.office_id],
            ..Selection::default()
        }
    }

    #[test]
    fn test_template_leads_to_preview() {
        let seed = seeded();
        let mut session = DraftSession::new();
        session.select(selection(&seed, true)).unwrap();

        assert_eq!(session.proceed(&seed.store).unwrap(), DraftStep::Preview);
        assert_eq!(
            session.content(),
            "<p>Ana Silva adquire o imóvel em Rua da Bahia, 1200 - Apto 501, CEP 30130-000, \
             perante o 2º Ofício de Notas. {{foo.bar}}</p>"
        );

        // Preview is read-only
        assert!(matches!(
            session.set_content("x"),
            Err(MinutaError::InvalidStep { .. })
        ));
        session.begin_editing().unwrap();
        session.set_content("<p>editado</p>").unwrap();
        assert_eq!(session.content(), "<p>editado</p>");
    }

    #[test]
    fn test_no_template_goes_straight_to_edit() {
        let seed = seeded();
        let mut session = DraftSession::new();
        session.select(selection(&seed, false)).unwrap();
        assert_eq!(session.proceed(&seed.store).unwrap(), DraftStep::Edit);
        assert_eq!(session.content(), "");
    }

    #[test]
    fn test_validation_blocks_transition() {
        let seed = seeded();
        let mut session = DraftSession::new();

        let mut sel = selection(&seed, true);
        sel.name = "   ".to_string();
        session.select(sel).unwrap();
        let err = session.proceed(&seed.store).unwrap_err();
        assert!(matches!(err, MinutaError::Validation(ValidationError::NameRequired)));
        assert_eq!(session.step(), DraftStep::Select);

        let mut sel = selection(&seed, true);
        sel.client_ids.clear();
        session.select(sel).unwrap();
        let err = session.proceed(&seed.store).unwrap_err();
        assert_eq!(err.to_string(), "Selecione pelo menos um cliente");

        let mut sel = selection(&seed, true);
        sel.primary_client_id = Some(Uuid::new_v4());
        session.select(sel).unwrap();
        assert!(matches!(
            session.proceed(&seed.store),
            Err(MinutaError::Validation(ValidationError::PrimaryClientNotSelected))
        ));
    }

    #[test]
    fn test_missing_entity_is_terminal() {
        let seed = seeded();
        let mut session = DraftSession::new();
        let mut sel = selection(&seed, true);
        sel.property_id = Some(Uuid::new_v4());
        session.select(sel).unwrap();

        let err = session.proceed(&seed.store).unwrap_err();
        assert_eq!(err.to_string(), "Imóvel não encontrado");
        assert_eq!(session.step(), DraftStep::Failed);
        assert!(matches!(session.failure(), Some(ResolutionError::PropertyNotFound(_))));
        assert!(session.content().is_empty());
        assert!(session.submission(ExitAction::SaveDraft).is_err());
        assert!(session.begin_editing().is_err());

        // Back to select clears the failure
        session.back().unwrap();
        assert_eq!(session.step(), DraftStep::Select);
        assert!(session.failure().is_none());
    }

    #[test]
    fn test_missing_template_and_notary_office() {
        let seed = seeded();
        let mut session = DraftSession::new();
        let mut sel = selection(&seed, true);
        sel.template_id = Some(Uuid::new_v4());
        session.select(sel).unwrap();
        assert_eq!(session.proceed(&seed.store).unwrap_err().to_string(), "Modelo não encontrado");

        let mut session = DraftSession::new();
        let mut sel = selection(&seed, true);
        sel.notary_office_ids = vec![Uuid::new_v4()];
        session.select(sel).unwrap();
        assert_eq!(session.proceed(&seed.store).unwrap_err().to_string(), "Cartório não encontrado");
    }

    #[test]
    fn test_without_notary_office_fields_are_empty() {
        let seed = seeded();
        let mut session = DraftSession::new();
        let mut sel = selection(&seed, true);
        sel.notary_office_ids.clear();
        session.select(sel).unwrap();
        session.proceed(&seed.store).unwrap();
        assert!(session.content().contains("perante o . "));
    }

    #[test]
    fn test_back_returns_to_select() {
        let seed = seeded();
        let mut session = DraftSession::new();
        assert!(session.back().is_err());
        session.select(selection(&seed, true)).unwrap();
        session.proceed(&seed.store).unwrap();
        assert!(session.select(Selection::default()).is_err());
        session.back().unwrap();
        assert_eq!(session.step(), DraftStep::Select);
        assert!(session.content().is_empty());
    }

    #[test]
    fn test_submission_for_new_contract() {
        let seed = seeded();
        let mut session = DraftSession::new();
        assert!(session.submission(ExitAction::SaveDraft).is_err());
        session.select(selection(&seed, true)).unwrap();
        session.proceed(&seed.store).unwrap();

        let submission = session.submission(ExitAction::Finalize).unwrap();
        assert_eq!(submission.action, ExitAction::Finalize);
        assert_eq!(submission.content, session.content());
        match submission.target {
            SaveTarget::Create(fields) => {
                assert_eq!(fields.primary_client_id, seed.client_id);
                assert_eq!(fields.template_id, Some(seed.template_id));
                assert_eq!(fields.status, ContractStatus::Draft);
            }
            other => panic!("expected a new contract, got {:?}", other),
        }
    }

    #[test]
    fn test_existing_draft_opens_in_edit_only_mode() {
        let seed = seeded();
        let mut fields = selection(&seed, false).to_new_contract().unwrap();
        fields.content = "<p>salvo</p>".to_string();
        let id = seed.store.create_contract(fields).unwrap();

        let mut session = DraftSession::open_existing(&seed.store, &id).unwrap();
        assert_eq!(session.step(), DraftStep::Edit);
        assert_eq!(session.mode(), DraftMode::EditExisting(id));
        assert_eq!(session.content(), "<p>salvo</p>");
        assert!(matches!(session.back(), Err(MinutaError::InvalidStep { .. })));
        assert!(session.proceed(&seed.store).is_err());

        session.set_content("<p>alterado</p>").unwrap();
        let submission = session.submission(ExitAction::SaveDraft).unwrap();
        assert!(matches!(submission.target, SaveTarget::Existing(target) if target == id));

        // Closing without saving leaves the record untouched
        session.close();
        let stored = seed.store.get_contract(&id).unwrap().unwrap();
        assert_eq!(stored.content, "<p>salvo</p>");
    }

    #[test]
    fn test_final_contract_cannot_be_reopened() {
        let seed = seeded();
        let mut fields = selection(&seed, false).to_new_contract().unwrap();
        fields.status = ContractStatus::Final;
        let id = seed.store.create_contract(fields).unwrap();
        assert!(matches!(
            DraftSession::open_existing(&seed.store, &id),
            Err(MinutaError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_submission_executes_through_lifecycle() {
        use crate::render::{RenderOptions, Renderer};
        use crate::storage::FsBlobStore;

        let seed = seeded();
        let tmp = tempfile::TempDir::new().unwrap();
        let blobs = FsBlobStore::open(tmp.path()).unwrap();
        let renderer = Renderer::new(RenderOptions::default());
        let lifecycle = Lifecycle::new(&seed.store, &blobs, &seed.store, &seed.store, &renderer);

        let mut session = DraftSession::new();
        session.select(selection(&seed, true)).unwrap();
        session.proceed(&seed.store).unwrap();
        let saved = session
            .submission(ExitAction::SaveDraft)
            .unwrap()
            .execute(&lifecycle)
            .unwrap();
        let Saved::Draft(id) = saved else {
            panic!("expected a draft, got {:?}", saved);
        };

        let mut session = DraftSession::open_existing(&seed.store, &id).unwrap();
        session.set_content("<p>versão final</p>").unwrap();
        match session.submission(ExitAction::Sign).unwrap().execute(&lifecycle).unwrap() {
            Saved::Finalized(outcome) => {
                assert_eq!(outcome.contract_id, id);
                assert_eq!(outcome.status, ContractStatus::Signed);
                assert!(outcome.pdf_size > 0);
            }
            other => panic!("expected a finalize, got {:?}", other),
        }
        let stored = seed.store.get_contract(&id).unwrap().unwrap();
        assert_eq!(stored.content, "<p>versão final</p>");
        assert!(stored.has_artifact());
    }
}
