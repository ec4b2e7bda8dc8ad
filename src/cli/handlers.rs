use std::env;
use std::fs;
use std::io;
use std::path::Path;

use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::draft::{DraftSession, DraftStep, ExitAction, Selection, Submission};
use crate::entity::{Client, Contract, ContractTemplate, NotaryOffice, Property};
use crate::error::{MinutaError, Result};
use crate::lifecycle::{FinalStatus, FinalizeRun, FinalizeStep, Lifecycle, SaveTarget, StepOutcome};
use crate::placeholder::PlaceholderKey;
use crate::render::{DocumentRenderer, RenderOptions, Renderer};
use crate::storage::{
    find_project_root, EntityStore, FinalizeLedger, FsBlobStore, Project, SqliteStore,
};
use crate::substitution::scan_placeholders;

use super::commands::{ExitArgs, ListKind, SelectionArgs};

fn open_project() -> Result<Project> {
    Project::open(&find_project_root())
}

fn short_id(id: &Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Read an entity from a YAML or JSON file.
fn read_entity<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::from_str(&text)?)
    } else {
        Ok(serde_yaml::from_str(&text)?)
    }
}

fn renderer_for(project: &Project) -> Renderer {
    Renderer::new(RenderOptions::from(project.config().render.clone()))
}

/// Collaborators opened once per command.
struct Session {
    store: SqliteStore,
    blobs: FsBlobStore,
    renderer: Renderer,
}

impl Session {
    fn open(project: &Project) -> Result<Self> {
        Ok(Self {
            store: project.store()?,
            blobs: project.blobs()?,
            renderer: renderer_for(project),
        })
    }

    fn lifecycle(&self) -> Lifecycle<'_> {
        Lifecycle::new(
            &self.store,
            &self.blobs,
            &self.store,
            &self.store,
            &self.renderer,
        )
    }
}

pub fn handle_init() -> Result<()> {
    let root = env::current_dir()?;
    let project = Project::init(&root)?;
    println!("Initialized minuta project in {}", project.dir().display());
    Ok(())
}

pub fn handle_add_client(file: &Path, json: bool) -> Result<()> {
    let project = open_project()?;
    let store = project.store()?;

    let client: Client = read_entity(file)?;
    store.add_client(&client)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&client)?);
    } else {
        println!("Created client ({}) - {}", short_id(&client.id), client.name);
    }
    Ok(())
}

pub fn handle_add_property(file: &Path, json: bool) -> Result<()> {
    let project = open_project()?;
    let store = project.store()?;

    let property: Property = read_entity(file)?;
    store.add_property(&property)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&property)?);
    } else {
        println!(
            "Created property ({}) - {}",
            short_id(&property.id),
            property.summary()
        );
    }
    Ok(())
}

pub fn handle_add_notary(file: &Path, json: bool) -> Result<()> {
    let project = open_project()?;
    let store = project.store()?;

    let office: NotaryOffice = read_entity(file)?;
    store.add_notary_office(&office)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&office)?);
    } else {
        println!("Created notary office ({}) - {}", short_id(&office.id), office.name);
    }
    Ok(())
}

pub fn handle_add_template(
    name: String,
    file: &Path,
    description: Option<String>,
    json: bool,
) -> Result<()> {
    let project = open_project()?;
    let store = project.store()?;

    let mut template = ContractTemplate::new(name, fs::read_to_string(file)?);
    template.description = description;
    store.add_template(&template)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&template)?);
    } else {
        let unknown = scan_placeholders(&template.content)
            .into_iter()
            .filter(|p| !p.recognized)
            .count();
        println!("Created template ({}) - {}", short_id(&template.id), template.name);
        if unknown > 0 {
            eprintln!(
                "Warning: {} unknown placeholder(s); run 'minuta template check {}'",
                unknown,
                short_id(&template.id)
            );
        }
    }
    Ok(())
}

pub fn handle_list(kind: ListKind, json: bool) -> Result<()> {
    let project = open_project()?;
    let store = project.store()?;

    match kind {
        ListKind::Clients => {
            let clients = store.list_clients()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&clients)?);
            } else if clients.is_empty() {
                println!("No clients found.");
            } else {
                println!("Clients:\n");
                for c in clients {
                    let cpf = c.cpf.as_deref().map(crate::placeholder::format::format_tax_id);
                    println!(
                        "  ({}) {}{}",
                        short_id(&c.id),
                        c.name,
                        cpf.map(|v| format!(" [{}]", v)).unwrap_or_default()
                    );
                }
            }
        }
        ListKind::Properties => {
            let properties = store.list_properties()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&properties)?);
            } else if properties.is_empty() {
                println!("No properties found.");
            } else {
                println!("Properties:\n");
                for p in properties {
                    println!("  ({}) [{}] {}", short_id(&p.id), p.property_type, p.summary());
                }
            }
        }
        ListKind::Notaries => {
            let offices = store.list_notary_offices()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&offices)?);
            } else if offices.is_empty() {
                println!("No notary offices found.");
            } else {
                println!("Notary offices:\n");
                for o in offices {
                    println!("  ({}) {}", short_id(&o.id), o.name);
                }
            }
        }
        ListKind::Templates => {
            let templates = store.list_templates()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&templates)?);
            } else if templates.is_empty() {
                println!("No templates found.");
            } else {
                println!("Templates:\n");
                for t in templates {
                    let state = if t.active { "" } else { " (inactive)" };
                    println!("  ({}) {}{}", short_id(&t.id), t.name, state);
                }
            }
        }
        ListKind::Contracts => {
            let contracts = store.list_contracts()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&contracts)?);
            } else if contracts.is_empty() {
                println!("No contracts found.");
            } else {
                println!("Contracts:\n");
                for c in contracts {
                    let pdf = if c.has_artifact() { " [pdf]" } else { "" };
                    println!("  ({}) [{}] {}{}", short_id(&c.id), c.status, c.name, pdf);
                }
            }
        }
        ListKind::Documents => {
            let documents = store.list_documents()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&documents)?);
            } else if documents.is_empty() {
                println!("No documents found.");
            } else {
                println!("Documents:\n");
                for d in documents {
                    println!(
                        "  ({}) {} - {} bytes, property {}",
                        short_id(&d.id),
                        d.name,
                        d.size,
                        short_id(&d.property_id)
                    );
                }
            }
        }
    }
    Ok(())
}

pub fn handle_template_check(id: String, json: bool) -> Result<()> {
    let project = open_project()?;
    let store = project.store()?;

    let template_id = store.resolve_template_id(&id)?;
    let template = store
        .get_template(&template_id)?
        .ok_or(MinutaError::EntityNotFound(id))?;
    let uses = scan_placeholders(&template.content);

    if json {
        println!("{}", serde_json::to_string_pretty(&uses)?);
        return Ok(());
    }

    if uses.is_empty() {
        println!("Template '{}' has no placeholders.", template.name);
        return Ok(());
    }
    println!("Placeholders in '{}':\n", template.name);
    for u in &uses {
        let mark = if u.recognized { "ok" } else { "unknown" };
        println!("  {:<8} {}", mark, u.token);
    }
    let unknown = uses.iter().filter(|u| !u.recognized).count();
    if unknown > 0 {
        println!("\n{} unknown placeholder(s) will be left as written.", unknown);
    }
    Ok(())
}

pub fn handle_template_keys(json: bool) -> Result<()> {
    let keys: Vec<String> = PlaceholderKey::all().iter().map(|k| k.to_string()).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&keys)?);
    } else {
        for key in keys {
            println!("{{{{{}}}}}", key);
        }
    }
    Ok(())
}

pub fn handle_template_update(id: String, file: &Path) -> Result<()> {
    let project = open_project()?;
    let store = project.store()?;

    let template_id = store.resolve_template_id(&id)?;
    let mut template = store
        .get_template(&template_id)?
        .ok_or(MinutaError::EntityNotFound(id))?;
    template.content = fs::read_to_string(file)?;
    store.update_template(&template)?;

    println!("Updated template ({}) - {}", short_id(&template.id), template.name);
    Ok(())
}

fn build_selection(
    store: &SqliteStore,
    args: &SelectionArgs,
    name: String,
    description: Option<String>,
) -> Result<Selection> {
    let client_ids = args
        .clients
        .iter()
        .map(|id| store.resolve_client_id(id))
        .collect::<Result<Vec<_>>>()?;
    let notary_office_ids = args
        .notaries
        .iter()
        .map(|id| store.resolve_notary_office_id(id))
        .collect::<Result<Vec<_>>>()?;

    Ok(Selection {
        name,
        description,
        template_id: args
            .template
            .as_deref()
            .map(|id| store.resolve_template_id(id))
            .transpose()?,
        property_id: args
            .property
            .as_deref()
            .map(|id| store.resolve_property_id(id))
            .transpose()?,
        client_ids,
        primary_client_id: args
            .primary
            .as_deref()
            .map(|id| store.resolve_client_id(id))
            .transpose()?,
        notary_office_ids,
    })
}

pub fn handle_generate(args: SelectionArgs) -> Result<()> {
    let project = open_project()?;
    let store = project.store()?;

    if args.template.is_none() {
        return Err(MinutaError::InvalidStep {
            step: DraftStep::Select.to_string(),
            action: "generate without a template".to_string(),
        });
    }

    // Preview only needs a name to pass validation
    let selection = build_selection(&store, &args, "preview".to_string(), None)?;
    let mut session = DraftSession::new();
    session.select(selection)?;
    session.proceed(&store)?;
    println!("{}", session.content());
    session.close();
    Ok(())
}

fn exit_action(exit: ExitArgs) -> ExitAction {
    if exit.sign {
        ExitAction::Sign
    } else if exit.finalize {
        ExitAction::Finalize
    } else {
        ExitAction::SaveDraft
    }
}

/// Save a submission, reporting which finalize step failed if any.
fn save_submission(session: &Session, submission: Submission, json: bool) -> Result<()> {
    let lifecycle = session.lifecycle();
    let status = match submission.action {
        ExitAction::SaveDraft => {
            let id = lifecycle.save_draft(submission.target, &submission.content)?;
            return print_saved(&session.store, &id, json);
        }
        ExitAction::Finalize => FinalStatus::Final,
        ExitAction::Sign => FinalStatus::Signed,
    };

    let run = lifecycle.prepare_finalize(submission.target, &submission.content, status)?;
    let id = run.contract_id;
    match lifecycle.run_finalize(run) {
        Ok(outcome) => {
            if let Some(step) = outcome.resumed_from {
                eprintln!("Resumed finalize at step {}", step);
            }
            print_saved(&session.store, &id, json)
        }
        Err(e) => {
            report_finalize_failure(&session.store, &id, &e);
            Err(e)
        }
    }
}

fn report_finalize_failure(store: &SqliteStore, id: &Uuid, err: &MinutaError) {
    let step = store
        .load_run(id)
        .ok()
        .flatten()
        .and_then(|run| run.failure().map(|(step, _)| step));
    for line in finalize_failure_notice(id, err, step) {
        eprintln!("{}", line);
    }
}

/// What to tell the user when a finalize stops after the text was saved.
fn finalize_failure_notice(id: &Uuid, err: &MinutaError, step: Option<FinalizeStep>) -> Vec<String> {
    let failed_at = step.map(|s| format!(" (failed at {})", s)).unwrap_or_default();
    let first = if err.is_artifact_failure() {
        format!("Contract {} was saved, but its PDF was not produced{}.", short_id(id), failed_at)
    } else if step.is_some() {
        format!("Contract {} was saved, but its PDF was not recorded{}.", short_id(id), failed_at)
    } else {
        return Vec::new();
    };
    vec![
        first,
        format!("Run 'minuta contract finalize {}' to retry.", short_id(id)),
    ]
}

fn print_saved(store: &SqliteStore, id: &Uuid, json: bool) -> Result<()> {
    let contract = store
        .get_contract(id)?
        .ok_or_else(|| MinutaError::EntityNotFound(id.to_string()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&contract)?);
    } else {
        let pdf = contract
            .pdf_size
            .map(|size| format!(", pdf {} bytes", size))
            .unwrap_or_default();
        println!(
            "Saved contract ({}) [{}] - {}{}",
            short_id(&contract.id),
            contract.status,
            contract.name,
            pdf
        );
    }
    Ok(())
}

pub fn handle_contract_new(
    name: String,
    description: Option<String>,
    args: SelectionArgs,
    content: Option<&Path>,
    exit: ExitArgs,
    json: bool,
) -> Result<()> {
    let project = open_project()?;
    let session = Session::open(&project)?;

    let selection = build_selection(&session.store, &args, name, description)?;
    let mut draft = DraftSession::new();
    draft.select(selection)?;
    if draft.proceed(&session.store)? == DraftStep::Preview && content.is_some() {
        draft.begin_editing()?;
    }
    if let Some(path) = content {
        draft.set_content(fs::read_to_string(path)?)?;
    }

    let submission = draft.submission(exit_action(exit))?;
    draft.close();
    save_submission(&session, submission, json)
}

pub fn handle_contract_edit(id: String, content: &Path, exit: ExitArgs, json: bool) -> Result<()> {
    let project = open_project()?;
    let session = Session::open(&project)?;

    let contract_id = session.store.resolve_contract_id(&id)?;
    let mut draft = DraftSession::open_existing(&session.store, &contract_id)?;
    draft.set_content(fs::read_to_string(content)?)?;

    let submission = draft.submission(exit_action(exit))?;
    draft.close();
    save_submission(&session, submission, json)
}

pub fn handle_contract_finalize(id: String, sign: bool, json: bool) -> Result<()> {
    let project = open_project()?;
    let session = Session::open(&project)?;

    let contract_id = session.store.resolve_contract_id(&id)?;
    let contract = session
        .store
        .get_contract(&contract_id)?
        .ok_or(MinutaError::EntityNotFound(id))?;
    let status = if sign || contract.status == crate::entity::ContractStatus::Signed {
        FinalStatus::Signed
    } else {
        FinalStatus::Final
    };

    let submission = Submission {
        target: SaveTarget::Existing(contract_id),
        content: contract.content,
        action: match status {
            FinalStatus::Final => ExitAction::Finalize,
            FinalStatus::Signed => ExitAction::Sign,
        },
    };
    save_submission(&session, submission, json)
}

fn print_run(run: &FinalizeRun) {
    println!(
        "\nFinalize run ({} -> {}, attempt {}):",
        run.started_at.format("%Y-%m-%d %H:%M"),
        run.target_status,
        run.attempts
    );
    for record in &run.steps {
        let outcome = match &record.outcome {
            StepOutcome::Pending => "pending".to_string(),
            StepOutcome::Done => "done".to_string(),
            StepOutcome::Failed(message) => format!("failed: {}", message),
        };
        println!("  {:<16} {}", record.step, outcome);
    }
}

fn print_contract(store: &SqliteStore, contract: &Contract) -> Result<()> {
    println!("Contract {} - {}", short_id(&contract.id), contract.name);
    println!("Status: {}", contract.status);
    if let Some(description) = &contract.description {
        println!("Description: {}", description);
    }
    if let Some(template_id) = &contract.template_id {
        let name = store
            .get_template(template_id)?
            .map(|t| t.name)
            .unwrap_or_else(|| "(deleted)".to_string());
        println!("Template: {} ({})", name, short_id(template_id));
    }
    if let Some(property) = store.get_property(&contract.property_id)? {
        println!("Property: {}", property.summary());
    }
    let mut clients = Vec::new();
    for id in &contract.client_ids {
        let name = store
            .get_client(id)?
            .map(|c| c.name)
            .unwrap_or_else(|| short_id(id));
        let marker = if *id == contract.primary_client_id { "*" } else { "" };
        clients.push(format!("{}{}", name, marker));
    }
    println!("Clients: {}", clients.join(", "));
    match (&contract.pdf_storage_id, contract.pdf_size) {
        (Some(storage_id), size) => println!(
            "PDF: {} ({} bytes)",
            storage_id,
            size.unwrap_or_default()
        ),
        (None, _) => println!("PDF: none"),
    }
    println!("Updated: {}", contract.updated_at.format("%Y-%m-%d %H:%M"));
    println!("\n{}", contract.content);
    Ok(())
}

pub fn handle_contract_get(id: String, json: bool) -> Result<()> {
    let project = open_project()?;
    let store = project.store()?;

    let contract_id = store.resolve_contract_id(&id)?;
    let contract = store
        .get_contract(&contract_id)?
        .ok_or(MinutaError::EntityNotFound(id))?;
    let run = store.load_run(&contract_id)?;

    if json {
        let value = serde_json::json!({
            "contract": contract,
            "finalize_run": run,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    print_contract(&store, &contract)?;
    if let Some(run) = &run {
        print_run(run);
    }
    Ok(())
}

pub fn handle_contract_delete(id: String, force: bool) -> Result<()> {
    let project = open_project()?;
    let session = Session::open(&project)?;

    let contract_id = session.store.resolve_contract_id(&id)?;
    let contract = session
        .store
        .get_contract(&contract_id)?
        .ok_or(MinutaError::EntityNotFound(id))?;

    // Confirm deletion unless --force is used
    if !force {
        eprintln!(
            "Delete contract ({}) [{}] - {}? [y/N] ",
            short_id(&contract.id),
            contract.status,
            contract.name
        );

        if atty::is(atty::Stream::Stdin) {
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Cancelled.");
                return Ok(());
            }
        } else {
            return Err(MinutaError::Storage(
                "Use --force to delete in non-interactive mode".to_string(),
            ));
        }
    }

    session.lifecycle().delete_contract(&contract.id)?;
    println!("Deleted contract ({}) - {}", short_id(&contract.id), contract.name);
    Ok(())
}

pub fn handle_contract_pdf(id: String) -> Result<()> {
    let project = open_project()?;
    let session = Session::open(&project)?;

    let contract_id = session.store.resolve_contract_id(&id)?;
    match session.lifecycle().artifact_url(&contract_id)? {
        Some(url) => println!("{}", url),
        None => println!("No PDF for this contract."),
    }
    Ok(())
}

/// Render outside a project with default options, inside one with its config.
pub fn handle_render(input: &Path, output: &Path) -> Result<()> {
    let renderer = match open_project() {
        Ok(project) => renderer_for(&project),
        Err(MinutaError::NotInitialized) => Renderer::new(RenderOptions::default()),
        Err(e) => return Err(e),
    };

    let html = fs::read_to_string(input)?;
    let pdf = renderer.render(&html)?;
    fs::write(output, &pdf)?;
    println!("Wrote {} ({} bytes)", output.display(), pdf.len());
    Ok(())
}
