use clap::Parser;
use minuta::cli::{
    handle_add_client, handle_add_notary, handle_add_property, handle_add_template,
    handle_contract_delete, handle_contract_edit, handle_contract_finalize, handle_contract_get,
    handle_contract_new, handle_contract_pdf, handle_generate, handle_init, handle_list,
    handle_render, handle_template_check, handle_template_keys, handle_template_update, AddEntity,
    Cli, Commands, ContractAction, TemplateAction,
};
use minuta::config::Config;
use minuta::storage::{find_project_root, Project};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_ENV: &str = "MINUTA_LOG";

/// MINUTA_LOG wins, then the project's configured level.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        let level = Project::open(&find_project_root())
            .map(|project| project.config().logging.level.clone())
            .unwrap_or_else(|_| Config::default().logging.level);
        tracing_subscriber::EnvFilter::new(format!("minuta={}", level))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Init => handle_init(),
        Commands::Add(add) => match add.entity {
            AddEntity::Client { file, json } => handle_add_client(&file, json),
            AddEntity::Property { file, json } => handle_add_property(&file, json),
            AddEntity::Notary { file, json } => handle_add_notary(&file, json),
            AddEntity::Template {
                name,
                file,
                description,
                json,
            } => handle_add_template(name, &file, description, json),
        },
        Commands::List { kind, json } => handle_list(kind, json),
        Commands::Template(template) => match template.action {
            TemplateAction::Check { id, json } => handle_template_check(id, json),
            TemplateAction::Keys { json } => handle_template_keys(json),
            TemplateAction::Update { id, file } => handle_template_update(id, &file),
        },
        Commands::Generate { selection } => handle_generate(selection),
        Commands::Contract(contract) => match contract.action {
            ContractAction::New {
                name,
                description,
                selection,
                content,
                exit,
                json,
            } => handle_contract_new(name, description, selection, content.as_deref(), exit, json),
            ContractAction::Edit {
                id,
                content,
                exit,
                json,
            } => handle_contract_edit(id, &content, exit, json),
            ContractAction::Finalize { id, sign, json } => handle_contract_finalize(id, sign, json),
            ContractAction::Get { id, json } => handle_contract_get(id, json),
            ContractAction::Delete { id, force } => handle_contract_delete(id, force),
            ContractAction::Pdf { id } => handle_contract_pdf(id),
        },
        Commands::Render { input, output } => handle_render(&input, &output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
