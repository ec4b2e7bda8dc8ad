mod commands;
mod handlers;

pub use commands::{
    AddCommand, AddEntity, Cli, Commands, ContractAction, ContractCommand, ExitArgs, ListKind,
    SelectionArgs, TemplateAction, TemplateCommand,
};
pub use handlers::{
    handle_add_client, handle_add_notary, handle_add_property, handle_add_template,
    handle_contract_delete, handle_contract_edit, handle_contract_finalize, handle_contract_get,
    handle_contract_new, handle_contract_pdf, handle_generate, handle_init, handle_list,
    handle_render, handle_template_check, handle_template_keys, handle_template_update,
};
