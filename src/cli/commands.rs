use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "minuta")]
#[command(version, about = "Contract generation and lifecycle engine")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new minuta project in the current directory
    Init,

    /// Add a client, property, notary office or template
    Add(AddCommand),

    /// List entities of one kind
    List {
        #[arg(value_enum, value_name = "KIND")]
        kind: ListKind,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect and maintain templates
    Template(TemplateCommand),

    /// Generate contract content from a template without saving it
    Generate {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Create, edit and finalize contracts
    Contract(ContractCommand),

    /// Render an HTML file to PDF
    Render {
        /// HTML input file
        input: PathBuf,

        /// PDF output file
        #[arg(long, short = 'o')]
        output: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListKind {
    #[value(alias = "client")]
    Clients,
    #[value(alias = "property")]
    Properties,
    #[value(alias = "notary")]
    Notaries,
    #[value(alias = "template")]
    Templates,
    #[value(alias = "contract")]
    Contracts,
    #[value(alias = "document")]
    Documents,
}

#[derive(Args, Debug)]
pub struct AddCommand {
    #[command(subcommand)]
    pub entity: AddEntity,
}

#[derive(Subcommand, Debug)]
pub enum AddEntity {
    /// Add a client from a YAML or JSON file
    Client {
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a property from a YAML or JSON file
    Property {
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a notary office from a YAML or JSON file
    Notary {
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a template whose body is read from an HTML file
    Template {
        /// Template name
        name: String,

        /// HTML body with {{placeholder}} tokens
        file: PathBuf,

        #[arg(long)]
        description: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct TemplateCommand {
    #[command(subcommand)]
    pub action: TemplateAction,
}

#[derive(Subcommand, Debug)]
pub enum TemplateAction {
    /// List the placeholders of a template and flag unknown keys
    Check {
        /// Template ID (UUID or unique prefix)
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List every recognized placeholder key
    Keys {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace a template body. Rejected once a contract uses the template
    Update {
        /// Template ID (UUID or unique prefix)
        id: String,

        /// New HTML body
        file: PathBuf,
    },
}

/// Template and entities picked for a contract.
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Template ID; without one the contract starts empty
    #[arg(long)]
    pub template: Option<String>,

    /// Client ID (can be specified multiple times)
    #[arg(long = "client", short = 'c')]
    pub clients: Vec<String>,

    /// Client used for placeholders (defaults to the first --client)
    #[arg(long)]
    pub primary: Option<String>,

    /// Property ID
    #[arg(long)]
    pub property: Option<String>,

    /// Notary office ID (can be specified multiple times)
    #[arg(long = "notary", short = 'n')]
    pub notaries: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ContractCommand {
    #[command(subcommand)]
    pub action: ContractAction,
}

/// How a contract session ends.
#[derive(Args, Debug, Clone, Copy)]
pub struct ExitArgs {
    /// Finalize and render the PDF instead of saving a draft
    #[arg(long, conflicts_with = "sign")]
    pub finalize: bool,

    /// Finalize as signed
    #[arg(long)]
    pub sign: bool,
}

#[derive(Subcommand, Debug)]
pub enum ContractAction {
    /// Create a contract, from a template or empty
    New {
        /// Contract name
        #[arg(long)]
        name: String,

        #[arg(long)]
        description: Option<String>,

        #[command(flatten)]
        selection: SelectionArgs,

        /// HTML file replacing the generated content
        #[arg(long)]
        content: Option<PathBuf>,

        #[command(flatten)]
        exit: ExitArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Edit the content of a draft contract
    Edit {
        /// Contract ID (UUID or unique prefix)
        id: String,

        /// HTML file with the new content
        #[arg(long)]
        content: PathBuf,

        #[command(flatten)]
        exit: ExitArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Finalize a contract with its saved content, resuming a failed attempt
    Finalize {
        /// Contract ID (UUID or unique prefix)
        id: String,

        /// Finalize as signed
        #[arg(long)]
        sign: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a contract and its last finalize run
    Get {
        /// Contract ID (UUID or unique prefix)
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a contract and its PDF
    Delete {
        /// Contract ID (UUID or unique prefix)
        id: String,

        /// Skip confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Print the download URL of a contract's PDF
    Pdf {
        /// Contract ID (UUID or unique prefix)
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_contract_new() {
        let cli = Cli::try_parse_from([
            "minuta", "contract", "new", "--name", "Venda", "--template", "abcd", "-c", "1111",
            "-c", "2222", "--property", "3333", "--finalize",
        ])
        .unwrap();
        match cli.command {
            Commands::Contract(ContractCommand {
                action:
                    ContractAction::New {
                        name,
                        selection,
                        exit,
                        ..
                    },
            }) => {
                assert_eq!(name, "Venda");
                assert_eq!(selection.clients, vec!["1111", "2222"]);
                assert!(exit.finalize && !exit.sign);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_finalize_and_sign_conflict() {
        let result = Cli::try_parse_from([
            "minuta", "contract", "edit", "abcd", "--content", "x.html", "--finalize", "--sign",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_list_kind_aliases() {
        let cli = Cli::try_parse_from(["minuta", "list", "client"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::List {
                kind: ListKind::Clients,
                ..
            }
        ));
    }
}
