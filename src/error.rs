use thiserror::Error;
use uuid::Uuid;

/// A referenced entity could not be loaded while generating a contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Modelo não encontrado")]
    TemplateNotFound(Uuid),

    #[error("Cliente não encontrado")]
    ClientNotFound(Uuid),

    #[error("Imóvel não encontrado")]
    PropertyNotFound(Uuid),

    #[error("Cartório não encontrado")]
    NotaryOfficeNotFound(Uuid),
}

/// Form validation failures that block a draft transition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Nome do contrato é obrigatório")]
    NameRequired,

    #[error("Selecione pelo menos um cliente")]
    ClientRequired,

    #[error("O cliente principal deve estar entre os clientes selecionados")]
    PrimaryClientNotSelected,

    #[error("Selecione um imóvel")]
    PropertyRequired,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("could not create rendering surface: {0}")]
    SurfaceCreation(String),

    #[error("rasterization failed: {0}")]
    Rasterization(String),

    #[error("PDF assembly failed: {0}")]
    PdfAssembly(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("no upload destination available: {0}")]
    Destination(String),

    #[error("upload rejected: {0}")]
    Rejected(String),

    #[error("upload transfer failed: {0}")]
    Transfer(String),
}

#[derive(Error, Debug)]
pub enum MinutaError {
    #[error("Not in a minuta project. Run 'minuta init' first.")]
    NotInitialized,

    #[error("Already initialized. Remove .minuta/ to reinitialize.")]
    AlreadyInitialized,

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Ambiguous id prefix '{0}'")]
    AmbiguousId(String),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("PDF generation failed: {0}")]
    Render(#[from] RenderError),

    #[error("PDF upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Action '{action}' is not available in step '{step}'")]
    InvalidStep { step: String, action: String },

    #[error("Template {0} is referenced by a contract and cannot be modified")]
    TemplateInUse(Uuid),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl MinutaError {
    /// True for failures that happen after the contract text was saved.
    pub fn is_artifact_failure(&self) -> bool {
        matches!(self, MinutaError::Render(_) | MinutaError::Upload(_))
    }
}

pub type Result<T> = std::result::Result<T, MinutaError>;
