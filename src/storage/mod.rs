//! Persistence collaborators of the contract engine.
//!
//! The engine only talks to the traits below; `SqliteStore` and
//! `FsBlobStore` are the implementations used by the CLI.

mod blob_store;
mod project;
mod sqlite_store;

pub use blob_store::FsBlobStore;
pub use project::{find_project_root, Project, MINUTA_DIR};
pub use sqlite_store::SqliteStore;

use uuid::Uuid;

use crate::entity::{
    Client, Contract, ContractStatus, ContractTemplate, NewContract, NotaryOffice, Property,
    PropertyDocument,
};
use crate::error::{Result, UploadError};
use crate::lifecycle::FinalizeRun;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Update payload for a contract
#[derive(Debug, Default, Clone)]
pub struct ContractUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>, // Some(None) to clear
    pub content: Option<String>,
    pub status: Option<ContractStatus>,
    pub pdf_storage_id: Option<Option<String>>,
    pub pdf_size: Option<Option<u64>>,
}

impl ContractUpdate {
    pub fn apply(self, contract: &mut Contract) {
        if let Some(name) = self.name {
            contract.name = name;
        }
        if let Some(description) = self.description {
            contract.description = description;
        }
        if let Some(content) = self.content {
            contract.content = content;
        }
        if let Some(status) = self.status {
            contract.status = status;
        }
        if let Some(storage_id) = self.pdf_storage_id {
            contract.pdf_storage_id = storage_id;
        }
        if let Some(size) = self.pdf_size {
            contract.pdf_size = size;
        }
        contract.updated_at = chrono::Utc::now();
    }
}

/// Read access to business entities and read/write access to contracts.
pub trait EntityStore {
    fn get_template(&self, id: &Uuid) -> Result<Option<ContractTemplate>>;
    fn get_client(&self, id: &Uuid) -> Result<Option<Client>>;
    fn get_property(&self, id: &Uuid) -> Result<Option<Property>>;
    fn get_notary_office(&self, id: &Uuid) -> Result<Option<NotaryOffice>>;
    fn get_contract(&self, id: &Uuid) -> Result<Option<Contract>>;
    fn create_contract(&self, fields: NewContract) -> Result<Uuid>;
    fn update_contract(&self, id: &Uuid, update: ContractUpdate) -> Result<()>;
    fn delete_contract(&self, id: &Uuid) -> Result<()>;
}

/// Receipt returned by a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub storage_id: String,
    pub size: u64,
}

/// External blob storage for rendered artifacts.
pub trait BlobStorage {
    /// Hand out a one-shot destination for the next upload.
    fn request_upload_destination(&self) -> std::result::Result<String, UploadError>;
    fn upload(
        &self,
        destination: &str,
        blob: &[u8],
        content_type: &str,
    ) -> std::result::Result<UploadReceipt, UploadError>;
    fn download_url(&self, storage_id: &str) -> Result<Option<String>>;
    fn delete(&self, storage_id: &str) -> Result<()>;
}

/// Documents listed alongside a property.
pub trait DocumentRegistry {
    fn attach(&self, document: &PropertyDocument) -> Result<()>;
    fn detach(&self, storage_id: &str) -> Result<()>;
    fn documents_for_property(&self, property_id: &Uuid) -> Result<Vec<PropertyDocument>>;
}

/// Persisted progress of finalize runs, one per contract.
pub trait FinalizeLedger {
    fn load_run(&self, contract_id: &Uuid) -> Result<Option<FinalizeRun>>;
    fn save_run(&self, run: &FinalizeRun) -> Result<()>;
    fn clear_run(&self, contract_id: &Uuid) -> Result<()>;
}
