// src/entity/document.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored file listed among a property's documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDocument {
    pub id: Uuid,
    pub property_id: Uuid,
    /// Contract that produced this document, if any
    pub contract_id: Option<Uuid>,
    pub name: String,
    pub storage_id: String,
    pub mime_type: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

impl PropertyDocument {
    pub fn new(
        property_id: Uuid,
        name: impl Into<String>,
        storage_id: impl Into<String>,
        mime_type: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            property_id,
            contract_id: None,
            name: name.into(),
            storage_id: storage_id.into(),
            mime_type: mime_type.into(),
            size,
            created_at: Utc::now(),
        }
    }
}
