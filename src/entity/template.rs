// src/entity/template.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reusable contract body with `{{namespace.field}}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractTemplate {
    #[serde(default = "super::new_id")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub content: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default = "super::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "super::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl ContractTemplate {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            content: content.into(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
