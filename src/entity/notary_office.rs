// src/entity/notary_office.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotaryOffice {
    #[serde(default = "super::new_id")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub cnpj: Option<String>,
    /// Name of the notary in charge of the office
    #[serde(default)]
    pub responsible: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub complement: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default = "super::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "super::now")]
    pub updated_at: DateTime<Utc>,
}

impl NotaryOffice {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }
}
