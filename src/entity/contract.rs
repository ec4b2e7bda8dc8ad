// src/entity/contract.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MinutaError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    #[default]
    Draft,
    Final,
    Signed,
}

impl ContractStatus {
    fn rank(&self) -> u8 {
        match self {
            ContractStatus::Draft => 0,
            ContractStatus::Final => 1,
            ContractStatus::Signed => 2,
        }
    }

    /// Status only moves forward: draft -> final -> signed.
    /// Re-entering the current status is allowed (re-saving a draft,
    /// retrying a finalize).
    pub fn can_transition_to(&self, next: ContractStatus) -> bool {
        next.rank() >= self.rank()
    }

    pub fn transition_to(&self, next: ContractStatus) -> Result<ContractStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(MinutaError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractStatus::Draft => write!(f, "draft"),
            ContractStatus::Final => write!(f, "final"),
            ContractStatus::Signed => write!(f, "signed"),
        }
    }
}

impl std::str::FromStr for ContractStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(ContractStatus::Draft),
            "final" => Ok(ContractStatus::Final),
            "signed" => Ok(ContractStatus::Signed),
            _ => Err(format!("Invalid contract status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// None for contracts typed freeform
    pub template_id: Option<Uuid>,
    pub property_id: Uuid,
    /// Client used for placeholders and shown as the contract's client
    pub primary_client_id: Uuid,
    pub client_ids: Vec<Uuid>,
    pub notary_office_ids: Vec<Uuid>,
    pub content: String,
    pub status: ContractStatus,
    pub pdf_storage_id: Option<String>,
    pub pdf_size: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    pub fn has_artifact(&self) -> bool {
        self.pdf_storage_id.is_some()
    }
}

/// Fields needed to create a contract record.
#[derive(Debug, Clone)]
pub struct NewContract {
    pub name: String,
    pub description: Option<String>,
    pub template_id: Option<Uuid>,
    pub property_id: Uuid,
    pub primary_client_id: Uuid,
    pub client_ids: Vec<Uuid>,
    pub notary_office_ids: Vec<Uuid>,
    pub content: String,
    pub status: ContractStatus,
}

impl NewContract {
    pub fn into_contract(self, id: Uuid) -> Contract {
        let now = Utc::now();
        Contract {
            id,
            name: self.name,
            description: self.description,
            template_id: self.template_id,
            property_id: self.property_id,
            primary_client_id: self.primary_client_id,
            client_ids: self.client_ids,
            notary_office_ids: self.notary_office_ids,
            content: self.content,
            status: self.status,
            pdf_storage_id: None,
            pdf_size: None,
            created_at: now,
            updated_at: now,
        }
    }
}
