// src/entity/client.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    Single,
    CommonLawMarriage,
    Married,
    Widowed,
    Divorced,
}

impl MaritalStatus {
    /// Label used when the status is written into a contract.
    pub fn label(&self) -> &'static str {
        match self {
            MaritalStatus::Single => "Solteiro(a)",
            MaritalStatus::CommonLawMarriage => "União Estável",
            MaritalStatus::Married => "Casado(a)",
            MaritalStatus::Widowed => "Viúvo(a)",
            MaritalStatus::Divorced => "Divorciado(a)",
        }
    }
}

impl std::fmt::Display for MaritalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaritalStatus::Single => write!(f, "single"),
            MaritalStatus::CommonLawMarriage => write!(f, "common_law_marriage"),
            MaritalStatus::Married => write!(f, "married"),
            MaritalStatus::Widowed => write!(f, "widowed"),
            MaritalStatus::Divorced => write!(f, "divorced"),
        }
    }
}

impl std::str::FromStr for MaritalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "single" => Ok(MaritalStatus::Single),
            "common_law_marriage" => Ok(MaritalStatus::CommonLawMarriage),
            "married" => Ok(MaritalStatus::Married),
            "widowed" => Ok(MaritalStatus::Widowed),
            "divorced" => Ok(MaritalStatus::Divorced),
            _ => Err(format!("Invalid marital status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    #[serde(default = "super::new_id")]
    pub id: Uuid,
    pub name: String,
    /// Tax id digits (CPF for people, CNPJ for companies)
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub marital_status: Option<MaritalStatus>,
    #[serde(default)]
    pub father_name: Option<String>,
    #[serde(default)]
    pub mother_name: Option<String>,
    #[serde(default = "super::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "super::now")]
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            cpf: None,
            email: None,
            phone: None,
            marital_status: None,
            father_name: None,
            mother_name: None,
            created_at: now,
            updated_at: now,
        }
    }
}
