// src/entity/property.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    #[default]
    House,
    Apartment,
    Land,
    Commercial,
    Rural,
}

impl PropertyType {
    pub fn label(&self) -> &'static str {
        match self {
            PropertyType::House => "Casa",
            PropertyType::Apartment => "Apartamento",
            PropertyType::Land => "Terreno",
            PropertyType::Commercial => "Comercial",
            PropertyType::Rural => "Rural",
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyType::House => write!(f, "house"),
            PropertyType::Apartment => write!(f, "apartment"),
            PropertyType::Land => write!(f, "land"),
            PropertyType::Commercial => write!(f, "commercial"),
            PropertyType::Rural => write!(f, "rural"),
        }
    }
}

impl std::str::FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "house" => Ok(PropertyType::House),
            "apartment" => Ok(PropertyType::Apartment),
            "land" => Ok(PropertyType::Land),
            "commercial" => Ok(PropertyType::Commercial),
            "rural" => Ok(PropertyType::Rural),
            _ => Err(format!("Invalid property type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    #[serde(default = "super::new_id")]
    pub id: Uuid,
    pub street: String,
    pub number: String,
    #[serde(default)]
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    /// Area in square meters
    #[serde(default)]
    pub area: Option<f64>,
    /// Market value in BRL
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default, rename = "type")]
    pub property_type: PropertyType,
    #[serde(default = "super::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "super::now")]
    pub updated_at: DateTime<Utc>,
}

impl Property {
    pub fn new(
        street: impl Into<String>,
        number: impl Into<String>,
        neighborhood: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        zip_code: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            street: street.into(),
            number: number.into(),
            complement: None,
            neighborhood: neighborhood.into(),
            city: city.into(),
            state: state.into(),
            zip_code: zip_code.into(),
            area: None,
            value: None,
            property_type: PropertyType::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Short one-line description used in listings
    pub fn summary(&self) -> String {
        format!("{}, {} - {}/{}", self.street, self.number, self.city, self.state)
    }
}
