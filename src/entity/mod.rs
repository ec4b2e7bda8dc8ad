mod client;
mod contract;
mod document;
mod notary_office;
mod property;
mod template;

pub use client::{Client, MaritalStatus};
pub use contract::{Contract, ContractStatus, NewContract};
pub use document::PropertyDocument;
pub use notary_office::NotaryOffice;
pub use property::{Property, PropertyType};
pub use template::ContractTemplate;

use chrono::{DateTime, Utc};

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

pub(crate) fn new_id() -> uuid::Uuid {
    uuid::Uuid::new_v4()
}
