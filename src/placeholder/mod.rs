//! Placeholder keys and their resolution against business data.
//!
//! Keys are parsed into [`PlaceholderKey`] once; resolution is an exhaustive
//! match over that enum, so a key that does not parse is the only way to get
//! an unresolved token.

pub mod format;

use chrono::NaiveDate;

use crate::entity::{Client, NotaryOffice, Property};

use self::format::{
    format_area, format_currency, format_extended_date, format_phone, format_short_date,
    format_tax_id, format_zip_code,
};

/// Entities used to resolve the placeholders of one generation.
#[derive(Debug, Clone, Copy)]
pub struct ReplacementData<'a> {
    pub client: &'a Client,
    pub property: &'a Property,
    pub notary_office: Option<&'a NotaryOffice>,
}

impl<'a> ReplacementData<'a> {
    pub fn new(
        client: &'a Client,
        property: &'a Property,
        notary_office: Option<&'a NotaryOffice>,
    ) -> Self {
        Self {
            client,
            property,
            notary_office,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientField {
    Name,
    Cpf,
    Email,
    Phone,
    MaritalStatus,
    FatherName,
    MotherName,
}

impl ClientField {
    pub const ALL: [ClientField; 7] = [
        ClientField::Name,
        ClientField::Cpf,
        ClientField::Email,
        ClientField::Phone,
        ClientField::MaritalStatus,
        ClientField::FatherName,
        ClientField::MotherName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientField::Name => "name",
            ClientField::Cpf => "cpf",
            ClientField::Email => "email",
            ClientField::Phone => "phone",
            ClientField::MaritalStatus => "maritalStatus",
            ClientField::FatherName => "fatherName",
            ClientField::MotherName => "motherName",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyField {
    Address,
    Street,
    Number,
    Complement,
    Neighborhood,
    City,
    State,
    ZipCode,
    Area,
    Value,
    Type,
}

impl PropertyField {
    pub const ALL: [PropertyField; 11] = [
        PropertyField::Address,
        PropertyField::Street,
        PropertyField::Number,
        PropertyField::Complement,
        PropertyField::Neighborhood,
        PropertyField::City,
        PropertyField::State,
        PropertyField::ZipCode,
        PropertyField::Area,
        PropertyField::Value,
        PropertyField::Type,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyField::Address => "address",
            PropertyField::Street => "street",
            PropertyField::Number => "number",
            PropertyField::Complement => "complement",
            PropertyField::Neighborhood => "neighborhood",
            PropertyField::City => "city",
            PropertyField::State => "state",
            PropertyField::ZipCode => "zipCode",
            PropertyField::Area => "area",
            PropertyField::Value => "value",
            PropertyField::Type => "type",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotaryOfficeField {
    Name,
    Cnpj,
    Responsible,
    Phone,
    Email,
    Address,
    Street,
    Number,
    Complement,
    Neighborhood,
    City,
    State,
    ZipCode,
}

impl NotaryOfficeField {
    pub const ALL: [NotaryOfficeField; 13] = [
        NotaryOfficeField::Name,
        NotaryOfficeField::Cnpj,
        NotaryOfficeField::Responsible,
        NotaryOfficeField::Phone,
        NotaryOfficeField::Email,
        NotaryOfficeField::Address,
        NotaryOfficeField::Street,
        NotaryOfficeField::Number,
        NotaryOfficeField::Complement,
        NotaryOfficeField::Neighborhood,
        NotaryOfficeField::City,
        NotaryOfficeField::State,
        NotaryOfficeField::ZipCode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotaryOfficeField::Name => "name",
            NotaryOfficeField::Cnpj => "cnpj",
            NotaryOfficeField::Responsible => "responsible",
            NotaryOfficeField::Phone => "phone",
            NotaryOfficeField::Email => "email",
            NotaryOfficeField::Address => "address",
            NotaryOfficeField::Street => "street",
            NotaryOfficeField::Number => "number",
            NotaryOfficeField::Complement => "complement",
            NotaryOfficeField::Neighborhood => "neighborhood",
            NotaryOfficeField::City => "city",
            NotaryOfficeField::State => "state",
            NotaryOfficeField::ZipCode => "zipCode",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateField {
    Current,
    CurrentExtended,
}

impl DateField {
    pub const ALL: [DateField; 2] = [DateField::Current, DateField::CurrentExtended];

    pub fn as_str(&self) -> &'static str {
        match self {
            DateField::Current => "current",
            DateField::CurrentExtended => "currentExtended",
        }
    }
}

/// A recognised `namespace.field` placeholder key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderKey {
    Client(ClientField),
    Property(PropertyField),
    NotaryOffice(NotaryOfficeField),
    Date(DateField),
}

impl PlaceholderKey {
    /// Parse a trimmed key like `client.name`. Unknown keys yield `None`.
    pub fn parse(key: &str) -> Option<Self> {
        let (namespace, field) = key.split_once('.')?;
        match namespace {
            "client" => ClientField::ALL
                .into_iter()
                .find(|f| f.as_str() == field)
                .map(PlaceholderKey::Client),
            "property" => PropertyField::ALL
                .into_iter()
                .find(|f| f.as_str() == field)
                .map(PlaceholderKey::Property),
            "notaryOffice" => NotaryOfficeField::ALL
                .into_iter()
                .find(|f| f.as_str() == field)
                .map(PlaceholderKey::NotaryOffice),
            "date" => DateField::ALL
                .into_iter()
                .find(|f| f.as_str() == field)
                .map(PlaceholderKey::Date),
            _ => None,
        }
    }

    /// Every recognised key, grouped by namespace.
    pub fn all() -> Vec<PlaceholderKey> {
        let mut keys = Vec::new();
        keys.extend(ClientField::ALL.into_iter().map(PlaceholderKey::Client));
        keys.extend(PropertyField::ALL.into_iter().map(PlaceholderKey::Property));
        keys.extend(
            NotaryOfficeField::ALL
                .into_iter()
                .map(PlaceholderKey::NotaryOffice),
        );
        keys.extend(DateField::ALL.into_iter().map(PlaceholderKey::Date));
        keys
    }

    pub fn namespace(&self) -> &'static str {
        match self {
            PlaceholderKey::Client(_) => "client",
            PlaceholderKey::Property(_) => "property",
            PlaceholderKey::NotaryOffice(_) => "notaryOffice",
            PlaceholderKey::Date(_) => "date",
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            PlaceholderKey::Client(f) => f.as_str(),
            PlaceholderKey::Property(f) => f.as_str(),
            PlaceholderKey::NotaryOffice(f) => f.as_str(),
            PlaceholderKey::Date(f) => f.as_str(),
        }
    }

    /// Resolve this key against `data`, with `today` as the resolution date.
    ///
    /// `None` means the source field is absent or empty; the caller keeps the
    /// original token in that case.
    pub fn resolve(&self, data: &ReplacementData<'_>, today: NaiveDate) -> Option<String> {
        match self {
            PlaceholderKey::Client(field) => resolve_client(*field, data.client),
            PlaceholderKey::Property(field) => resolve_property(*field, data.property),
            PlaceholderKey::NotaryOffice(field) => {
                Some(resolve_notary_office(*field, data.notary_office))
            }
            PlaceholderKey::Date(DateField::Current) => Some(format_short_date(today)),
            PlaceholderKey::Date(DateField::CurrentExtended) => Some(format_extended_date(today)),
        }
    }
}

impl std::fmt::Display for PlaceholderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.namespace(), self.field())
    }
}

/// Resolve a raw key string. Unknown keys and empty fields yield `None`.
pub fn resolve(key: &str, data: &ReplacementData<'_>, today: NaiveDate) -> Option<String> {
    PlaceholderKey::parse(key)?.resolve(data, today)
}

fn non_empty(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn opt_non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().and_then(non_empty)
}

fn or_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn compose_address(street: &str, number: &str, complement: Option<&str>) -> String {
    let mut address = if number.trim().is_empty() {
        street.to_string()
    } else {
        format!("{}, {}", street, number)
    };
    if let Some(complement) = complement.filter(|c| !c.trim().is_empty()) {
        address.push_str(" - ");
        address.push_str(complement);
    }
    address
}

fn resolve_client(field: ClientField, client: &Client) -> Option<String> {
    match field {
        ClientField::Name => non_empty(&client.name),
        ClientField::Cpf => Some(
            client
                .cpf
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(format_tax_id)
                .unwrap_or_default(),
        ),
        ClientField::Email => opt_non_empty(&client.email),
        ClientField::Phone => Some(
            client
                .phone
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(format_phone)
                .unwrap_or_default(),
        ),
        ClientField::MaritalStatus => client.marital_status.map(|s| s.label().to_string()),
        ClientField::FatherName => Some(or_empty(&client.father_name)),
        ClientField::MotherName => Some(or_empty(&client.mother_name)),
    }
}

fn resolve_property(field: PropertyField, property: &Property) -> Option<String> {
    match field {
        PropertyField::Address => non_empty(&property.street).map(|_| {
            compose_address(
                &property.street,
                &property.number,
                property.complement.as_deref(),
            )
        }),
        PropertyField::Street => non_empty(&property.street),
        PropertyField::Number => non_empty(&property.number),
        PropertyField::Complement => Some(or_empty(&property.complement)),
        PropertyField::Neighborhood => non_empty(&property.neighborhood),
        PropertyField::City => non_empty(&property.city),
        PropertyField::State => non_empty(&property.state),
        PropertyField::ZipCode => non_empty(&property.zip_code).map(|z| format_zip_code(&z)),
        PropertyField::Area => property.area.map(format_area),
        PropertyField::Value => property.value.map(format_currency),
        PropertyField::Type => Some(property.property_type.label().to_string()),
    }
}

/// Notary office data is optional: every field resolves, to `""` when absent.
fn resolve_notary_office(field: NotaryOfficeField, office: Option<&NotaryOffice>) -> String {
    let Some(office) = office else {
        return String::new();
    };
    match field {
        NotaryOfficeField::Name => office.name.clone(),
        NotaryOfficeField::Cnpj => office.cnpj.as_deref().map(format_tax_id).unwrap_or_default(),
        NotaryOfficeField::Responsible => or_empty(&office.responsible),
        NotaryOfficeField::Phone => office.phone.as_deref().map(format_phone).unwrap_or_default(),
        NotaryOfficeField::Email => or_empty(&office.email),
        NotaryOfficeField::Address => match office.street.as_deref() {
            Some(street) if !street.trim().is_empty() => compose_address(
                street,
                office.number.as_deref().unwrap_or_default(),
                office.complement.as_deref(),
            ),
            _ => String::new(),
        },
        NotaryOfficeField::Street => or_empty(&office.street),
        NotaryOfficeField::Number => or_empty(&office.number),
        NotaryOfficeField::Complement => or_empty(&office.complement),
        NotaryOfficeField::Neighborhood => or_empty(&office.neighborhood),
        NotaryOfficeField::City => or_empty(&office.city),
        NotaryOfficeField::State => or_empty(&office.state),
        NotaryOfficeField::ZipCode => office
            .zip_code
            .as_deref()
            .map(format_zip_code)
            .unwrap_or_default(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::entity::{Client, MaritalStatus, NotaryOffice, Property, PropertyType};

    pub fn client() -> Client {
        let mut client = Client::new("Ana Silva");
        client.cpf = Some("12345678901".to_string());
        client.email = Some("ana@example.com".to_string());
        client.phone = Some("31987654321".to_string());
        client.marital_status = Some(MaritalStatus::Married);
        client.mother_name = Some("Maria Silva".to_string());
        client
    }

    pub fn property() -> Property {
        let mut property = Property::new(
            "Rua da Bahia",
            "1200",
            "Centro",
            "Belo Horizonte",
            "MG",
            "30130000",
        );
        property.complement = Some("Apto 501".to_string());
        property.area = Some(85.5);
        property.value = Some(450000.0);
        property.property_type = PropertyType::Apartment;
        property
    }

    pub fn notary_office() -> NotaryOffice {
        let mut office = NotaryOffice::new("2º Ofício de Notas");
        office.cnpj = Some("12345678000199".to_string());
        office.street = Some("Av. Afonso Pena".to_string());
        office.number = Some("500".to_string());
        office.city = Some("Belo Horizonte".to_string());
        office
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures;
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn test_parse_known_and_unknown_keys() {
        assert_eq!(
            PlaceholderKey::parse("client.name"),
            Some(PlaceholderKey::Client(ClientField::Name))
        );
        assert_eq!(
            PlaceholderKey::parse("notaryOffice.zipCode"),
            Some(PlaceholderKey::NotaryOffice(NotaryOfficeField::ZipCode))
        );
        assert_eq!(PlaceholderKey::parse("client.nickname"), None);
        assert_eq!(PlaceholderKey::parse("unknown.key"), None);
        assert_eq!(PlaceholderKey::parse("client"), None);
    }

    #[test]
    fn test_all_keys_roundtrip_through_display() {
        let keys = PlaceholderKey::all();
        assert_eq!(keys.len(), 7 + 11 + 13 + 2);
        for key in keys {
            assert_eq!(PlaceholderKey::parse(&key.to_string()), Some(key));
        }
    }

    #[test]
    fn test_client_fields() {
        let client = fixtures::client();
        let property = fixtures::property();
        let data = ReplacementData::new(&client, &property, None);

        assert_eq!(resolve("client.name", &data, today()).as_deref(), Some("Ana Silva"));
        assert_eq!(
            resolve("client.cpf", &data, today()).as_deref(),
            Some("123.456.789-01")
        );
        assert_eq!(
            resolve("client.phone", &data, today()).as_deref(),
            Some("(31) 98765-4321")
        );
        assert_eq!(
            resolve("client.maritalStatus", &data, today()).as_deref(),
            Some("Casado(a)")
        );
        assert_eq!(resolve("client.fatherName", &data, today()).as_deref(), Some(""));
    }

    #[test]
    fn test_client_optional_fields_when_unset() {
        let client = Client::new("Bruno");
        let property = fixtures::property();
        let data = ReplacementData::new(&client, &property, None);

        assert_eq!(resolve("client.cpf", &data, today()).as_deref(), Some(""));
        assert_eq!(resolve("client.phone", &data, today()).as_deref(), Some(""));
        assert_eq!(resolve("client.email", &data, today()), None);
        assert_eq!(resolve("client.maritalStatus", &data, today()), None);
    }

    #[test]
    fn test_property_fields() {
        let client = fixtures::client();
        let property = fixtures::property();
        let data = ReplacementData::new(&client, &property, None);

        assert_eq!(
            resolve("property.address", &data, today()).as_deref(),
            Some("Rua da Bahia, 1200 - Apto 501")
        );
        assert_eq!(
            resolve("property.zipCode", &data, today()).as_deref(),
            Some("30130-000")
        );
        assert_eq!(resolve("property.area", &data, today()).as_deref(), Some("85,5 m²"));
        assert_eq!(
            resolve("property.value", &data, today()).as_deref(),
            Some("R$ 450.000,00")
        );
        assert_eq!(resolve("property.type", &data, today()).as_deref(), Some("Apartamento"));
    }

    #[test]
    fn test_property_address_without_complement() {
        let client = fixtures::client();
        let mut property = fixtures::property();
        property.complement = None;
        let data = ReplacementData::new(&client, &property, None);
        assert_eq!(
            resolve("property.address", &data, today()).as_deref(),
            Some("Rua da Bahia, 1200")
        );
        assert_eq!(resolve("property.complement", &data, today()).as_deref(), Some(""));
    }

    #[test]
    fn test_notary_office_absent_resolves_empty() {
        let client = fixtures::client();
        let property = fixtures::property();
        let data = ReplacementData::new(&client, &property, None);
        for field in NotaryOfficeField::ALL {
            let key = PlaceholderKey::NotaryOffice(field);
            assert_eq!(key.resolve(&data, today()).as_deref(), Some(""), "{}", key);
        }
    }

    #[test]
    fn test_notary_office_present() {
        let client = fixtures::client();
        let property = fixtures::property();
        let office = fixtures::notary_office();
        let data = ReplacementData::new(&client, &property, Some(&office));

        assert_eq!(
            resolve("notaryOffice.name", &data, today()).as_deref(),
            Some("2º Ofício de Notas")
        );
        assert_eq!(
            resolve("notaryOffice.address", &data, today()).as_deref(),
            Some("Av. Afonso Pena, 500")
        );
        assert_eq!(
            resolve("notaryOffice.cnpj", &data, today()).as_deref(),
            Some("12.345.678/0001-99")
        );
    }

    #[test]
    fn test_notary_office_address_requires_street() {
        let client = fixtures::client();
        let property = fixtures::property();
        let mut office = fixtures::notary_office();
        office.street = None;
        let data = ReplacementData::new(&client, &property, Some(&office));
        assert_eq!(resolve("notaryOffice.address", &data, today()).as_deref(), Some(""));
    }

    #[test]
    fn test_date_fields() {
        let client = fixtures::client();
        let property = fixtures::property();
        let data = ReplacementData::new(&client, &property, None);
        assert_eq!(resolve("date.current", &data, today()).as_deref(), Some("18/10/2026"));
        assert_eq!(
            resolve("date.currentExtended", &data, today()).as_deref(),
            Some("18 de outubro de 2026")
        );
    }
}
