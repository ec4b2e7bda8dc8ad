use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::entity::{
    Client, Contract, ContractTemplate, NewContract, NotaryOffice, Property, PropertyDocument,
};
use crate::error::{MinutaError, Result};
use crate::lifecycle::FinalizeRun;

use super::{ContractUpdate, DocumentRegistry, EntityStore, FinalizeLedger};

const CLIENTS: &str = "clients";
const PROPERTIES: &str = "properties";
const NOTARY_OFFICES: &str = "notary_offices";
const TEMPLATES: &str = "templates";
const CONTRACTS: &str = "contracts";

const MIN_ID_PREFIX_LENGTH: usize = 4;

const CONTRACT_COLUMNS: &str = "id, name, description, template_id, property_id, primary_client_id,
     client_ids, notary_office_ids, content, status, pdf_storage_id, pdf_size, created_at, updated_at";

/// SQLite-backed entity store, document registry and finalize ledger.
///
/// Collaborator entities (clients, properties, notary offices, templates) are
/// kept as JSON documents; contracts have one column per field.
pub struct SqliteStore {
    conn: Connection,
    #[allow(dead_code)]
    path: PathBuf,
}

/// Raw contract row, converted outside the rusqlite row closure.
struct ContractRow {
    id: String,
    name: String,
    description: Option<String>,
    template_id: Option<String>,
    property_id: String,
    primary_client_id: String,
    client_ids: String,
    notary_office_ids: String,
    content: String,
    status: String,
    pdf_storage_id: Option<String>,
    pdf_size: Option<i64>,
    created_at: String,
    updated_at: String,
}

impl ContractRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            template_id: row.get(3)?,
            property_id: row.get(4)?,
            primary_client_id: row.get(5)?,
            client_ids: row.get(6)?,
            notary_office_ids: row.get(7)?,
            content: row.get(8)?,
            status: row.get(9)?,
            pdf_storage_id: row.get(10)?,
            pdf_size: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    fn into_contract(self) -> Result<Contract> {
        Ok(Contract {
            id: parse_uuid(&self.id)?,
            name: self.name,
            description: self.description,
            template_id: self.template_id.as_deref().map(parse_uuid).transpose()?,
            property_id: parse_uuid(&self.property_id)?,
            primary_client_id: parse_uuid(&self.primary_client_id)?,
            client_ids: serde_json::from_str(&self.client_ids)?,
            notary_office_ids: serde_json::from_str(&self.notary_office_ids)?,
            content: self.content,
            status: self.status.parse().map_err(MinutaError::Storage)?,
            pdf_storage_id: self.pdf_storage_id,
            pdf_size: self.pdf_size.map(|s| s as u64),
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|_| MinutaError::Storage(format!("Invalid UUID: {}", value)))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| MinutaError::Storage(format!("Invalid timestamp '{}': {}", value, e)))
}

impl SqliteStore {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn,
            path: path.to_path_buf(),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory database, used by tests
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            path: PathBuf::from(":memory:"),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        for table in [CLIENTS, PROPERTIES, NOTARY_OFFICES, TEMPLATES] {
            self.conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        id TEXT PRIMARY KEY,
                        label TEXT NOT NULL,
                        data TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    )",
                    table
                ),
                [],
            )?;
        }

        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS contracts (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                template_id TEXT,
                property_id TEXT NOT NULL,
                primary_client_id TEXT NOT NULL,
                client_ids TEXT NOT NULL,
                notary_office_ids TEXT NOT NULL,
                content TEXT NOT NULL,
                status TEXT NOT NULL,
                pdf_storage_id TEXT,
                pdf_size INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_contracts_template ON contracts(template_id);
            CREATE INDEX IF NOT EXISTS idx_contracts_property ON contracts(property_id);

            CREATE TABLE IF NOT EXISTS property_documents (
                id TEXT PRIMARY KEY,
                property_id TEXT NOT NULL,
                contract_id TEXT,
                name TEXT NOT NULL,
                storage_id TEXT NOT NULL,
                mime_type TEXT NOT NULL,
                size INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_property ON property_documents(property_id);

            CREATE TABLE IF NOT EXISTS finalize_runs (
                contract_id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;

        Ok(())
    }

    fn put_json<T: Serialize>(
        &self,
        table: &str,
        id: &Uuid,
        label: &str,
        created_at: &DateTime<Utc>,
        value: &T,
    ) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (id, label, data, created_at) VALUES (?1, ?2, ?3, ?4)",
                table
            ),
            params![
                id.to_string(),
                label,
                serde_json::to_string(value)?,
                created_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, table: &str, id: &Uuid) -> Result<Option<T>> {
        let data: Option<String> = self
            .conn
            .query_row(
                &format!("SELECT data FROM {} WHERE id = ?1", table),
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn list_json<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT data FROM {} ORDER BY created_at, label", table))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut items = Vec::new();
        for row in rows {
            items.push(serde_json::from_str(&row?)?);
        }
        Ok(items)
    }

    /// Resolve a full UUID or a unique prefix (at least 4 chars) in `table`.
    fn resolve_id(&self, table: &str, id: &str) -> Result<Uuid> {
        if let Ok(uuid) = Uuid::parse_str(id) {
            return Ok(uuid);
        }
        let is_prefix = id.chars().all(|c| c.is_ascii_hexdigit() || c == '-');
        if id.len() < MIN_ID_PREFIX_LENGTH || !is_prefix {
            return Err(MinutaError::EntityNotFound(id.to_string()));
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT id FROM {} WHERE substr(id, 1, length(?1)) = ?1 LIMIT 2",
            table
        ))?;
        let matches: Vec<String> = stmt
            .query_map([id.to_lowercase()], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;

        match matches.as_slice() {
            [single] => parse_uuid(single),
            [] => Err(MinutaError::EntityNotFound(id.to_string())),
            _ => Err(MinutaError::AmbiguousId(id.to_string())),
        }
    }

    pub fn resolve_client_id(&self, id: &str) -> Result<Uuid> {
        self.resolve_id(CLIENTS, id)
    }

    pub fn resolve_property_id(&self, id: &str) -> Result<Uuid> {
        self.resolve_id(PROPERTIES, id)
    }

    pub fn resolve_notary_office_id(&self, id: &str) -> Result<Uuid> {
        self.resolve_id(NOTARY_OFFICES, id)
    }

    pub fn resolve_template_id(&self, id: &str) -> Result<Uuid> {
        self.resolve_id(TEMPLATES, id)
    }

    pub fn resolve_contract_id(&self, id: &str) -> Result<Uuid> {
        self.resolve_id(CONTRACTS, id)
    }

    pub fn add_client(&self, client: &Client) -> Result<()> {
        self.put_json(CLIENTS, &client.id, &client.name, &client.created_at, client)
    }

    pub fn list_clients(&self) -> Result<Vec<Client>> {
        self.list_json(CLIENTS)
    }

    pub fn add_property(&self, property: &Property) -> Result<()> {
        self.put_json(
            PROPERTIES,
            &property.id,
            &property.summary(),
            &property.created_at,
            property,
        )
    }

    pub fn list_properties(&self) -> Result<Vec<Property>> {
        self.list_json(PROPERTIES)
    }

    pub fn add_notary_office(&self, office: &NotaryOffice) -> Result<()> {
        self.put_json(NOTARY_OFFICES, &office.id, &office.name, &office.created_at, office)
    }

    pub fn list_notary_offices(&self) -> Result<Vec<NotaryOffice>> {
        self.list_json(NOTARY_OFFICES)
    }

    pub fn add_template(&self, template: &ContractTemplate) -> Result<()> {
        self.put_json(TEMPLATES, &template.id, &template.name, &template.created_at, template)
    }

    /// Replace a template. Templates referenced by a contract are frozen so
    /// that already generated contracts keep matching their source.
    pub fn update_template(&self, template: &ContractTemplate) -> Result<()> {
        if self.get_json::<ContractTemplate>(TEMPLATES, &template.id)?.is_none() {
            return Err(MinutaError::EntityNotFound(template.id.to_string()));
        }
        if self.template_in_use(&template.id)? {
            return Err(MinutaError::TemplateInUse(template.id));
        }
        let mut updated = template.clone();
        updated.updated_at = Utc::now();
        self.add_template(&updated)
    }

    pub fn template_in_use(&self, id: &Uuid) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM contracts WHERE template_id = ?1",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn list_templates(&self) -> Result<Vec<ContractTemplate>> {
        self.list_json(TEMPLATES)
    }

    pub fn list_contracts(&self) -> Result<Vec<Contract>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM contracts ORDER BY created_at",
            CONTRACT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], ContractRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(ContractRow::into_contract).collect()
    }

    pub fn list_documents(&self) -> Result<Vec<PropertyDocument>> {
        self.query_documents("SELECT id, property_id, contract_id, name, storage_id, mime_type, size, created_at
             FROM property_documents ORDER BY created_at", None)
    }

    fn query_documents(&self, sql: &str, param: Option<String>) -> Result<Vec<PropertyDocument>> {
        let mut stmt = self.conn.prepare(sql)?;
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, String>(7)?,
            ))
        };
        let rows = match param {
            Some(p) => stmt.query_map([p], map_row)?.collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt.query_map([], map_row)?.collect::<rusqlite::Result<Vec<_>>>()?,
        };

        rows.into_iter()
            .map(
                |(id, property_id, contract_id, name, storage_id, mime_type, size, created_at)| {
                    Ok(PropertyDocument {
                        id: parse_uuid(&id)?,
                        property_id: parse_uuid(&property_id)?,
                        contract_id: contract_id.as_deref().map(parse_uuid).transpose()?,
                        name,
                        storage_id,
                        mime_type,
                        size: size as u64,
                        created_at: parse_timestamp(&created_at)?,
                    })
                },
            )
            .collect()
    }

    fn write_contract(&self, contract: &Contract) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO contracts ({}) VALUES
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                CONTRACT_COLUMNS
            ),
            params![
                contract.id.to_string(),
                contract.name,
                contract.description,
                contract.template_id.map(|id| id.to_string()),
                contract.property_id.to_string(),
                contract.primary_client_id.to_string(),
                serde_json::to_string(&contract.client_ids)?,
                serde_json::to_string(&contract.notary_office_ids)?,
                contract.content,
                contract.status.to_string(),
                contract.pdf_storage_id,
                contract.pdf_size.map(|s| s as i64),
                contract.created_at.to_rfc3339(),
                contract.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

impl EntityStore for SqliteStore {
    fn get_template(&self, id: &Uuid) -> Result<Option<ContractTemplate>> {
        self.get_json(TEMPLATES, id)
    }

    fn get_client(&self, id: &Uuid) -> Result<Option<Client>> {
        self.get_json(CLIENTS, id)
    }

    fn get_property(&self, id: &Uuid) -> Result<Option<Property>> {
        self.get_json(PROPERTIES, id)
    }

    fn get_notary_office(&self, id: &Uuid) -> Result<Option<NotaryOffice>> {
        self.get_json(NOTARY_OFFICES, id)
    }

    fn get_contract(&self, id: &Uuid) -> Result<Option<Contract>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM contracts WHERE id = ?1", CONTRACT_COLUMNS),
                [id.to_string()],
                ContractRow::from_row,
            )
            .optional()?;
        row.map(ContractRow::into_contract).transpose()
    }

    fn create_contract(&self, fields: NewContract) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let contract = fields.into_contract(id);
        self.write_contract(&contract)?;
        Ok(id)
    }

    fn update_contract(&self, id: &Uuid, update: ContractUpdate) -> Result<()> {
        let mut contract = self
            .get_contract(id)?
            .ok_or_else(|| MinutaError::EntityNotFound(id.to_string()))?;
        update.apply(&mut contract);
        self.write_contract(&contract)
    }

    fn delete_contract(&self, id: &Uuid) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM contracts WHERE id = ?1", [id.to_string()])?;
        if deleted == 0 {
            return Err(MinutaError::EntityNotFound(id.to_string()));
        }
        Ok(())
    }
}

impl DocumentRegistry for SqliteStore {
    fn attach(&self, document: &PropertyDocument) -> Result<()> {
        // One registry entry per stored artifact
        self.conn.execute(
            "DELETE FROM property_documents WHERE storage_id = ?1",
            [&document.storage_id],
        )?;
        self.conn.execute(
            "INSERT INTO property_documents
             (id, property_id, contract_id, name, storage_id, mime_type, size, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                document.id.to_string(),
                document.property_id.to_string(),
                document.contract_id.map(|id| id.to_string()),
                document.name,
                document.storage_id,
                document.mime_type,
                document.size as i64,
                document.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn detach(&self, storage_id: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM property_documents WHERE storage_id = ?1",
            [storage_id],
        )?;
        Ok(())
    }

    fn documents_for_property(&self, property_id: &Uuid) -> Result<Vec<PropertyDocument>> {
        self.query_documents(
            "SELECT id, property_id, contract_id, name, storage_id, mime_type, size, created_at
             FROM property_documents WHERE property_id = ?1 ORDER BY created_at",
            Some(property_id.to_string()),
        )
    }
}

impl FinalizeLedger for SqliteStore {
    fn load_run(&self, contract_id: &Uuid) -> Result<Option<FinalizeRun>> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM finalize_runs WHERE contract_id = ?1",
                [contract_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save_run(&self, run: &FinalizeRun) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO finalize_runs (contract_id, data, updated_at)
             VALUES (?1, ?2, ?3)",
            params![
                run.contract_id.to_string(),
                serde_json::to_string(run)?,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn clear_run(&self, contract_id: &Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM finalize_runs WHERE contract_id = ?1",
            [contract_id.to_string()],
        )?;
        Ok(())
    }
}
