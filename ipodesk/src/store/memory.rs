use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{DocumentStore, Row, StoreError, StoreResult, stamp_new_details, stamp_replaced_details};
use crate::details::CompanyDetails;
use crate::schema::{Table, TableDraft};

/// Process-local store. Used by tests and `DATABASE_URL=memory://`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<IndexMap<Uuid, Table>>,
    rows: RwLock<IndexMap<Uuid, Row>>,
    details: RwLock<IndexMap<Uuid, CompanyDetails>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn name_taken(name: &str) -> StoreError {
    StoreError::Conflict(format!("A table named '{name}' already exists"))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_tables(&self) -> StoreResult<Vec<Table>> {
        Ok(self.tables.read().values().cloned().collect())
    }

    async fn get_table(&self, id: Uuid) -> StoreResult<Table> {
        self.tables.read().get(&id).cloned().ok_or(StoreError::NotFound("table"))
    }

    async fn insert_table(&self, table: Table) -> StoreResult<Table> {
        let mut tables = self.tables.write();
        if tables.values().any(|t| t.name() == table.name()) {
            return Err(name_taken(table.name()));
        }
        tables.insert(table.id, table.clone());
        Ok(table)
    }

    async fn update_table(&self, id: Uuid, draft: TableDraft) -> StoreResult<Table> {
        let mut tables = self.tables.write();
        if tables.values().any(|t| t.id != id && t.name() == draft.table_name) {
            return Err(name_taken(&draft.table_name));
        }
        let table = tables.get_mut(&id).ok_or(StoreError::NotFound("table"))?;
        table.replace(draft);
        Ok(table.clone())
    }

    async fn delete_table(&self, id: Uuid) -> StoreResult<()> {
        self.tables
            .write()
            .shift_remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("table"))
    }

    async fn set_table_order(&self, ids: &[Uuid]) -> StoreResult<()> {
        let mut tables = self.tables.write();
        for (position, id) in ids.iter().enumerate() {
            if let Some(table) = tables.get_mut(id) {
                table.order = Some(position as u32);
            }
        }
        Ok(())
    }

    async fn list_rows(&self, table_id: Option<Uuid>) -> StoreResult<Vec<Row>> {
        Ok(self
            .rows
            .read()
            .values()
            .filter(|r| table_id.is_none_or(|t| r.table_id == t))
            .cloned()
            .collect())
    }

    async fn get_row(&self, id: Uuid) -> StoreResult<Row> {
        self.rows.read().get(&id).cloned().ok_or(StoreError::NotFound("row"))
    }

    async fn insert_row(&self, row: Row) -> StoreResult<Row> {
        self.rows.write().insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_row(&self, mut row: Row) -> StoreResult<Row> {
        let mut rows = self.rows.write();
        let slot = rows.get_mut(&row.id).ok_or(StoreError::NotFound("row"))?;
        row.created_at = slot.created_at;
        row.updated_at = Utc::now();
        *slot = row.clone();
        Ok(row)
    }

    async fn delete_row(&self, id: Uuid) -> StoreResult<()> {
        self.rows
            .write()
            .shift_remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("row"))
    }

    async fn list_details(&self) -> StoreResult<Vec<CompanyDetails>> {
        Ok(self.details.read().values().cloned().collect())
    }

    async fn get_details(&self, id: Uuid) -> StoreResult<CompanyDetails> {
        self.details
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("company details"))
    }

    async fn find_details_by_company(&self, company_id: Uuid) -> StoreResult<Option<CompanyDetails>> {
        Ok(self
            .details
            .read()
            .values()
            .find(|d| d.company_id == company_id)
            .cloned())
    }

    async fn insert_details(&self, details: CompanyDetails) -> StoreResult<CompanyDetails> {
        let mut all = self.details.write();
        if all.values().any(|d| d.company_id == details.company_id) {
            return Err(StoreError::Conflict(
                "Company details already exist for this company".into(),
            ));
        }
        let details = stamp_new_details(details);
        if let Some(id) = details.id {
            all.insert(id, details.clone());
        }
        Ok(details)
    }

    async fn update_details(&self, id: Uuid, details: CompanyDetails) -> StoreResult<CompanyDetails> {
        let mut all = self.details.write();
        if all.values().any(|d| d.id != Some(id) && d.company_id == details.company_id) {
            return Err(StoreError::Conflict(
                "Company details already exist for this company".into(),
            ));
        }
        let existing = all.get(&id).ok_or(StoreError::NotFound("company details"))?;
        let details = stamp_replaced_details(id, existing, details);
        all.insert(id, details.clone());
        Ok(details)
    }

    async fn delete_details(&self, id: Uuid) -> StoreResult<()> {
        self.details
            .write()
            .shift_remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("company details"))
    }
}
