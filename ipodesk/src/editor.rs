//! Editing session for one company's detail document. Tracks whether the
//! next save creates or updates, and refuses overlapping saves.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use uuid::Uuid;

use crate::details::CompanyDetails;
use crate::store::{DocumentStore, StoreError};
use crate::validation::{Validate, ValidationReport};

#[async_trait]
pub trait DetailBackend: Send + Sync {
    async fn fetch(&self, company_id: Uuid) -> Result<Option<CompanyDetails>, StoreError>;
    async fn create(&self, details: CompanyDetails) -> Result<CompanyDetails, StoreError>;
    async fn update(&self, id: Uuid, details: CompanyDetails) -> Result<CompanyDetails, StoreError>;
}

#[async_trait]
impl DetailBackend for Arc<dyn DocumentStore> {
    async fn fetch(&self, company_id: Uuid) -> Result<Option<CompanyDetails>, StoreError> {
        self.find_details_by_company(company_id).await
    }

    async fn create(&self, details: CompanyDetails) -> Result<CompanyDetails, StoreError> {
        self.insert_details(details).await
    }

    async fn update(&self, id: Uuid, details: CompanyDetails) -> Result<CompanyDetails, StoreError> {
        self.update_details(id, details).await
    }
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("no company loaded")]
    NotLoaded,

    #[error("a save is already in progress")]
    SaveInProgress,

    #[error(transparent)]
    Invalid(#[from] ValidationReport),

    #[error(transparent)]
    Store(#[from] StoreError),
}

struct SavingGuard<'a>(&'a AtomicBool);

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct DetailEditor<B> {
    backend: B,
    draft: Mutex<Option<CompanyDetails>>,
    saving: AtomicBool,
}

impl<B: DetailBackend> DetailEditor<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            draft: Mutex::new(None),
            saving: AtomicBool::new(false),
        }
    }

    /// Fetches the stored document, or starts an empty one named after the
    /// picked company when there is none.
    pub async fn load(
        &self,
        company_id: Uuid,
        table_id: Uuid,
        company_name: &str,
    ) -> Result<CompanyDetails, EditorError> {
        let details = match self.backend.fetch(company_id).await? {
            Some(found) => found,
            None => {
                tracing::debug!(%company_id, "No stored details, starting empty draft");
                CompanyDetails::empty(company_id, table_id, company_name)
            }
        };
        *self.draft.lock() = Some(details.clone());
        Ok(details)
    }

    pub fn draft(&self) -> Option<CompanyDetails> {
        self.draft.lock().clone()
    }

    /// True once the draft has been persisted at least once.
    pub fn is_persisted(&self) -> bool {
        self.draft.lock().as_ref().is_some_and(|d| d.id.is_some())
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::Acquire)
    }

    pub fn edit(&self, f: impl FnOnce(&mut CompanyDetails)) -> Result<(), EditorError> {
        let mut draft = self.draft.lock();
        let details = draft.as_mut().ok_or(EditorError::NotLoaded)?;
        f(details);
        Ok(())
    }

    /// Creates on the first save, updates the recorded id afterwards.
    pub async fn save(&self) -> Result<CompanyDetails, EditorError> {
        if self
            .saving
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(EditorError::SaveInProgress);
        }
        let _guard = SavingGuard(&self.saving);

        let details = self.draft.lock().clone().ok_or(EditorError::NotLoaded)?;
        details.validate()?;

        let saved = match details.id {
            None => self.backend.create(details).await?,
            Some(id) => self.backend.update(id, details).await?,
        };
        *self.draft.lock() = Some(saved.clone());
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::details::{Move, add_content, move_item};
    use crate::store::MemoryStore;
    use std::time::Duration;

    fn store() -> Arc<dyn DocumentStore> {
        Arc::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn first_save_creates_then_updates() {
        let store = store();
        let editor = DetailEditor::new(store.clone());
        let company = Uuid::now_v7();
        let table = Uuid::now_v7();

        let draft = editor.load(company, table, "Acme Ltd").await.expect("load");
        assert!(draft.id.is_none());
        assert_eq!(draft.company_name, "Acme Ltd");
        assert!(!editor.is_persisted());

        editor
            .edit(|d| d.basic_info.industry = "Fintech".into())
            .expect("edit");
        let created = editor.save().await.expect("create");
        let id = created.id.expect("id");
        assert!(editor.is_persisted());

        editor.edit(|d| add_content(d, "Overview", "body")).expect("edit");
        let updated = editor.save().await.expect("update");
        assert_eq!(updated.id, Some(id));
        assert_eq!(store.list_details().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn round_trip_preserves_document() {
        let store = store();
        let editor = DetailEditor::new(store.clone());
        let company = Uuid::now_v7();
        editor.load(company, Uuid::now_v7(), "Acme").await.expect("load");
        editor
            .edit(|d| {
                add_content(d, "One", "");
                add_content(d, "Two", "");
                move_item(&mut d.content, 1, Move::Up);
            })
            .expect("edit");
        let saved = editor.save().await.expect("save");

        let reloaded = DetailEditor::new(store.clone());
        let fetched = reloaded.load(company, Uuid::now_v7(), "ignored").await.expect("load");
        assert!(fetched.same_content(&saved));
        assert_eq!(fetched.content[0].title, "Two");
    }

    #[tokio::test]
    async fn save_without_load_fails() {
        let editor = DetailEditor::new(store());
        assert!(matches!(editor.save().await, Err(EditorError::NotLoaded)));
    }

    #[tokio::test]
    async fn invalid_draft_is_not_sent() {
        let store = store();
        let editor = DetailEditor::new(store.clone());
        editor.load(Uuid::now_v7(), Uuid::now_v7(), "Acme").await.expect("load");
        editor
            .edit(|d| d.reviews.push(crate::details::Review { rating: 9, ..Default::default() }))
            .expect("edit");
        assert!(matches!(editor.save().await, Err(EditorError::Invalid(_))));
        assert!(store.list_details().await.expect("list").is_empty());
        assert!(!editor.is_saving());
    }

    struct SlowBackend(Arc<dyn DocumentStore>);

    #[async_trait]
    impl DetailBackend for SlowBackend {
        async fn fetch(&self, company_id: Uuid) -> Result<Option<CompanyDetails>, StoreError> {
            self.0.fetch(company_id).await
        }
        async fn create(&self, details: CompanyDetails) -> Result<CompanyDetails, StoreError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.0.create(details).await
        }
        async fn update(&self, id: Uuid, details: CompanyDetails) -> Result<CompanyDetails, StoreError> {
            self.0.update(id, details).await
        }
    }

    #[tokio::test]
    async fn overlapping_save_is_rejected() {
        let editor = DetailEditor::new(SlowBackend(store()));
        editor.load(Uuid::now_v7(), Uuid::now_v7(), "Acme").await.expect("load");

        let (first, second) = tokio::join!(editor.save(), editor.save());
        assert!(first.is_ok());
        assert!(matches!(second, Err(EditorError::SaveInProgress)));
        assert!(!editor.is_saving());
    }
}
