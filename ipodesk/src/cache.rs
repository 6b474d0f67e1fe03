use std::collections::HashMap;

use uuid::Uuid;

use crate::details::CompanyDetails;
use crate::store::{DocumentStore, StoreResult};

/// Detail documents keyed by `companyId`, filled once per listing request
/// so that annotating N rows costs one store call instead of N.
#[derive(Debug, Default)]
pub struct DetailsCache {
    by_company: HashMap<Uuid, CompanyDetails>,
}

impl DetailsCache {
    pub fn from_details(details: impl IntoIterator<Item = CompanyDetails>) -> Self {
        Self {
            by_company: details.into_iter().map(|d| (d.company_id, d)).collect(),
        }
    }

    pub async fn load(store: &dyn DocumentStore) -> StoreResult<Self> {
        Ok(Self::from_details(store.list_details().await?))
    }

    pub fn get(&self, company_id: Uuid) -> Option<&CompanyDetails> {
        self.by_company.get(&company_id)
    }

    pub fn has_profile(&self, company_id: Uuid) -> bool {
        self.by_company.contains_key(&company_id)
    }

    /// Drops one entry after a write so the next read goes to the store.
    pub fn invalidate(&mut self, company_id: Uuid) {
        self.by_company.remove(&company_id);
    }

    pub fn len(&self) -> usize {
        self.by_company.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_company.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn loads_every_profile_by_company() {
        let store = MemoryStore::new();
        let table = Uuid::now_v7();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        store.insert_details(CompanyDetails::empty(a, table, "A")).await.expect("a");
        store.insert_details(CompanyDetails::empty(b, table, "B")).await.expect("b");

        let mut cache = DetailsCache::load(&store).await.expect("load");
        assert_eq!(cache.len(), 2);
        assert!(cache.has_profile(a));
        assert_eq!(cache.get(b).map(|d| d.company_name.as_str()), Some("B"));
        assert!(!cache.has_profile(Uuid::now_v7()));

        cache.invalidate(a);
        assert!(!cache.has_profile(a));
    }
}
