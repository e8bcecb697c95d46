//! Process-local catalog store

use crate::error::{LibraryError, Result};
use crate::models::{CatalogId, CatalogRecord, ExtractedMetadata, RecordId, RecordSummary};
use crate::repositories::catalog::{validate, CatalogStore};
use async_trait::async_trait;
use bridge_traits::time::{Clock, SystemClock};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    next_id: i64,
    records: BTreeMap<RecordId, CatalogRecord>,
}

/// [`CatalogStore`] kept entirely in memory.
pub struct InMemoryCatalogStore {
    inner: RwLock<Inner>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryCatalogStore {
    fn default() -> Self {
        Self {
            inner: RwLock::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Every stored record, ordered by id.
    pub async fn records(&self) -> Vec<CatalogRecord> {
        self.inner.read().await.records.values().cloned().collect()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn find_record_by_virtual_path(
        &self,
        catalog_id: CatalogId,
        file: &str,
    ) -> Result<Option<RecordId>> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .values()
            .find(|r| r.catalog_id == catalog_id && r.file == file)
            .map(|r| r.id))
    }

    async fn insert_record(&self, metadata: &ExtractedMetadata) -> Result<RecordId> {
        validate(metadata)?;

        let mut inner = self.inner.write().await;
        let duplicate = inner
            .records
            .values()
            .any(|r| r.catalog_id == metadata.catalog_id && r.file == metadata.file);
        if duplicate {
            return Err(LibraryError::InvalidInput {
                field: "file".to_string(),
                message: format!("{} is already cataloged", metadata.file),
            });
        }

        inner.next_id += 1;
        let id = RecordId(inner.next_id);
        let timestamp = self.clock.unix_timestamp();
        inner.records.insert(
            id,
            CatalogRecord {
                id,
                catalog_id: metadata.catalog_id,
                file: metadata.file.clone(),
                tags: metadata.tags.clone(),
                added_at: timestamp,
                updated_at: timestamp,
            },
        );

        Ok(id)
    }

    async fn update_record_if_changed(
        &self,
        id: RecordId,
        metadata: &ExtractedMetadata,
    ) -> Result<bool> {
        validate(metadata)?;

        let mut inner = self.inner.write().await;
        let record = inner
            .records
            .get_mut(&id)
            .ok_or_else(|| LibraryError::NotFound {
                entity_type: "CatalogRecord".to_string(),
                id: id.to_string(),
            })?;

        if record.tags == metadata.tags {
            return Ok(false);
        }

        record.tags = metadata.tags.clone();
        record.updated_at = self.clock.unix_timestamp();
        Ok(true)
    }

    async fn delete_record(&self, id: RecordId) -> Result<bool> {
        Ok(self.inner.write().await.records.remove(&id).is_some())
    }

    async fn list_records_for_catalog(&self, catalog_id: CatalogId) -> Result<Vec<RecordSummary>> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .values()
            .filter(|r| r.catalog_id == catalog_id)
            .map(|r| RecordSummary {
                id: r.id,
                file: r.file.clone(),
                title: r.tags.title.clone(),
            })
            .collect())
    }

    async fn get_record(&self, id: RecordId) -> Result<Option<CatalogRecord>> {
        Ok(self.inner.read().await.records.get(&id).cloned())
    }

    async fn count_records(&self, catalog_id: CatalogId) -> Result<i64> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .values()
            .filter(|r| r.catalog_id == catalog_id)
            .count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TagFields;

    fn song(catalog_id: CatalogId, file: &str) -> ExtractedMetadata {
        ExtractedMetadata::new(
            catalog_id,
            file,
            TagFields {
                title: Some(file.to_string()),
                size: 1,
                ..TagFields::default()
            },
        )
    }

    #[tokio::test]
    async fn test_catalogs_are_isolated() {
        let store = InMemoryCatalogStore::new();
        store.insert_record(&song(1, "Music|/|a.mp3")).await.unwrap();
        store.insert_record(&song(2, "Music|/|a.mp3")).await.unwrap();

        assert_eq!(store.count_records(1).await.unwrap(), 1);
        assert_eq!(store.list_records_for_catalog(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_is_rejected() {
        let store = InMemoryCatalogStore::new();
        store.insert_record(&song(1, "Music|/|a.mp3")).await.unwrap();
        assert!(store.insert_record(&song(1, "Music|/|a.mp3")).await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = InMemoryCatalogStore::new();
        let metadata = song(1, "Music|/|a.mp3");
        let id = store.insert_record(&metadata).await.unwrap();

        assert!(!store.update_record_if_changed(id, &metadata).await.unwrap());

        let mut changed = metadata.clone();
        changed.tags.genre = Some("Jazz".to_string());
        assert!(store.update_record_if_changed(id, &changed).await.unwrap());

        assert!(store.delete_record(id).await.unwrap());
        assert!(store.records().await.is_empty());
        assert!(store.update_record_if_changed(id, &changed).await.is_err());
    }
}
