use std::collections::{BTreeMap, HashMap};

use crm_core::AppError;
use tokio::sync::RwLock;

use super::{Document, Filter, KeyValueBackend, RecordKey};

type Partition = BTreeMap<String, Document>;
type Collection = HashMap<String, Partition>;

/// Process-local backend for development and tests. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryBackend {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl KeyValueBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, key: &RecordKey<'_>, document: Document) -> Result<(), AppError> {
        let mut collections = self.collections.write().await;
        collections
            .entry(key.collection.to_string())
            .or_default()
            .entry(key.partition.to_string())
            .or_default()
            .insert(key.id.to_string(), document);
        Ok(())
    }

    async fn get(&self, key: &RecordKey<'_>) -> Result<Option<Document>, AppError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(key.collection)
            .and_then(|c| c.get(key.partition))
            .and_then(|p| p.get(key.id))
            .cloned())
    }

    async fn query(
        &self,
        collection: &str,
        partition: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>, AppError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|c| c.get(partition))
            .map(|p| p.values().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn scan(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, AppError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| {
                c.values()
                    .flat_map(|p| p.values())
                    .filter(|d| filter.matches(d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn remove(&self, key: &RecordKey<'_>) -> Result<bool, AppError> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(key.collection)
            .and_then(|c| c.get_mut(key.partition))
            .and_then(|p| p.remove(key.id))
            .is_some())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_same_id_in_two_partitions_is_two_records() {
        let backend = InMemoryBackend::new();
        backend
            .put(&RecordKey::new("accounts", "t-1", "a-1"), json!({"name": "One"}))
            .await
            .unwrap();
        backend
            .put(&RecordKey::new("accounts", "t-2", "a-1"), json!({"name": "Two"}))
            .await
            .unwrap();

        let one = backend
            .get(&RecordKey::new("accounts", "t-1", "a-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(one["name"], "One");

        let listed = backend
            .query("accounts", "t-2", &Filter::new())
            .await
            .unwrap();
        assert_eq!(listed, vec![json!({"name": "Two"})]);

        let all = backend.scan("accounts", &Filter::new()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_reports_existence() {
        let backend = InMemoryBackend::new();
        let key = RecordKey::new("tenants", "__tenants__", "t-1");
        backend.put(&key, json!({"name": "Acme"})).await.unwrap();
        assert!(backend.remove(&key).await.unwrap());
        assert!(!backend.remove(&key).await.unwrap());
        assert!(backend.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_unknown_partition_is_empty() {
        let backend = InMemoryBackend::new();
        let listed = backend
            .query("accounts", "nobody", &Filter::new().eq("is_active", true))
            .await
            .unwrap();
        assert!(listed.is_empty());
    }
}
