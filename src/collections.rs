/*!
Named collections of locally persisted domain records.

Pages own the record shapes (assignments, quizzes, courses, and so on);
this module only moves them in and out of storage as ordered JSON
values, without validating them. A page that writes a collection is
expected to publish the matching [`crate::bus::UpdateEvent`] itself;
the write and the notification are separate acts.
*/
use std::sync::Arc;

use serde_json::Value;

use crate::storage::{Storage, StorageError};

const COLLECTION_KEY_PREFIX: &str = "campus.collection.";

pub struct Collections {
    storage: Arc<dyn Storage>,
}

impl Collections {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    fn key_for(name: &str) -> String {
        format!("{}{}", COLLECTION_KEY_PREFIX, name)
    }

    /// The ordered records of collection `name`; an absent collection
    /// is empty.
    pub async fn read(&self, name: &str) -> Result<Vec<Value>, StorageError> {
        log::trace!("Collections::read( {:?} ) called.", name);

        let raw = match self.storage.get_item(&Self::key_for(name)).await? {
            None => { return Ok(Vec::new()); },
            Some(raw) => raw,
        };

        serde_json::from_str(&raw).map_err(|e| StorageError::from(format!(
            "Collection {:?} is unreadable: {}", name, &e
        )))
    }

    /// Replace collection `name` wholesale.
    pub async fn write(&self, name: &str, records: &[Value]) -> Result<(), StorageError> {
        log::trace!(
            "Collections::write( {:?}, [ {} records ] ) called.",
            name, records.len()
        );

        let raw = serde_json::to_string(records).map_err(|e| StorageError::from(format!(
            "Unable to serialize collection {:?}: {}", name, &e
        )))?;

        self.storage.set_item(&Self::key_for(name), &raw).await
    }

    /// Append one record to collection `name`, returning the new
    /// record count.
    pub async fn append(&self, name: &str, record: Value) -> Result<usize, StorageError> {
        log::trace!("Collections::append( {:?}, ... ) called.", name);

        let mut records = self.read(name).await?;
        records.push(record);
        self.write(name, &records).await?;

        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemStorage;
    use crate::tests::ensure_logging;
    use serde_json::json;

    #[tokio::test]
    async fn absent_collection_is_empty() {
        ensure_logging();
        let colls = Collections::new(Arc::new(MemStorage::new()));

        assert!(colls.read("quizzes").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_preserves_order() {
        ensure_logging();
        let colls = Collections::new(Arc::new(MemStorage::new()));

        let n = colls.append("quizzes", json!({"title": "Algebra review"})).await.unwrap();
        assert_eq!(n, 1);
        let n = colls.append("quizzes", json!({"title": "Geometry basics"})).await.unwrap();
        assert_eq!(n, 2);

        let records = colls.read("quizzes").await.unwrap();
        assert_eq!(records[0]["title"], "Algebra review");
        assert_eq!(records[1]["title"], "Geometry basics");

        // Collections are independent of one another.
        assert!(colls.read("assignments").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn write_replaces_wholesale() {
        ensure_logging();
        let colls = Collections::new(Arc::new(MemStorage::new()));

        colls.append("assignments", json!({"id": 1})).await.unwrap();
        colls.write("assignments", &[json!({"id": 2}), json!({"id": 3})]).await.unwrap();

        let records = colls.read("assignments").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], 2);
    }

    #[tokio::test]
    async fn shape_is_not_validated() {
        ensure_logging();
        let colls = Collections::new(Arc::new(MemStorage::new()));

        // Records of wildly different shapes coexist in one collection.
        colls.append("grades", json!({"score": 97})).await.unwrap();
        colls.append("grades", json!("just a string")).await.unwrap();
        colls.append("grades", json!(null)).await.unwrap();

        assert_eq!(colls.read("grades").await.unwrap().len(), 3);
    }
}
