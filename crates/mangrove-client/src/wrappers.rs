//! Collection wrappers.
//!
//! [`Coll`] is a thin wrapper over the driver's `Collection` adding the
//! "fetch or fail with 404" convenience; everything else passes through
//! via `Deref`. Wrappers are produced by explicit factories
//! ([`collection`], [`Mongo::collection`](crate::Mongo::collection)), not
//! by intercepting attribute access on the driver types.

use std::ops::Deref;

use bson::Document;
use mangrove_core::{MangroveError, MangroveResult};
use mongodb::{Collection, Database};
use serde::de::DeserializeOwned;

/// Returns a wrapped typed collection from the given database.
#[must_use]
pub fn collection<T: Send + Sync>(db: &Database, name: &str) -> Coll<T> {
    Coll {
        inner: db.collection(name),
    }
}

/// A `Collection` with the not-found convenience lookup.
///
/// `Coll<Document>` works on raw documents; a typed `Coll<T>` doubles as a
/// small model engine for any `T: Deserialize`.
#[derive(Debug, Clone)]
pub struct Coll<T: Send + Sync> {
    inner: Collection<T>,
}

impl<T: Send + Sync> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Coll<T>
where
    T: DeserializeOwned + Send + Sync,
{
    /// Finds a single document or fails with the not-found error.
    ///
    /// Like the driver's `find_one`, but an absent result becomes the
    /// error the host framework renders as HTTP 404 instead of `None`:
    ///
    /// ```rust,no_run
    /// # async fn handler(
    /// #     tasks: mangrove_client::Coll<bson::Document>,
    /// #     task_id: mangrove_bson::Oid,
    /// # ) -> mangrove_core::MangroveResult<()> {
    /// use bson::doc;
    ///
    /// let task = tasks.find_one_or_404(doc! {"_id": task_id}).await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns the not-found error when no document matches; driver errors
    /// propagate unchanged.
    pub async fn find_one_or_404(&self, filter: Document) -> MangroveResult<T> {
        match self.inner.find_one(filter).await? {
            Some(found) => Ok(found),
            None => Err(MangroveError::not_found("document")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::options::ClientOptions;
    use mongodb::Client;

    async fn test_db() -> Database {
        // Client construction is lazy; nothing here touches the network.
        let options = ClientOptions::parse("mongodb://localhost:27017")
            .await
            .unwrap();
        Client::with_options(options).unwrap().database("testdb")
    }

    #[tokio::test]
    async fn test_factory_binds_name() {
        let db = test_db().await;
        let tasks: Coll<Document> = collection(&db, "tasks");
        assert_eq!(tasks.name(), "tasks");
        assert_eq!(tasks.namespace().to_string(), "testdb.tasks");
    }

    #[tokio::test]
    async fn test_deref_exposes_driver_collection() {
        let db = test_db().await;
        let tasks: Coll<Document> = collection(&db, "tasks");
        let raw: &Collection<Document> = &tasks;
        assert_eq!(raw.name(), "tasks");
    }
}
