//! MongoDB client and collection wrapper

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument, UpdateModifications},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::db::schemas::Metadata;
use crate::types::GroveError;

/// Server error code for a unique index violation
pub const DUPLICATE_KEY_CODE: i32 = 11000;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// Whether a driver error is a unique index violation
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

/// Map a write error, keeping unique violations distinct from outages
fn write_error(err: mongodb::error::Error, what: &str) -> GroveError {
    if is_duplicate_key(&err) {
        GroveError::DuplicateProfile(err.to_string())
    } else {
        error!("MongoDB {} failed: {}", what, err);
        GroveError::StoreUnavailable(format!("{} failed: {}", what, err))
    }
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, GroveError> {
        info!("Connecting to MongoDB at {}", uri);

        // Fail fast instead of hanging on an unreachable server
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri).await.map_err(|e| {
            GroveError::StoreUnavailable(format!("Failed to connect to MongoDB: {}", e))
        })?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| GroveError::StoreUnavailable(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, GroveError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, GroveError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), GroveError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner.create_indexes(indices).await.map_err(|e| {
            GroveError::StoreUnavailable(format!("Failed to create indexes: {}", e))
        })?;

        Ok(())
    }

    /// Insert a document, setting metadata timestamps on `item`
    pub async fn insert_one(&self, item: &mut T) -> Result<ObjectId, GroveError> {
        let now = DateTime::now();
        let metadata = item.mut_metadata();
        metadata.created_at = Some(now);
        metadata.updated_at = Some(now);

        let result = self
            .inner
            .insert_one(&*item)
            .await
            .map_err(|e| write_error(e, "Insert"))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| GroveError::Internal("Failed to get inserted ID".into()))
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, GroveError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| GroveError::StoreUnavailable(format!("Find failed: {}", e)))
    }

    /// Find many documents by filter, in `sort` order
    pub async fn find_sorted(
        &self,
        filter: Document,
        sort: Document,
    ) -> Result<Vec<T>, GroveError> {
        use futures_util::TryStreamExt;

        let cursor = self
            .inner
            .find(filter)
            .sort(sort)
            .await
            .map_err(|e| GroveError::StoreUnavailable(format!("Find failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| GroveError::StoreUnavailable(format!("Cursor read failed: {}", e)))
    }

    /// Atomically update one document and return it as stored afterwards
    pub async fn find_one_and_update(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<Option<T>, GroveError> {
        self.inner
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| write_error(e, "Update"))
    }

    /// Delete one document; returns whether anything was removed
    pub async fn delete_one(&self, filter: Document) -> Result<bool, GroveError> {
        let result = self
            .inner
            .delete_one(filter)
            .await
            .map_err(|e| GroveError::StoreUnavailable(format!("Delete failed: {}", e)))?;
        Ok(result.deleted_count > 0)
    }
}
