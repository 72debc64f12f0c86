//! MongoDB-backed profile store
//!
//! Updates go out as a single `findOneAndUpdate`: merged sections become
//! dotted-path `$set`s (`soil.waterHoldingCapacity`), replaced sections a
//! `$set` of the whole sub-document. Two writers touching different sections
//! of one profile therefore never overwrite each other.

use bson::{doc, DateTime, Document};
use serde::Serialize;
use tracing::debug;

use super::ProfileStore;
use crate::db::{FarmDoc, MongoClient, MongoCollection, FARM_COLLECTION};
use crate::farm::{FarmProfile, ProfileChanges, SectionChange};
use crate::types::{GroveError, Result};

pub struct MongoProfileStore {
    collection: MongoCollection<FarmDoc>,
}

impl MongoProfileStore {
    /// Open the profile collection and ensure its indexes
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        let collection = mongo.collection::<FarmDoc>(FARM_COLLECTION).await?;
        Ok(Self { collection })
    }
}

fn scope(owner: &str, name: &str) -> Document {
    doc! { "owner": owner, "name": name }
}

/// Build the update document for a plan
pub fn update_document(changes: &ProfileChanges, now: DateTime) -> Result<Document> {
    let mut set = doc! { "metadata.updated_at": now };

    if let Some(name) = &changes.rename {
        set.insert("name", name.as_str());
    }
    if let Some(location) = &changes.location {
        set.insert("location", bson::to_bson(location)?);
    }
    if let Some(area) = &changes.area {
        set.insert("area", bson::to_bson(area)?);
    }
    section_sets(&mut set, "soil", &changes.soil)?;
    section_sets(&mut set, "crop", &changes.crop)?;
    section_sets(&mut set, "irrigation", &changes.irrigation)?;

    Ok(doc! { "$set": set })
}

fn section_sets<T: Serialize>(
    set: &mut Document,
    prefix: &str,
    change: &SectionChange<T>,
) -> Result<()> {
    match change {
        SectionChange::Keep => {}
        SectionChange::Replace(section) => {
            set.insert(prefix, bson::to_bson(section)?);
        }
        SectionChange::Merge(patch) => {
            for (key, value) in bson::to_document(patch)? {
                set.insert(format!("{}.{}", prefix, key), value);
            }
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl ProfileStore for MongoProfileStore {
    async fn find(&self, owner: &str, name: &str) -> Result<Option<FarmProfile>> {
        Ok(self
            .collection
            .find_one(scope(owner, name))
            .await?
            .map(FarmProfile::from))
    }

    async fn list(&self, owner: &str) -> Result<Vec<FarmProfile>> {
        let docs = self
            .collection
            .find_sorted(doc! { "owner": owner }, doc! { "metadata.updated_at": -1 })
            .await?;
        Ok(docs.into_iter().map(FarmProfile::from).collect())
    }

    async fn insert(&self, profile: FarmProfile) -> Result<FarmProfile> {
        let mut doc = FarmDoc::from(profile);
        let name = doc.name.clone();
        let id = self.collection.insert_one(&mut doc).await.map_err(|e| match e {
            GroveError::DuplicateProfile(_) => GroveError::DuplicateProfile(name),
            other => other,
        })?;
        doc._id = Some(id);
        Ok(FarmProfile::from(doc))
    }

    async fn apply(
        &self,
        owner: &str,
        name: &str,
        changes: &ProfileChanges,
    ) -> Result<Option<FarmProfile>> {
        let update = update_document(changes, DateTime::now())?;
        debug!(owner = %owner, name = %name, update = %update, "Applying profile update");

        let updated = self
            .collection
            .find_one_and_update(scope(owner, name), update)
            .await
            .map_err(|e| match e {
                GroveError::DuplicateProfile(_) => GroveError::DuplicateProfile(
                    changes.rename.clone().unwrap_or_else(|| name.to_string()),
                ),
                other => other,
            })?;
        Ok(updated.map(FarmProfile::from))
    }

    async fn delete(&self, owner: &str, name: &str) -> Result<bool> {
        self.collection.delete_one(scope(owner, name)).await
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }
}
