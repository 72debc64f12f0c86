//! Profile service
//!
//! The operation set behind the HTTP API. Every call is scoped to the owner
//! id of an authenticated caller; a profile owned by someone else is reported
//! exactly like a missing one.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use super::locks::ProfileLocks;
use crate::farm::reconcile::{plan_replace, plan_section_patch, plan_upsert};
use crate::farm::validate::payload_name;
use crate::farm::{FarmProfile, ProfileChanges, Section, UpsertPlan};
use crate::store::ProfileStore;
use crate::types::{GroveError, Result};

const NOT_FOUND: &str = "Farm not found";

/// Result of a create-or-update
#[derive(Debug, Clone)]
pub struct Upserted {
    pub profile: FarmProfile,
    pub created: bool,
}

pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
    locks: ProfileLocks,
}

impl ProfileService {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            store,
            locks: ProfileLocks::new(),
        }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Create the profile named in `body`, or merge `body` into it
    pub async fn create_or_update(&self, owner: &str, body: &Value) -> Result<Upserted> {
        let name = payload_name(body)?
            .ok_or_else(|| GroveError::invalid("name", "Farm name is required"))?;

        self.locks
            .serialize(owner, &name, || self.upsert_locked(owner, &name, body))
            .await
    }

    /// Caller's profiles, most recently updated first
    pub async fn list(&self, owner: &str) -> Result<Vec<FarmProfile>> {
        let profiles = self.store.list(owner).await?;
        debug!(owner = %owner, count = profiles.len(), "Listed farm profiles");
        Ok(profiles)
    }

    pub async fn get(&self, owner: &str, name: &str) -> Result<FarmProfile> {
        self.store
            .find(owner, name)
            .await?
            .ok_or_else(|| GroveError::NotFound(NOT_FOUND.into()))
    }

    /// Replace one section (`soil`, `crop` or `irrigation`) in full
    pub async fn patch_section(
        &self,
        owner: &str,
        name: &str,
        section: &str,
        body: &Value,
    ) -> Result<FarmProfile> {
        let section: Section = section.parse()?;

        self.locks
            .serialize(owner, name, || self.patch_locked(owner, name, section, body))
            .await
    }

    /// Replace every supplied top-level field; a new `name` renames
    pub async fn replace_whole(
        &self,
        owner: &str,
        name: &str,
        body: &Value,
    ) -> Result<FarmProfile> {
        self.locks
            .serialize(owner, name, || self.replace_locked(owner, name, body))
            .await
    }

    pub async fn delete(&self, owner: &str, name: &str) -> Result<()> {
        let removed = self
            .locks
            .serialize(owner, name, || self.store.delete(owner, name))
            .await?;
        if !removed {
            return Err(GroveError::NotFound(NOT_FOUND.into()));
        }
        info!(owner = %owner, name = %name, "Farm profile deleted");
        Ok(())
    }

    async fn upsert_locked(&self, owner: &str, name: &str, body: &Value) -> Result<Upserted> {
        let existing = self.store.find(owner, name).await?;
        match plan_upsert(owner, name, existing.as_ref(), body)? {
            UpsertPlan::Create(profile) => {
                let profile = self.store.insert(profile).await?;
                info!(owner = %owner, name = %name, "Farm profile created");
                Ok(Upserted {
                    profile,
                    created: true,
                })
            }
            UpsertPlan::Update(changes) => {
                let profile = self.write(owner, name, &changes).await?;
                info!(owner = %owner, name = %name, "Farm profile updated");
                Ok(Upserted {
                    profile,
                    created: false,
                })
            }
        }
    }

    async fn patch_locked(
        &self,
        owner: &str,
        name: &str,
        section: Section,
        body: &Value,
    ) -> Result<FarmProfile> {
        let stored = self.get(owner, name).await?;
        let changes = plan_section_patch(&stored, section, body)?;
        let profile = self.write(owner, name, &changes).await?;
        info!(owner = %owner, name = %name, section = %section, "Farm section replaced");
        Ok(profile)
    }

    async fn replace_locked(&self, owner: &str, name: &str, body: &Value) -> Result<FarmProfile> {
        let stored = self.get(owner, name).await?;
        let changes = plan_replace(&stored, body)?;
        let profile = self.write(owner, name, &changes).await?;
        match &changes.rename {
            Some(to) => {
                info!(owner = %owner, name = %name, renamed = %to, "Farm profile replaced")
            }
            None => info!(owner = %owner, name = %name, "Farm profile replaced"),
        }
        Ok(profile)
    }

    /// Apply a plan; the profile vanishing underneath is `NotFound`
    async fn write(
        &self,
        owner: &str,
        name: &str,
        changes: &ProfileChanges,
    ) -> Result<FarmProfile> {
        self.store
            .apply(owner, name, changes)
            .await?
            .ok_or_else(|| GroveError::NotFound(NOT_FOUND.into()))
    }
}
