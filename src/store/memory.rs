//! In-memory profile store
//!
//! Used in dev mode when MongoDB is unavailable, and by tests.

use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::warn;

use super::ProfileStore;
use crate::farm::{FarmProfile, ProfileChanges};
use crate::types::{GroveError, Result};

type ProfileKey = (String, String);

fn key(owner: &str, name: &str) -> ProfileKey {
    (owner.to_string(), name.to_string())
}

#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<ProfileKey, FarmProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        warn!("Profile store running in memory-only mode (no MongoDB)");
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.profiles.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn find(&self, owner: &str, name: &str) -> Result<Option<FarmProfile>> {
        Ok(self.profiles.read().await.get(&key(owner, name)).cloned())
    }

    async fn list(&self, owner: &str) -> Result<Vec<FarmProfile>> {
        let mut profiles: Vec<FarmProfile> = self
            .profiles
            .read()
            .await
            .values()
            .filter(|p| p.owner == owner)
            .cloned()
            .collect();
        profiles.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(profiles)
    }

    async fn insert(&self, mut profile: FarmProfile) -> Result<FarmProfile> {
        let mut profiles = self.profiles.write().await;
        let k = key(&profile.owner, &profile.name);
        if profiles.contains_key(&k) {
            return Err(GroveError::DuplicateProfile(profile.name));
        }

        let now = Utc::now();
        profile.created_at = now;
        profile.updated_at = now;
        profiles.insert(k, profile.clone());
        Ok(profile)
    }

    async fn apply(
        &self,
        owner: &str,
        name: &str,
        changes: &ProfileChanges,
    ) -> Result<Option<FarmProfile>> {
        let mut profiles = self.profiles.write().await;
        let k = key(owner, name);
        if !profiles.contains_key(&k) {
            return Ok(None);
        }

        if let Some(new_name) = &changes.rename {
            if profiles.contains_key(&key(owner, new_name)) {
                return Err(GroveError::DuplicateProfile(new_name.clone()));
            }
        }

        let Some(mut profile) = profiles.remove(&k) else {
            return Ok(None);
        };
        profile.apply(changes, Utc::now());
        profiles.insert(key(owner, &profile.name), profile.clone());
        Ok(Some(profile))
    }

    async fn delete(&self, owner: &str, name: &str) -> Result<bool> {
        Ok(self.profiles.write().await.remove(&key(owner, name)).is_some())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::farm::{Location, SectionChange, Soil, SoilType};

    #[tokio::test]
    async fn test_insert_rejects_duplicate_per_owner() {
        let store = MemoryProfileStore::new();
        store.insert(FarmProfile::new("a", "North Field")).await.unwrap();

        let err = store.insert(FarmProfile::new("a", "North Field")).await.unwrap_err();
        assert!(matches!(err, GroveError::DuplicateProfile(_)));

        // Same name under another owner is fine
        store.insert(FarmProfile::new("b", "North Field")).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_apply_missing_profile_is_none() {
        let store = MemoryProfileStore::new();
        let changes = ProfileChanges {
            location: Some(Location::default()),
            ..Default::default()
        };
        assert!(store.apply("a", "nope", &changes).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_merges_and_stamps() {
        let store = MemoryProfileStore::new();
        let created = store.insert(FarmProfile::new("a", "North Field")).await.unwrap();

        let changes = ProfileChanges {
            soil: SectionChange::Merge(Soil {
                soil_type: Some(SoilType::Sand),
                ..Default::default()
            }),
            ..Default::default()
        };
        let updated = store.apply("a", "North Field", &changes).await.unwrap().unwrap();
        assert_eq!(updated.soil.unwrap().soil_type, Some(SoilType::Sand));
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_rename_onto_taken_name_is_duplicate() {
        let store = MemoryProfileStore::new();
        store.insert(FarmProfile::new("a", "North Field")).await.unwrap();
        store.insert(FarmProfile::new("a", "East Field")).await.unwrap();

        let changes = ProfileChanges {
            rename: Some("East Field".into()),
            ..Default::default()
        };
        let err = store.apply("a", "North Field", &changes).await.unwrap_err();
        assert!(matches!(err, GroveError::DuplicateProfile(_)));
        assert!(store.find("a", "North Field").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rename_moves_profile() {
        let store = MemoryProfileStore::new();
        store.insert(FarmProfile::new("a", "North Field")).await.unwrap();

        let changes = ProfileChanges {
            rename: Some("West Field".into()),
            ..Default::default()
        };
        store.apply("a", "North Field", &changes).await.unwrap().unwrap();
        assert!(store.find("a", "North Field").await.unwrap().is_none());
        assert!(store.find("a", "West Field").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_is_owner_scoped_and_newest_first() {
        let store = MemoryProfileStore::new();
        store.insert(FarmProfile::new("a", "First")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.insert(FarmProfile::new("a", "Second")).await.unwrap();
        store.insert(FarmProfile::new("b", "Other")).await.unwrap();

        let names: Vec<String> = store
            .list("a")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Second", "First"]);
    }
}
