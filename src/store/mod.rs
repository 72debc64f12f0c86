//! Farm profile persistence
//!
//! `ProfileStore` is the seam between the profile service and its backend.
//! Every method is scoped by owner; a profile of another owner is
//! indistinguishable from a missing one. `apply` must be atomic per profile.

pub mod memory;
pub mod mongo;

pub use memory::MemoryProfileStore;
pub use mongo::{update_document, MongoProfileStore};

use crate::farm::{FarmProfile, ProfileChanges};
use crate::types::Result;

#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// Profile named `name` owned by `owner`
    async fn find(&self, owner: &str, name: &str) -> Result<Option<FarmProfile>>;

    /// All profiles of `owner`, most recently updated first
    async fn list(&self, owner: &str) -> Result<Vec<FarmProfile>>;

    /// Persist a new profile. Fails with `DuplicateProfile` when
    /// (owner, name) is taken.
    async fn insert(&self, profile: FarmProfile) -> Result<FarmProfile>;

    /// Apply a plan to an existing profile and return the result;
    /// `None` when there is no such profile.
    async fn apply(
        &self,
        owner: &str,
        name: &str,
        changes: &ProfileChanges,
    ) -> Result<Option<FarmProfile>>;

    /// Remove a profile; `false` when there was none
    async fn delete(&self, owner: &str, name: &str) -> Result<bool>;

    /// Backend label for logs
    fn backend(&self) -> &'static str;
}
