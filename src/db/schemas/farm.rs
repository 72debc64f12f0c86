//! Farm profile document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::farm::{Area, Crop, FarmProfile, Irrigation, Location, Soil};

/// Collection name for farm profiles
pub const FARM_COLLECTION: &str = "farm_profiles";

/// Farm profile as stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct FarmDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Account id from the token's `user.id` claim
    pub owner: String,

    /// Profile name, unique per owner
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<Area>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil: Option<Soil>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<Crop>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irrigation: Option<Irrigation>,
}

impl From<FarmProfile> for FarmDoc {
    fn from(p: FarmProfile) -> Self {
        Self {
            _id: p.id.as_deref().and_then(|id| ObjectId::parse_str(id).ok()),
            metadata: Metadata {
                created_at: Some(DateTime::from_chrono(p.created_at)),
                updated_at: Some(DateTime::from_chrono(p.updated_at)),
            },
            owner: p.owner,
            name: p.name,
            location: p.location,
            area: p.area,
            soil: p.soil,
            crop: p.crop,
            irrigation: p.irrigation,
        }
    }
}

impl From<FarmDoc> for FarmProfile {
    fn from(d: FarmDoc) -> Self {
        Self {
            id: d._id.map(|id| id.to_hex()),
            owner: d.owner,
            name: d.name,
            location: d.location,
            area: d.area,
            soil: d.soil,
            crop: d.crop,
            irrigation: d.irrigation,
            created_at: d.metadata.created_at.map(|t| t.to_chrono()).unwrap_or_default(),
            updated_at: d.metadata.updated_at.map(|t| t.to_chrono()).unwrap_or_default(),
        }
    }
}

impl IntoIndexes for FarmDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One profile per (owner, name)
            (
                doc! { "owner": 1, "name": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("owner_name_unique".to_string())
                        .build(),
                ),
            ),
            // Listing, newest first
            (
                doc! { "owner": 1, "metadata.updated_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("owner_updated_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for FarmDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
