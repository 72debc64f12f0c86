//! Integration tests for the profile service
//!
//! Drive `ProfileService` over the in-memory store the way the HTTP layer
//! does: raw JSON bodies in, typed profiles or errors out.

use grove::farm::{Bahar, IrrigationMethod, SoilType, DEFAULT_CROP_NAME};
use grove::services::ProfileService;
use grove::store::MemoryProfileStore;
use grove::GroveError;
use serde_json::{json, Value};
use std::sync::Arc;

fn service() -> Arc<ProfileService> {
    Arc::new(ProfileService::new(Arc::new(MemoryProfileStore::new())))
}

fn basic(name: &str) -> Value {
    json!({
        "name": name,
        "location": { "latitude": 21.15, "longitude": 79.09, "elevation": 310 },
        "area": { "length": 120, "width": 80, "totalHectares": 0.96 }
    })
}

fn field_errors(err: GroveError) -> Vec<String> {
    match err {
        GroveError::Validation(errors) => errors.into_iter().map(|e| e.field).collect(),
        other => panic!("expected validation error, got {:?}", other),
    }
}

/// Repeating an identical create-or-update changes nothing but `updatedAt`
#[tokio::test]
async fn test_upsert_is_idempotent_on_basic_info() {
    let svc = service();
    let first = svc.create_or_update("grower-a", &basic("North Field")).await.unwrap();
    assert!(first.created);

    let second = svc.create_or_update("grower-a", &basic("North Field")).await.unwrap();
    assert!(!second.created);
    assert_eq!(second.profile.location, first.profile.location);
    assert_eq!(second.profile.area, first.profile.area);
    assert_eq!(second.profile.created_at, first.profile.created_at);
    assert!(second.profile.updated_at >= first.profile.updated_at);

    assert_eq!(svc.list("grower-a").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_upsert_merges_soil_fields() {
    let svc = service();
    let mut body = basic("North Field");
    body["soil"] = json!({ "type": "Loam", "waterHoldingCapacity": 150, "drainoutPeriod": 6 });
    svc.create_or_update("grower-a", &body).await.unwrap();

    let out = svc
        .create_or_update(
            "grower-a",
            &json!({ "name": "North Field", "soil": { "waterHoldingCapacity": 160 } }),
        )
        .await
        .unwrap();

    let soil = out.profile.soil.unwrap();
    assert_eq!(soil.soil_type, Some(SoilType::Loam));
    assert_eq!(soil.water_holding_capacity, Some(160.0));
    assert_eq!(soil.drainout_period, Some(6.0));
}

#[tokio::test]
async fn test_section_patch_replaces_without_residue() {
    let svc = service();
    svc.create_or_update("grower-a", &basic("North Field")).await.unwrap();

    svc.patch_section(
        "grower-a",
        "North Field",
        "soil",
        &json!({ "type": "Sand", "waterHoldingCapacity": 100, "drainoutPeriod": 3 }),
    )
    .await
    .unwrap();
    let profile = svc
        .patch_section(
            "grower-a",
            "North Field",
            "soil",
            &json!({ "type": "Clay", "waterHoldingCapacity": 180, "drainoutPeriod": 9 }),
        )
        .await
        .unwrap();

    let soil = profile.soil.unwrap();
    assert_eq!(soil.soil_type, Some(SoilType::Clay));
    assert_eq!(soil.water_holding_capacity, Some(180.0));
    assert_eq!(soil.drainout_period, Some(9.0));
}

#[tokio::test]
async fn test_section_patch_never_creates() {
    let err = service()
        .patch_section(
            "grower-a",
            "Ghost Field",
            "soil",
            &json!({ "type": "Sand", "waterHoldingCapacity": 100, "drainoutPeriod": 3 }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GroveError::NotFound(_)));
}

#[tokio::test]
async fn test_crop_patch_canonicalizes_bahar() {
    let svc = service();
    svc.create_or_update("grower-a", &basic("North Field")).await.unwrap();

    for (sent, stored) in [("Ambia", Bahar::Ambe), ("Ambe", Bahar::Ambe), ("Mruga", Bahar::Mrig)] {
        let profile = svc
            .patch_section(
                "grower-a",
                "North Field",
                "crop",
                &json!({
                    "name": "Kinnow",
                    "age": 8,
                    "spacing": "6 X 6",
                    "bahar": sent,
                    "stressPeriod": 30
                }),
            )
            .await
            .unwrap();
        let crop = profile.crop.unwrap();
        assert_eq!(crop.bahar, Some(stored));
        assert_eq!(crop.name.as_deref(), Some("Kinnow"));
        assert_eq!(crop.stress_period, Some(30.0));
    }
}

/// A crop patch naming only some fields is rejected and the stored crop
/// keeps its name and stress period
#[tokio::test]
async fn test_partial_crop_patch_keeps_stored_crop() {
    let svc = service();
    let mut body = basic("North Field");
    body["crop"] = json!({
        "name": "Kinnow", "age": 8, "spacing": "6 X 6", "bahar": "Ambe", "stressPeriod": 30
    });
    let created = svc.create_or_update("grower-a", &body).await.unwrap();
    assert_ne!(created.profile.crop.as_ref().unwrap().name.as_deref(), Some(DEFAULT_CROP_NAME));

    let err = svc
        .patch_section(
            "grower-a",
            "North Field",
            "crop",
            &json!({ "age": 9, "spacing": "5 X 5", "bahar": "Mrig" }),
        )
        .await
        .unwrap_err();
    assert_eq!(field_errors(err), vec!["crop.name", "crop.stressPeriod"]);

    let crop = svc.get("grower-a", "North Field").await.unwrap().crop.unwrap();
    assert_eq!(crop.name.as_deref(), Some("Kinnow"));
    assert_eq!(crop.stress_period, Some(30.0));
    assert_eq!(crop.age, Some(8.0));
}

/// A repeat create-or-update with new location data updates in place
#[tokio::test]
async fn test_repeat_upsert_updates_location() {
    let svc = service();
    svc.create_or_update("grower-a", &basic("North Field")).await.unwrap();
    svc.create_or_update("grower-a", &basic("North Field")).await.unwrap();

    let mut moved = basic("North Field");
    moved["location"] = json!({ "latitude": 20.5, "longitude": 78.5, "elevation": 280 });
    let out = svc.create_or_update("grower-a", &moved).await.unwrap();
    assert!(!out.created);

    let location = out.profile.location.unwrap();
    assert_eq!(location.latitude, Some(20.5));
    assert_eq!(location.longitude, Some(78.5));
    assert_eq!(location.elevation, Some(280.0));

    let stored = svc.get("grower-a", "North Field").await.unwrap();
    assert_eq!(stored.location.unwrap().latitude, Some(20.5));
    assert_eq!(svc.list("grower-a").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_irrigation_patch_method_fallback() {
    let svc = service();
    svc.create_or_update("grower-a", &basic("North Field")).await.unwrap();
    let irrigation = json!({
        "wettedAreaFactor": 0.6, "efficiency": 0.9, "lateralGeometry": "Single",
        "lateralSpacing": 6, "emissionUniformity": 92, "emitterDischarge": 4,
        "emittersPerPlant": 4
    });

    let profile = svc
        .patch_section("grower-a", "North Field", "irrigation", &irrigation)
        .await
        .unwrap();
    assert_eq!(profile.irrigation.unwrap().method, Some(IrrigationMethod::Drip));

    let mut with_method = irrigation.clone();
    with_method["method"] = json!("Sprinkler");
    svc.patch_section("grower-a", "North Field", "irrigation", &with_method)
        .await
        .unwrap();

    let profile = svc
        .patch_section("grower-a", "North Field", "irrigation", &irrigation)
        .await
        .unwrap();
    assert_eq!(profile.irrigation.unwrap().method, Some(IrrigationMethod::Sprinkler));
}

#[tokio::test]
async fn test_ownership_isolation() {
    let svc = service();
    svc.create_or_update("grower-a", &basic("North Field")).await.unwrap();

    assert!(svc.list("grower-b").await.unwrap().is_empty());
    assert!(matches!(
        svc.get("grower-b", "North Field").await,
        Err(GroveError::NotFound(_))
    ));
    assert!(matches!(
        svc.patch_section(
            "grower-b",
            "North Field",
            "soil",
            &json!({ "type": "Sand", "waterHoldingCapacity": 1, "drainoutPeriod": 1 })
        )
        .await,
        Err(GroveError::NotFound(_))
    ));
    assert!(matches!(
        svc.delete("grower-b", "North Field").await,
        Err(GroveError::NotFound(_))
    ));

    // B may use the same name for a farm of their own
    let out = svc.create_or_update("grower-b", &basic("North Field")).await.unwrap();
    assert!(out.created);
    assert!(svc.get("grower-a", "North Field").await.unwrap().soil.is_none());
}

#[tokio::test]
async fn test_boundaries() {
    let svc = service();
    svc.create_or_update("grower-a", &basic("North Field")).await.unwrap();

    for age in [0, 51] {
        let err = svc
            .patch_section(
                "grower-a",
                "North Field",
                "crop",
                &json!({
                    "name": "Kinnow",
                    "age": age,
                    "spacing": "5 X 5",
                    "bahar": "Mrig",
                    "stressPeriod": 40
                }),
            )
            .await
            .unwrap_err();
        assert_eq!(field_errors(err), vec!["crop.age"]);
    }

    let err = svc
        .patch_section(
            "grower-a",
            "North Field",
            "irrigation",
            &json!({
                "wettedAreaFactor": 0.6, "efficiency": 0.9, "lateralGeometry": "Single",
                "lateralSpacing": 6, "emissionUniformity": 92, "emitterDischarge": 4,
                "emittersPerPlant": 0
            }),
        )
        .await
        .unwrap_err();
    assert_eq!(field_errors(err), vec!["irrigation.emittersPerPlant"]);

    let mut edge = basic("Edge Field");
    edge["location"]["latitude"] = json!(90);
    assert!(svc.create_or_update("grower-a", &edge).await.is_ok());

    let mut over = basic("Over Field");
    over["location"]["latitude"] = json!(90.0001);
    let err = svc.create_or_update("grower-a", &over).await.unwrap_err();
    assert_eq!(field_errors(err), vec!["location.latitude"]);
}

#[tokio::test]
async fn test_replace_whole_renames_and_detects_conflict() {
    let svc = service();
    svc.create_or_update("grower-a", &basic("North Field")).await.unwrap();
    svc.create_or_update("grower-a", &basic("East Field")).await.unwrap();

    let err = svc
        .replace_whole("grower-a", "North Field", &json!({ "name": "East Field" }))
        .await
        .unwrap_err();
    assert!(matches!(err, GroveError::DuplicateProfile(_)));

    let renamed = svc
        .replace_whole("grower-a", "North Field", &json!({ "name": "West Field" }))
        .await
        .unwrap();
    assert_eq!(renamed.name, "West Field");
    assert!(svc.get("grower-a", "North Field").await.is_err());
    assert!(svc.get("grower-a", "West Field").await.is_ok());
}

#[tokio::test]
async fn test_replace_whole_missing_profile() {
    let err = service()
        .replace_whole("grower-a", "Ghost Field", &json!({ "soil": { "type": "Sand" } }))
        .await
        .unwrap_err();
    assert!(matches!(err, GroveError::NotFound(_)));
}

#[tokio::test]
async fn test_deleted_name_can_be_reused() {
    let svc = service();
    svc.create_or_update("grower-a", &basic("North Field")).await.unwrap();
    svc.delete("grower-a", "North Field").await.unwrap();

    let out = svc.create_or_update("grower-a", &basic("North Field")).await.unwrap();
    assert!(out.created);
}

/// Concurrent patches of different sections both survive
#[tokio::test]
async fn test_concurrent_section_patches() {
    let svc = service();
    svc.create_or_update("grower-a", &basic("North Field")).await.unwrap();

    let soil = {
        let svc = svc.clone();
        tokio::spawn(async move {
            svc.patch_section(
                "grower-a",
                "North Field",
                "soil",
                &json!({ "type": "Loam", "waterHoldingCapacity": 150, "drainoutPeriod": 6 }),
            )
            .await
        })
    };
    let crop = {
        let svc = svc.clone();
        tokio::spawn(async move {
            svc.patch_section(
                "grower-a",
                "North Field",
                "crop",
                &json!({
                    "name": "Nagpur Mandarin",
                    "age": 10,
                    "spacing": "6 X 6",
                    "bahar": "Hasta",
                    "stressPeriod": 50
                }),
            )
            .await
        })
    };
    soil.await.unwrap().unwrap();
    crop.await.unwrap().unwrap();

    let profile = svc.get("grower-a", "North Field").await.unwrap();
    assert_eq!(profile.soil.unwrap().soil_type, Some(SoilType::Loam));
    assert_eq!(profile.crop.unwrap().bahar, Some(Bahar::Hasta));
}

/// Racing creates of one name end with a single profile
#[tokio::test]
async fn test_concurrent_creates_never_duplicate() {
    let svc = service();
    let mut handles = Vec::new();
    for _ in 0..6 {
        let svc = svc.clone();
        handles.push(tokio::spawn(async move {
            svc.create_or_update("grower-a", &basic("North Field")).await
        }));
    }

    let mut created = 0;
    for h in handles {
        if h.await.unwrap().unwrap().created {
            created += 1;
        }
    }
    assert_eq!(created, 1);
    assert_eq!(svc.list("grower-a").await.unwrap().len(), 1);
}
