//! Storage contract tests, run against every store.

#[macro_use]
mod common;

use common::*;
use locus_discovery::core::{BackendCapability, ProjectionReader, ProjectionStore};
use locus_discovery::types::{
    GeoPoint, Rating, SearchableProviderRecord, SubscriptionTier, DISTANCE_EPSILON_KM,
};

fn record(id: &str, location: GeoPoint) -> SearchableProviderRecord {
    SearchableProviderRecord::new(pid(id), format!("Provider {}", id), location, SubscriptionTier::Standard)
}

// ============================================================================
// Save / Get
// ============================================================================

async fn save_assigns_increasing_versions<S: TestableStore>(ctx: TestContext<S>) {
    let v1 = ctx.store.save(record("a", sao_paulo()), None).await.unwrap();
    assert_eq!(v1.version(), 1);

    let v2 = ctx
        .store
        .save(v1.clone().with_services([svc("plumber")]), Some(1))
        .await
        .unwrap();
    assert_eq!(v2.version(), 2);

    let loaded = ctx.store.get(&pid("a")).await.unwrap().unwrap();
    assert_eq!(loaded.version(), 2);
    assert!(loaded.same_attributes(&v2));
}

async fn stale_save_is_rejected_and_harmless<S: TestableStore>(ctx: TestContext<S>) {
    let v1 = ctx.store.save(record("a", sao_paulo()), None).await.unwrap();
    let current = ctx
        .store
        .save(v1.clone().with_services([svc("painter")]), Some(1))
        .await
        .unwrap();

    let err = ctx
        .store
        .save(v1.with_services([svc("electrician")]), Some(1))
        .await
        .unwrap_err();
    assert!(err.is_version_conflict());

    let loaded = ctx.store.get(&pid("a")).await.unwrap().unwrap();
    assert!(loaded.same_attributes(&current));
}

async fn insert_over_existing_conflicts<S: TestableStore>(ctx: TestContext<S>) {
    ctx.store.save(record("a", sao_paulo()), None).await.unwrap();
    let err = ctx.store.save(record("a", rio()), None).await.unwrap_err();
    assert!(err.is_version_conflict());
}

async fn update_of_missing_record_conflicts<S: TestableStore>(ctx: TestContext<S>) {
    let err = ctx.store.save(record("ghost", sao_paulo()), Some(3)).await.unwrap_err();
    assert!(err.is_version_conflict());
    assert!(ctx.store.get(&pid("ghost")).await.unwrap().is_none());
}

async fn rating_and_services_round_trip<S: TestableStore>(ctx: TestContext<S>) {
    let original = record("a", from_center(45.0, 3.0))
        .with_services([svc("plumber"), svc("electrician")])
        .with_rating(Rating::new(Some(dec("4.75")), 31).unwrap());
    ctx.store.save(original.clone(), None).await.unwrap();

    let loaded = ctx.store.get(&pid("a")).await.unwrap().unwrap();
    assert!(loaded.same_attributes(&original));
    assert_eq!(loaded.average_rating(), Some(dec("4.75")));
    assert_eq!(loaded.review_count(), 31);
}

// ============================================================================
// Radius queries
// ============================================================================

async fn radius_query_matches_linear_scan<S: TestableStore>(ctx: TestContext<S>) {
    let specs = mixed_providers(40);
    let records: Vec<_> = specs.iter().map(|s| record(&s.id, s.location)).collect();
    ctx.store.seed(records.clone()).await.unwrap();

    for radius in [0.5, 2.0, 7.5, 12.0, 30.0] {
        let mut expected: Vec<_> = records
            .iter()
            .filter(|r| r.location().distance_km(&sao_paulo()) <= radius + DISTANCE_EPSILON_KM)
            .map(|r| r.provider_id().clone())
            .collect();
        expected.sort();

        let mut actual: Vec<_> = ctx
            .store
            .within_radius(&sao_paulo(), radius)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.provider_id().clone())
            .collect();
        actual.sort();

        assert_eq!(actual, expected, "radius {}", radius);
    }
}

async fn radius_query_excludes_inactive<S: TestableStore>(ctx: TestContext<S>) {
    ctx.store
        .seed(vec![
            record("on", from_center(0.0, 1.0)),
            record("off", from_center(0.0, 1.0)).with_active(false),
        ])
        .await
        .unwrap();

    let hits = ctx.store.within_radius(&sao_paulo(), 5.0).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].provider_id(), &pid("on"));

    // Inactive records remain readable by id.
    assert!(ctx.store.get(&pid("off")).await.unwrap().is_some());
}

async fn moved_record_leaves_old_area<S: TestableStore>(ctx: TestContext<S>) {
    let saved = ctx.store.save(record("a", sao_paulo()), None).await.unwrap();

    let moved = SearchableProviderRecord::from_storage(
        saved.provider_id().clone(),
        saved.display_name().to_string(),
        rio(),
        saved.service_ids().clone(),
        *saved.rating(),
        saved.tier(),
        true,
        saved.version(),
        saved.updated_at(),
    );
    ctx.store.save(moved, Some(saved.version())).await.unwrap();

    assert!(ctx.store.within_radius(&sao_paulo(), 10.0).await.unwrap().is_empty());
    assert_eq!(ctx.store.within_radius(&rio(), 10.0).await.unwrap().len(), 1);
}

async fn radius_query_across_antimeridian<S: TestableStore>(ctx: TestContext<S>) {
    let fiji = GeoPoint::new(-17.0, 179.995).unwrap();
    ctx.store
        .seed(vec![
            record("east", GeoPoint::new(-17.0, 179.99).unwrap()),
            record("west", GeoPoint::new(-17.0, -179.99).unwrap()),
            record("far", GeoPoint::new(-17.0, 170.0).unwrap()),
        ])
        .await
        .unwrap();

    let mut ids: Vec<_> = ctx
        .store
        .within_radius(&fiji, 5.0)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.provider_id().to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["east", "west"]);
}

async fn radius_query_near_pole<S: TestableStore>(ctx: TestContext<S>) {
    ctx.store
        .seed(vec![
            record("a", GeoPoint::new(89.9, 0.0).unwrap()),
            record("b", GeoPoint::new(89.9, 180.0).unwrap()),
        ])
        .await
        .unwrap();

    let pole = GeoPoint::new(90.0, 0.0).unwrap();
    assert_eq!(ctx.store.within_radius(&pole, 20.0).await.unwrap().len(), 2);
}

// ============================================================================
// Remove / Count / Health
// ============================================================================

async fn remove_is_idempotent_and_unindexes<S: TestableStore>(ctx: TestContext<S>) {
    ctx.store.save(record("a", sao_paulo()), None).await.unwrap();
    assert_eq!(ctx.store.count().await.unwrap(), 1);

    assert!(ctx.store.remove(&pid("a")).await.unwrap());
    assert!(!ctx.store.remove(&pid("a")).await.unwrap());

    assert_eq!(ctx.store.count().await.unwrap(), 0);
    assert!(ctx.store.within_radius(&sao_paulo(), 1.0).await.unwrap().is_empty());

    // A removed id can be inserted again from scratch.
    let again = ctx.store.save(record("a", sao_paulo()), None).await.unwrap();
    assert_eq!(again.version(), 1);
}

async fn health_and_capabilities<S: TestableStore>(ctx: TestContext<S>) {
    ctx.store.health_check().await.unwrap();
    assert!(ctx
        .store
        .capabilities()
        .contains(&BackendCapability::OptimisticLocking));
    assert_eq!(ctx.store.store_kind(), ctx.store.kind());
    assert!(!ctx.store.backend_name().is_empty());
}

store_test!(
    save_assigns_increasing_versions,
    stale_save_is_rejected_and_harmless,
    insert_over_existing_conflicts,
    update_of_missing_record_conflicts,
    rating_and_services_round_trip,
    radius_query_matches_linear_scan,
    radius_query_excludes_inactive,
    moved_record_leaves_old_area,
    radius_query_across_antimeridian,
    radius_query_near_pole,
    remove_is_idempotent_and_unindexes,
    health_and_capabilities,
);
