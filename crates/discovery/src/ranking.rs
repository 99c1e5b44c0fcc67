//! Filter stages and the ranking comparator.
//!
//! Filters compose by conjunction: radius, then services (any-of), then
//! minimum rating, then tiers. The comparator orders by tier rank
//! descending, average rating descending with unrated last, distance
//! ascending, then provider id ascending. The last key is unique, so the
//! order is total and pagination is reproducible.

use std::cmp::Ordering;

use crate::types::{
    DISTANCE_EPSILON_KM, RankedProvider, SearchCriteria, SearchableProviderRecord,
};

/// Radius stage. Returns the distance when the record is active and inside
/// the (inclusive) radius.
pub fn radius_distance(record: &SearchableProviderRecord, criteria: &SearchCriteria) -> Option<f64> {
    if !record.is_active() {
        return None;
    }
    let distance = record.location().distance_km(criteria.origin());
    (distance <= criteria.radius_km() + DISTANCE_EPSILON_KM).then_some(distance)
}

/// Service stage: passes when no filter is set or any requested service is offered.
pub fn matches_services(record: &SearchableProviderRecord, criteria: &SearchCriteria) -> bool {
    criteria
        .service_ids()
        .is_none_or(|wanted| record.offers_any(wanted))
}

/// Rating stage: unrated records fail whenever a floor is set.
pub fn matches_rating(record: &SearchableProviderRecord, criteria: &SearchCriteria) -> bool {
    criteria
        .min_rating()
        .is_none_or(|floor| record.rating().meets(floor))
}

/// Tier stage.
pub fn matches_tier(record: &SearchableProviderRecord, criteria: &SearchCriteria) -> bool {
    criteria
        .tiers()
        .is_none_or(|tiers| tiers.contains(&record.tier()))
}

/// Runs every stage. Returns the ranked hit when the record qualifies.
pub fn evaluate(record: SearchableProviderRecord, criteria: &SearchCriteria) -> Option<RankedProvider> {
    let distance_km = radius_distance(&record, criteria)?;
    if matches_services(&record, criteria)
        && matches_rating(&record, criteria)
        && matches_tier(&record, criteria)
    {
        Some(RankedProvider {
            record,
            distance_km,
        })
    } else {
        None
    }
}

/// Distance in units of [`DISTANCE_EPSILON_KM`], so near-equal distances tie.
fn distance_key(distance_km: f64) -> i64 {
    (distance_km / DISTANCE_EPSILON_KM).round() as i64
}

/// The ranking order: `Less` means `a` is listed before `b`.
pub fn compare(a: &RankedProvider, b: &RankedProvider) -> Ordering {
    b.record
        .tier()
        .cmp_rank(&a.record.tier())
        .then_with(|| {
            // Some(_) > None, so reversing puts unrated last.
            b.record.average_rating().cmp(&a.record.average_rating())
        })
        .then_with(|| distance_key(a.distance_km).cmp(&distance_key(b.distance_km)))
        .then_with(|| a.record.provider_id().cmp(b.record.provider_id()))
}

/// Sorts hits into ranking order.
pub fn rank(hits: &mut [RankedProvider]) {
    hits.sort_by(compare);
}
