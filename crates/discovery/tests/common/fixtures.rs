//! Test fixtures around São Paulo.

use locus_discovery::ProjectionMaintainer;
use locus_discovery::core::ProjectionStore;
use locus_discovery::types::{GeoPoint, ProviderId, ServiceId, SubscriptionTier, TIER_RANKING};
use rust_decimal::Decimal;

/// São Paulo city center.
pub fn sao_paulo() -> GeoPoint {
    GeoPoint::new(-23.5505, -46.6333).unwrap()
}

/// Rio de Janeiro, about 360 km from [`sao_paulo`].
pub fn rio() -> GeoPoint {
    GeoPoint::new(-22.9068, -43.1729).unwrap()
}

/// A point `km` from São Paulo along `bearing` degrees.
pub fn from_center(bearing: f64, km: f64) -> GeoPoint {
    sao_paulo().destination(bearing, km).unwrap()
}

/// Parses a decimal literal.
pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Shorthand for a service id.
pub fn svc(name: &str) -> ServiceId {
    ServiceId::new(name)
}

/// Shorthand for a provider id.
pub fn pid(id: &str) -> ProviderId {
    ProviderId::new(id)
}

/// Description of one seeded provider.
#[derive(Debug, Clone)]
pub struct ProviderSpec {
    pub id: String,
    pub tier: SubscriptionTier,
    pub location: GeoPoint,
    pub services: Vec<ServiceId>,
    pub rating: Option<(Decimal, i64)>,
}

impl ProviderSpec {
    pub fn new(id: &str, tier: SubscriptionTier, location: GeoPoint) -> Self {
        Self {
            id: id.to_string(),
            tier,
            location,
            services: Vec::new(),
            rating: None,
        }
    }

    pub fn services(mut self, services: &[&str]) -> Self {
        self.services = services.iter().map(|s| svc(s)).collect();
        self
    }

    pub fn rated(mut self, average: &str, reviews: i64) -> Self {
        self.rating = Some((dec(average), reviews));
        self
    }
}

/// Creates every provider through the maintainer, as events would.
pub async fn seed<S: ProjectionStore>(maintainer: &ProjectionMaintainer<S>, specs: &[ProviderSpec]) {
    for spec in specs {
        let id = pid(&spec.id);
        maintainer
            .create(&id, format!("Provider {}", spec.id), spec.location, spec.tier)
            .await
            .unwrap();
        if !spec.services.is_empty() {
            maintainer
                .update_services(&id, spec.services.clone())
                .await
                .unwrap();
        }
        if let Some((average, reviews)) = spec.rating {
            maintainer
                .update_rating(&id, Some(average), reviews)
                .await
                .unwrap();
        }
    }
}

/// A deterministic mix of tiers, ratings, services and distances.
///
/// Every provider lies within 25 km of São Paulo. Every fourth one is unrated.
pub fn mixed_providers(count: usize) -> Vec<ProviderSpec> {
    const SERVICES: [&str; 3] = ["electrician", "plumber", "painter"];

    (0..count)
        .map(|i| {
            let tier = TIER_RANKING[i % TIER_RANKING.len()];
            let bearing = ((i * 53) % 360) as f64;
            let km = 0.3 + ((i * 37) % 240) as f64 / 10.0;
            let mut spec = ProviderSpec::new(&format!("mix-{:03}", i), tier, from_center(bearing, km))
                .services(&[SERVICES[i % 3]]);
            if i % 5 == 0 {
                spec = spec.services(&[SERVICES[i % 3], SERVICES[(i + 1) % 3]]);
            }
            if i % 4 != 0 {
                let tenths = 20 + ((i * 7) % 31) as i64;
                spec.rating = Some((Decimal::new(tenths, 1), 1 + i as i64));
            }
            spec
        })
        .collect()
}
