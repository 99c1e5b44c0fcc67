//! Validated search requests.

use std::collections::{BTreeSet, HashSet};

use rust_decimal::Decimal;

use super::geo::GeoPoint;
use super::ids::ServiceId;
use super::rating::validate_rating_value;
use super::tier::SubscriptionTier;
use crate::error::ValidationError;

/// Upper bound on page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// An immutable, validated description of one search.
///
/// Optional filters are `None` when absent. A present filter is never empty:
/// an empty collection is rejected at construction, so "no filter" and
/// "filter that matches nothing" cannot be confused.
///
/// ```
/// use locus_discovery::types::{GeoPoint, SearchCriteria, ServiceId};
///
/// let origin = GeoPoint::new(-23.5505, -46.6333).unwrap();
/// let criteria = SearchCriteria::builder(origin, 10.0)
///     .services([ServiceId::new("electrician")])
///     .page(2, 20)
///     .build()
///     .unwrap();
///
/// assert_eq!(criteria.skip(), 20);
/// assert_eq!(criteria.take(), 20);
///
/// let empty: [ServiceId; 0] = [];
/// assert!(SearchCriteria::builder(origin, 10.0).services(empty).build().is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    origin: GeoPoint,
    radius_km: f64,
    service_ids: Option<BTreeSet<ServiceId>>,
    min_rating: Option<Decimal>,
    tiers: Option<HashSet<SubscriptionTier>>,
    page: u64,
    skip: u64,
    take: u32,
}

impl SearchCriteria {
    /// Validates every argument and builds the criteria.
    ///
    /// Checks run in a fixed order and the first failure is reported:
    /// radius, page, page size, minimum rating, then empty filters.
    pub fn build(
        origin: GeoPoint,
        radius_km: f64,
        service_ids: Option<BTreeSet<ServiceId>>,
        min_rating: Option<Decimal>,
        tiers: Option<HashSet<SubscriptionTier>>,
        page: i64,
        page_size: i64,
    ) -> Result<Self, ValidationError> {
        Self::build_bounded(
            origin,
            radius_km,
            service_ids,
            min_rating,
            tiers,
            page,
            page_size,
            MAX_PAGE_SIZE,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build_bounded(
        origin: GeoPoint,
        radius_km: f64,
        service_ids: Option<BTreeSet<ServiceId>>,
        min_rating: Option<Decimal>,
        tiers: Option<HashSet<SubscriptionTier>>,
        page: i64,
        page_size: i64,
        max_page_size: u32,
    ) -> Result<Self, ValidationError> {
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(ValidationError::InvalidRadius { radius_km });
        }

        if page < 1 {
            return Err(ValidationError::InvalidPage { page });
        }
        if page_size < 1 || page_size > i64::from(max_page_size) {
            return Err(ValidationError::InvalidPageSize {
                page_size,
                max: max_page_size,
            });
        }
        let skip = ((page - 1) as u64)
            .checked_mul(page_size as u64)
            .ok_or(ValidationError::InvalidPage { page })?;

        if let Some(floor) = min_rating {
            validate_rating_value("min_rating", floor)?;
        }

        if let Some(services) = &service_ids {
            if services.is_empty() {
                return Err(ValidationError::EmptyFilter {
                    field: "service_ids",
                });
            }
            for service in services {
                service.validate()?;
            }
        }
        if tiers.as_ref().is_some_and(|t| t.is_empty()) {
            return Err(ValidationError::EmptyFilter { field: "tiers" });
        }

        Ok(Self {
            origin,
            radius_km,
            service_ids,
            min_rating,
            tiers,
            page: page as u64,
            skip,
            take: page_size as u32,
        })
    }

    /// Starts a builder with the mandatory origin and radius.
    pub fn builder(origin: GeoPoint, radius_km: f64) -> SearchCriteriaBuilder {
        SearchCriteriaBuilder::new(origin, radius_km)
    }

    /// Search center.
    pub fn origin(&self) -> &GeoPoint {
        &self.origin
    }

    /// Inclusive search radius in kilometers.
    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    /// Any-of service filter.
    pub fn service_ids(&self) -> Option<&BTreeSet<ServiceId>> {
        self.service_ids.as_ref()
    }

    /// Minimum average rating.
    pub fn min_rating(&self) -> Option<Decimal> {
        self.min_rating
    }

    /// Accepted tiers.
    pub fn tiers(&self) -> Option<&HashSet<SubscriptionTier>> {
        self.tiers.as_ref()
    }

    /// The 1-based page number.
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Number of ranked matches before this page.
    pub fn skip(&self) -> u64 {
        self.skip
    }

    /// Page size.
    pub fn take(&self) -> u32 {
        self.take
    }

    /// Returns `true` if any filter beyond the radius is present.
    pub fn has_filters(&self) -> bool {
        self.service_ids.is_some() || self.min_rating.is_some() || self.tiers.is_some()
    }
}

/// Fluent construction of [`SearchCriteria`].
///
/// Defaults: page 1, page size 20, no filters, page-size bound [`MAX_PAGE_SIZE`].
#[derive(Debug, Clone)]
pub struct SearchCriteriaBuilder {
    origin: GeoPoint,
    radius_km: f64,
    service_ids: Option<BTreeSet<ServiceId>>,
    min_rating: Option<Decimal>,
    tiers: Option<HashSet<SubscriptionTier>>,
    page: i64,
    page_size: i64,
    max_page_size: u32,
}

impl SearchCriteriaBuilder {
    /// Creates a builder with default paging and no filters.
    pub fn new(origin: GeoPoint, radius_km: f64) -> Self {
        Self {
            origin,
            radius_km,
            service_ids: None,
            min_rating: None,
            tiers: None,
            page: 1,
            page_size: 20,
            max_page_size: MAX_PAGE_SIZE,
        }
    }

    /// Keeps providers offering any of `services`.
    pub fn services(mut self, services: impl IntoIterator<Item = ServiceId>) -> Self {
        self.service_ids = Some(services.into_iter().collect());
        self
    }

    /// Keeps providers rated at least `min_rating`.
    pub fn min_rating(mut self, min_rating: Decimal) -> Self {
        self.min_rating = Some(min_rating);
        self
    }

    /// Keeps providers in one of `tiers`.
    pub fn tiers(mut self, tiers: impl IntoIterator<Item = SubscriptionTier>) -> Self {
        self.tiers = Some(tiers.into_iter().collect());
        self
    }

    /// Sets the 1-based page number and page size.
    pub fn page(mut self, page: i64, page_size: i64) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Sets the page size only.
    pub fn page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Lowers the page-size bound. Values above [`MAX_PAGE_SIZE`] are clamped.
    pub fn max_page_size(mut self, max: u32) -> Self {
        self.max_page_size = max.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Validates and builds the criteria.
    pub fn build(self) -> Result<SearchCriteria, ValidationError> {
        SearchCriteria::build_bounded(
            self.origin,
            self.radius_km,
            self.service_ids,
            self.min_rating,
            self.tiers,
            self.page,
            self.page_size,
            self.max_page_size,
        )
    }
}
