//! Value types shared by the maintainer, the stores and the search engine.

pub mod criteria;
pub mod geo;
pub mod ids;
pub mod rating;
pub mod record;
pub mod result;
pub mod tier;

pub use criteria::{MAX_PAGE_SIZE, SearchCriteria, SearchCriteriaBuilder};
pub use geo::{BoundingBox, DISTANCE_EPSILON_KM, EARTH_RADIUS_KM, GeoPoint, LonSpan};
pub use ids::{ProviderId, ServiceId};
pub use rating::{MAX_RATING, MIN_RATING, Rating};
pub use record::SearchableProviderRecord;
pub use result::{RankedProvider, SearchResult};
pub use tier::{SubscriptionTier, TIER_RANKING};
