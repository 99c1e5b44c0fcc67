//! Geographic points and great-circle distance.
//!
//! [`GeoPoint`] is a validated latitude/longitude pair. Distances use the
//! haversine formula over a spherical Earth of radius [`EARTH_RADIUS_KM`].
//! [`BoundingBox`] gives a cheap rectangular pre-filter that always contains
//! the exact radius circle, including across the antimeridian and the poles.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Mean Earth radius in kilometers (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Tolerance used for every distance comparison (radius boundary and ranking ties).
pub const DISTANCE_EPSILON_KM: f64 = 1e-6;

/// Slack added to bounding boxes so the pre-filter never rejects a point the
/// exact check would accept.
const BOX_SLACK_KM: f64 = 0.001;

const MIN_LATITUDE: f64 = -90.0;
const MAX_LATITUDE: f64 = 90.0;
const MIN_LONGITUDE: f64 = -180.0;
const MAX_LONGITUDE: f64 = 180.0;

/// An immutable, validated geographic coordinate.
///
/// # Examples
///
/// ```
/// use locus_discovery::types::GeoPoint;
///
/// let sao_paulo = GeoPoint::new(-23.5505, -46.6333).unwrap();
/// let rio = GeoPoint::new(-22.9068, -43.1729).unwrap();
///
/// let d = sao_paulo.distance_km(&rio);
/// assert!((d - rio.distance_km(&sao_paulo)).abs() < 1e-6);
/// assert!(d > 350.0 && d < 365.0);
///
/// assert!(GeoPoint::new(91.0, 0.0).is_err());
/// assert!(GeoPoint::new(0.0, f64::NAN).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeoPoint")]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawGeoPoint {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = ValidationError;

    fn try_from(raw: RawGeoPoint) -> Result<Self, Self::Error> {
        GeoPoint::new(raw.latitude, raw.longitude)
    }
}

impl GeoPoint {
    /// Creates a point, rejecting coordinates outside their domain or NaN.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !(MIN_LATITUDE..=MAX_LATITUDE).contains(&latitude) {
            return Err(ValidationError::InvalidCoordinate {
                field: "latitude",
                value: latitude,
                min: MIN_LATITUDE,
                max: MAX_LATITUDE,
            });
        }
        if !(MIN_LONGITUDE..=MAX_LONGITUDE).contains(&longitude) {
            return Err(ValidationError::InvalidCoordinate {
                field: "longitude",
                value: longitude,
                min: MIN_LONGITUDE,
                max: MAX_LONGITUDE,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance to `other` in kilometers (haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        // Rounding can push `a` a hair outside [0, 1] for antipodal points.
        let a = a.clamp(0.0, 1.0);

        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }

    /// Returns `true` if `other` lies within `radius_km` (inclusive, with tolerance).
    pub fn is_within(&self, other: &GeoPoint, radius_km: f64) -> bool {
        self.distance_km(other) <= radius_km + DISTANCE_EPSILON_KM
    }

    /// The point reached by travelling `distance_km` from here along the
    /// initial `bearing_degrees` (clockwise from north).
    ///
    /// Longitude is normalised into [-180, 180). Non-finite inputs are rejected.
    pub fn destination(
        &self,
        bearing_degrees: f64,
        distance_km: f64,
    ) -> Result<GeoPoint, ValidationError> {
        if !bearing_degrees.is_finite() {
            return Err(ValidationError::NotFinite {
                field: "bearing_degrees",
                value: bearing_degrees,
            });
        }
        if !distance_km.is_finite() {
            return Err(ValidationError::NotFinite {
                field: "distance_km",
                value: distance_km,
            });
        }

        let angular = distance_km / EARTH_RADIUS_KM;
        let bearing = bearing_degrees.to_radians();
        let lat1 = self.latitude.to_radians();
        let lon1 = self.longitude.to_radians();

        let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos())
            .clamp(-1.0, 1.0)
            .asin();
        let lon2 = lon1
            + (bearing.sin() * angular.sin() * lat1.cos())
                .atan2(angular.cos() - lat1.sin() * lat2.sin());

        let latitude = lat2.to_degrees().clamp(MIN_LATITUDE, MAX_LATITUDE);
        let longitude = (lon2.to_degrees() - MIN_LONGITUDE).rem_euclid(360.0) + MIN_LONGITUDE;
        GeoPoint::new(latitude, longitude)
    }
}

/// An inclusive longitude interval in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonSpan {
    /// Western edge.
    pub min: f64,
    /// Eastern edge.
    pub max: f64,
}

impl LonSpan {
    fn contains(&self, longitude: f64) -> bool {
        longitude >= self.min && longitude <= self.max
    }
}

/// A latitude band with one or two longitude spans (two when the box
/// crosses the antimeridian).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    /// Southern edge in degrees.
    pub min_lat: f64,
    /// Northern edge in degrees.
    pub max_lat: f64,
    spans: Vec<LonSpan>,
}

impl BoundingBox {
    /// Computes a box that contains every point within `radius_km` of `center`.
    pub fn around(center: &GeoPoint, radius_km: f64) -> Self {
        let angular = (radius_km.max(0.0) + BOX_SLACK_KM) / EARTH_RADIUS_KM;
        let lat = center.latitude.to_radians();
        let lon = center.longitude.to_radians();

        let min_lat = lat - angular;
        let max_lat = lat + angular;

        if angular >= PI || min_lat <= -PI / 2.0 || max_lat >= PI / 2.0 {
            // A pole is inside the circle: every longitude qualifies.
            return Self {
                min_lat: min_lat.to_degrees().max(MIN_LATITUDE),
                max_lat: max_lat.to_degrees().min(MAX_LATITUDE),
                spans: vec![LonSpan {
                    min: MIN_LONGITUDE,
                    max: MAX_LONGITUDE,
                }],
            };
        }

        let delta_lon = (angular.sin() / lat.cos()).clamp(-1.0, 1.0).asin();
        let west = (lon - delta_lon).to_degrees();
        let east = (lon + delta_lon).to_degrees();

        let spans = if west < MIN_LONGITUDE {
            vec![
                LonSpan {
                    min: west + 360.0,
                    max: MAX_LONGITUDE,
                },
                LonSpan {
                    min: MIN_LONGITUDE,
                    max: east,
                },
            ]
        } else if east > MAX_LONGITUDE {
            vec![
                LonSpan {
                    min: west,
                    max: MAX_LONGITUDE,
                },
                LonSpan {
                    min: MIN_LONGITUDE,
                    max: east - 360.0,
                },
            ]
        } else {
            vec![LonSpan {
                min: west,
                max: east,
            }]
        };

        Self {
            min_lat: min_lat.to_degrees(),
            max_lat: max_lat.to_degrees(),
            spans,
        }
    }

    /// The longitude spans covered by this box.
    pub fn spans(&self) -> &[LonSpan] {
        &self.spans
    }

    /// Returns `true` if the point falls inside the box.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && self.spans.iter().any(|s| s.contains(point.longitude))
    }
}
