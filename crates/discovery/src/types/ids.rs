//! Opaque identifiers owned by external collaborators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identifier of a provider, owned by the Providers module.
///
/// Ordering is plain lexicographic and is the final ranking tie-break.
///
/// ```
/// use locus_discovery::types::ProviderId;
///
/// let id = ProviderId::new("prov-42");
/// assert_eq!(id.as_str(), "prov-42");
/// assert!(ProviderId::new("a") < ProviderId::new("b"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    /// Creates a provider ID from the given string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rejects the empty identifier.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.0.trim().is_empty() {
            return Err(ValidationError::EmptyIdentifier {
                field: "provider_id",
            });
        }
        Ok(())
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = ProviderId::new(s);
        id.validate()?;
        Ok(id)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ProviderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of a catalog service (e.g. "electrician").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(String);

impl ServiceId {
    /// Creates a service ID from the given string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rejects the empty identifier.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.0.trim().is_empty() {
            return Err(ValidationError::EmptyIdentifier {
                field: "service_id",
            });
        }
        Ok(())
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ServiceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ServiceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_parse() {
        let id: ProviderId = "abc".parse().unwrap();
        assert_eq!(id.to_string(), "abc");
        assert!("".parse::<ProviderId>().is_err());
        assert!("   ".parse::<ProviderId>().is_err());
    }

    #[test]
    fn test_service_id_validate() {
        assert!(ServiceId::new("plumber").validate().is_ok());
        assert_eq!(
            ServiceId::new("").validate(),
            Err(ValidationError::EmptyIdentifier {
                field: "service_id"
            })
        );
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&ServiceId::new("electrician")).unwrap();
        assert_eq!(json, "\"electrician\"");
        let back: ProviderId = serde_json::from_str("\"p-1\"").unwrap();
        assert_eq!(back, ProviderId::new("p-1"));
    }
}
