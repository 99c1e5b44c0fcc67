//! Subscription tiers.
//!
//! The tier is the primary ranking key. Its order comes from
//! [`TIER_RANKING`], not from the enum declaration, so reordering variants
//! never changes search results.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A provider's subscription level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    /// Entry level.
    Free,
    /// Paid entry level.
    Standard,
    /// Mid level.
    Silver,
    /// Upper level.
    Gold,
    /// Highest level.
    Platinum,
}

/// Tiers from lowest to highest.
pub const TIER_RANKING: [SubscriptionTier; 5] = [
    SubscriptionTier::Free,
    SubscriptionTier::Standard,
    SubscriptionTier::Silver,
    SubscriptionTier::Gold,
    SubscriptionTier::Platinum,
];

impl SubscriptionTier {
    /// Position in [`TIER_RANKING`]; higher ranks sort first in search results.
    pub fn rank(&self) -> u8 {
        TIER_RANKING
            .iter()
            .position(|t| t == self)
            .map(|p| p as u8)
            .unwrap_or(0)
    }

    /// Compares two tiers by rank (lowest first).
    pub fn cmp_rank(&self, other: &SubscriptionTier) -> Ordering {
        self.rank().cmp(&other.rank())
    }

    /// All tiers, lowest first.
    pub fn all() -> &'static [SubscriptionTier] {
        &TIER_RANKING
    }

    /// The lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Standard => "standard",
            SubscriptionTier::Silver => "silver",
            SubscriptionTier::Gold => "gold",
            SubscriptionTier::Platinum => "platinum",
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubscriptionTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TIER_RANKING
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::InvalidTier {
                value: s.to_string(),
            })
    }
}
