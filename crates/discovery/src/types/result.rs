//! Search output.

use serde::Serialize;

use super::record::SearchableProviderRecord;

/// One ranked match: the record plus its distance from the search origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedProvider {
    /// The matched projection record.
    pub record: SearchableProviderRecord,
    /// Great-circle distance from the search origin in kilometers.
    pub distance_km: f64,
}

/// One page of ranked matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// The page slice, in ranking order.
    pub items: Vec<RankedProvider>,
    /// Number of matches across all pages.
    pub total_matches: u64,
    /// Offset of the first item.
    pub skip: u64,
    /// Requested page size.
    pub take: u32,
}

impl SearchResult {
    /// An empty page that still reports the total.
    pub fn empty(total_matches: u64, skip: u64, take: u32) -> Self {
        Self {
            items: Vec::new(),
            total_matches,
            skip,
            take,
        }
    }

    /// Returns `true` if later pages hold more matches.
    pub fn has_more(&self) -> bool {
        self.skip.saturating_add(self.items.len() as u64) < self.total_matches
    }

    /// Number of items on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if this page has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates the records on this page.
    pub fn records(&self) -> impl Iterator<Item = &SearchableProviderRecord> {
        self.items.iter().map(|hit| &hit.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_page_keeps_total() {
        let page = SearchResult::empty(12, 15, 5);
        assert!(page.is_empty());
        assert_eq!(page.total_matches, 12);
        assert!(!page.has_more());
    }

    #[test]
    fn test_serializes_total() {
        let json = serde_json::to_value(SearchResult::empty(3, 0, 10)).unwrap();
        assert_eq!(json["total_matches"], 3);
        assert_eq!(json["items"].as_array().map(|a| a.len()), Some(0));
    }
}
