use std::num::IntErrorKind;

use super::domain::Listing;
use super::vocabulary::SearchVocabulary;

/// Criteria inferred from a free-text query.
///
/// Locations and features are alternatives within their family; families are
/// combined with AND. An empty family does not constrain the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FilterCriteria {
    pub(crate) location_tokens: Vec<String>,
    pub(crate) feature_tokens: Vec<String>,
    pub(crate) min_bedrooms: Option<u32>,
}

impl FilterCriteria {
    pub(crate) fn is_unconstrained(&self) -> bool {
        self.location_tokens.is_empty()
            && self.feature_tokens.is_empty()
            && self.min_bedrooms.is_none()
    }

    fn accepts(&self, listing: &Listing) -> bool {
        if !self.location_tokens.is_empty()
            && !self
                .location_tokens
                .iter()
                .any(|location| listing.location_contains(location))
        {
            return false;
        }

        if !self.feature_tokens.is_empty()
            && !self
                .feature_tokens
                .iter()
                .any(|feature| listing.has_feature_like(feature))
        {
            return false;
        }

        match self.min_bedrooms {
            Some(threshold) => listing.bedrooms >= threshold,
            None => true,
        }
    }
}

/// Stateless filter narrowing a catalog to the listings a query refers to.
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    vocabulary: SearchVocabulary,
}

impl CatalogFilter {
    pub fn new(vocabulary: SearchVocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &SearchVocabulary {
        &self.vocabulary
    }

    pub(crate) fn criteria(&self, query: &str) -> FilterCriteria {
        let lowered = query.to_lowercase();

        let location_tokens = self
            .vocabulary
            .locations()
            .iter()
            .filter(|location| lowered.contains(location.as_str()))
            .cloned()
            .collect();

        let feature_tokens = self
            .vocabulary
            .features()
            .iter()
            .filter(|feature| lowered.contains(feature.as_str()))
            .cloned()
            .collect();

        FilterCriteria {
            location_tokens,
            feature_tokens,
            min_bedrooms: self.min_bedrooms(&lowered),
        }
    }

    /// Return every listing consistent with the query, in catalog order.
    pub fn filter(&self, query: &str, catalog: &[Listing]) -> Vec<Listing> {
        let criteria = self.criteria(query);
        if criteria.is_unconstrained() {
            return catalog.to_vec();
        }

        catalog
            .iter()
            .filter(|listing| criteria.accepts(listing))
            .cloned()
            .collect()
    }

    // Only the first "<N> habitaciones" mention is honoured.
    fn min_bedrooms(&self, lowered: &str) -> Option<u32> {
        let captures = self.vocabulary.bedroom_pattern().captures(lowered)?;
        let digits = captures.get(1)?.as_str();
        match digits.parse::<u32>() {
            Ok(count) => Some(count),
            Err(err) if *err.kind() == IntErrorKind::PosOverflow => Some(u32::MAX),
            Err(_) => None,
        }
    }
}

/// Filter `catalog` with the built-in vocabulary.
pub fn filter_catalog(query: &str, catalog: &[Listing]) -> Vec<Listing> {
    CatalogFilter::default().filter(query, catalog)
}
