mod domain;
mod filter;
mod parser;
mod vocabulary;

pub use domain::{sample_catalog, Listing, ListingId};
pub use filter::{filter_catalog, CatalogFilter};
pub use vocabulary::{SearchVocabulary, VocabularyError};

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

#[derive(Debug)]
pub enum CatalogImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    InvalidListing { id: ListingId, reason: String },
}

impl std::fmt::Display for CatalogImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogImportError::Io(err) => write!(f, "failed to read listing catalog: {}", err),
            CatalogImportError::Csv(err) => write!(f, "invalid catalog CSV data: {}", err),
            CatalogImportError::Json(err) => write!(f, "invalid catalog JSON data: {}", err),
            CatalogImportError::InvalidListing { id, reason } => {
                write!(f, "listing '{}' rejected: {}", id, reason)
            }
        }
    }
}

impl std::error::Error for CatalogImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogImportError::Io(err) => Some(err),
            CatalogImportError::Csv(err) => Some(err),
            CatalogImportError::Json(err) => Some(err),
            CatalogImportError::InvalidListing { .. } => None,
        }
    }
}

impl From<std::io::Error> for CatalogImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<serde_json::Error> for CatalogImportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// Loads listing catalogs from JSON arrays or CSV exports.
pub struct CatalogImporter;

impl CatalogImporter {
    /// `.json` files are read as a JSON array; anything else as CSV.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Listing>, CatalogImportError> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(|extension| extension.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let file = std::fs::File::open(path)?;
        if is_json {
            Self::from_json_reader(file)
        } else {
            Self::from_csv_reader(file)
        }
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Vec<Listing>, CatalogImportError> {
        let listings = parser::parse_json_listings(reader)?;
        validate(&listings)?;
        Ok(listings)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Vec<Listing>, CatalogImportError> {
        let listings = parser::parse_csv_listings(reader)?;
        validate(&listings)?;
        Ok(listings)
    }
}

fn validate(listings: &[Listing]) -> Result<(), CatalogImportError> {
    let mut seen: HashSet<&ListingId> = HashSet::new();

    for listing in listings {
        let reject = |reason: &str| CatalogImportError::InvalidListing {
            id: listing.id.clone(),
            reason: reason.to_string(),
        };

        if listing.id.0.trim().is_empty() {
            return Err(reject("id must not be empty"));
        }
        if !seen.insert(&listing.id) {
            return Err(reject("duplicate id"));
        }
        if !(listing.size_sq_meters.is_finite() && listing.size_sq_meters > 0.0) {
            return Err(reject("size must be a positive number"));
        }
        if !(listing.price.is_finite() && listing.price > 0.0) {
            return Err(reject("price must be a positive number"));
        }
    }

    Ok(())
}
