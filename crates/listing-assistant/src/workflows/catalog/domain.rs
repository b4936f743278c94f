use serde::{Deserialize, Serialize};

/// Identifier wrapper for catalog listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub String);

impl std::fmt::Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single advertised property as loaded from the catalog.
///
/// Listings are read-only for the lifetime of a request; the filter only ever
/// clones matching entries into its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    #[serde(default)]
    pub title: String,
    pub location: String,
    pub bedrooms: u32,
    pub bathrooms: u32,
    #[serde(rename = "size")]
    pub size_sq_meters: f64,
    pub price: f64,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Listing {
    /// Case-insensitive substring test against the listing location.
    pub fn location_contains(&self, needle_lower: &str) -> bool {
        self.location.to_lowercase().contains(needle_lower)
    }

    /// True when any feature tag contains `needle_lower`, ignoring case.
    pub fn has_feature_like(&self, needle_lower: &str) -> bool {
        self.features
            .iter()
            .any(|feature| feature.to_lowercase().contains(needle_lower))
    }

    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.id.0
        } else {
            &self.title
        }
    }
}

/// Built-in catalog used when no catalog file is configured.
pub fn sample_catalog() -> Vec<Listing> {
    fn listing(
        id: &str,
        title: &str,
        location: &str,
        rooms: (u32, u32),
        size: f64,
        price: f64,
        features: &[&str],
    ) -> Listing {
        Listing {
            id: ListingId(id.to_string()),
            title: title.to_string(),
            location: location.to_string(),
            bedrooms: rooms.0,
            bathrooms: rooms.1,
            size_sq_meters: size,
            price,
            features: features.iter().map(|feature| feature.to_string()).collect(),
            description: None,
            image: None,
        }
    }

    vec![
        listing(
            "prop-001",
            "Ático luminoso en Chamberí",
            "Madrid, Chamberí",
            (2, 2),
            95.0,
            585_000.0,
            &["Terraza", "Ascensor", "Aire acondicionado"],
        ),
        listing(
            "prop-002",
            "Chalet familiar en El Vedat",
            "Valencia, Torrent",
            (4, 3),
            240.0,
            495_000.0,
            &["Piscina privada", "Jardín", "Garaje doble"],
        ),
        listing(
            "prop-003",
            "Piso reformado en el Eixample",
            "Barcelona, Eixample",
            (3, 2),
            110.0,
            720_000.0,
            &["Balcón", "Calefacción central"],
        ),
        listing(
            "prop-004",
            "Villa con vistas al mar",
            "Málaga, Marbella",
            (5, 4),
            380.0,
            1_450_000.0,
            &["Vistas al mar", "Piscina infinita", "Jardín tropical"],
        ),
        listing(
            "prop-005",
            "Casa patio en Triana",
            "Sevilla, Triana",
            (3, 2),
            150.0,
            410_000.0,
            &["Patio andaluz", "Terraza"],
        ),
        listing(
            "prop-006",
            "Apartamento junto a la playa",
            "Valencia, Patacona",
            (2, 1),
            70.0,
            265_000.0,
            &["Vistas al mar", "Garaje"],
        ),
    ]
}
