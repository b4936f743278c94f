use super::domain::{Listing, ListingId};
use serde::{Deserialize, Deserializer};
use std::io::Read;

const FEATURE_SEPARATOR: char = ';';

pub(crate) fn parse_csv_listings<R: Read>(reader: R) -> Result<Vec<Listing>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut listings = Vec::new();

    for record in csv_reader.deserialize::<ListingRow>() {
        listings.push(record?.into_listing());
    }

    Ok(listings)
}

pub(crate) fn parse_json_listings<R: Read>(reader: R) -> Result<Vec<Listing>, serde_json::Error> {
    serde_json::from_reader(reader)
}

#[derive(Debug, Deserialize)]
struct ListingRow {
    id: String,
    #[serde(default)]
    title: String,
    location: String,
    bedrooms: u32,
    bathrooms: u32,
    size: f64,
    price: f64,
    #[serde(default)]
    features: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    description: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    image: Option<String>,
}

impl ListingRow {
    fn into_listing(self) -> Listing {
        Listing {
            id: ListingId(self.id),
            title: self.title,
            location: self.location,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            size_sq_meters: self.size,
            price: self.price,
            features: split_features(&self.features),
            description: self.description,
            image: self.image,
        }
    }
}

pub(super) fn split_features(raw: &str) -> Vec<String> {
    raw.split(FEATURE_SEPARATOR)
        .map(str::trim)
        .filter(|feature| !feature.is_empty())
        .map(str::to_string)
        .collect()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
