use std::sync::LazyLock;

use regex::Regex;

const DEFAULT_LOCATIONS: [&str; 5] = ["madrid", "barcelona", "valencia", "málaga", "sevilla"];
const DEFAULT_FEATURES: [&str; 5] = ["jardín", "piscina", "terraza", "garaje", "vistas"];
const DEFAULT_BEDROOM_PATTERN: &str = r"(?i)([0-9]+)\s*habitaciones";

static DEFAULT_BEDROOMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(DEFAULT_BEDROOM_PATTERN).expect("built-in bedroom pattern compiles")
});

#[derive(Debug, thiserror::Error)]
pub enum VocabularyError {
    #[error("bedroom pattern '{pattern}' is invalid: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("bedroom pattern '{0}' must capture the room count in group 1")]
    MissingCapture(String),
}

/// Recognized search terms the catalog filter extracts from free text.
///
/// Terms are stored lower-cased so matching runs against the lower-cased
/// query without further allocation.
#[derive(Debug, Clone)]
pub struct SearchVocabulary {
    locations: Vec<String>,
    features: Vec<String>,
    bedrooms: Regex,
}

impl SearchVocabulary {
    pub fn standard() -> Self {
        Self::new(DEFAULT_LOCATIONS, DEFAULT_FEATURES)
    }

    pub fn new<L, F, S, T>(locations: L, features: F) -> Self
    where
        L: IntoIterator<Item = S>,
        F: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            locations: normalize_terms(locations),
            features: normalize_terms(features),
            bedrooms: DEFAULT_BEDROOMS.clone(),
        }
    }

    /// Replace the bedroom-count pattern. Group 1 must capture the digits.
    pub fn with_bedroom_pattern(mut self, pattern: &str) -> Result<Self, VocabularyError> {
        let regex = Regex::new(pattern).map_err(|source| VocabularyError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        if regex.captures_len() < 2 {
            return Err(VocabularyError::MissingCapture(pattern.to_string()));
        }
        self.bedrooms = regex;
        Ok(self)
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub(crate) fn bedroom_pattern(&self) -> &Regex {
        &self.bedrooms
    }
}

impl Default for SearchVocabulary {
    fn default() -> Self {
        Self::standard()
    }
}

fn normalize_terms<I, S>(terms: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for term in terms {
        let term = term.as_ref().trim().to_lowercase();
        if !term.is_empty() && !normalized.contains(&term) {
            normalized.push(term);
        }
    }
    normalized
}
