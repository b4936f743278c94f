use std::io::Read;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::QueryCategory;

const AGENT_HANDOFF_PATTERNS: &[&str] = &[
    r"hablar\s+con\s+un\s+agente",
    r"contactar\s+con\s+un\s+asesor",
    r"necesito\s+ayuda\s+personalizada",
    r"visita\s+presencial",
    r"cita\s+con\s+agente",
];

const COMPLEX_PATTERNS: &[&str] = &[
    r"recomiéndame",
    r"busco\s+una\s+casa",
    r"necesito\s+un\s+apartamento",
    r"comparar",
    r"mejor\s+zona\s+para",
    r"inversión",
    r"rentabilidad",
    r"financiación",
    r"hipoteca",
    r"reforma",
    r"precio\s+por\s+metro",
    r"tendencia\s+del\s+mercado",
    r"previsión",
    r"análisis",
];

const SIMPLE_PATTERNS: &[&str] = &[
    r"tienen\s+propiedades\s+en",
    r"precio\s+medio",
    r"cuánto\s+cuesta",
    r"trámites",
    r"documentos\s+necesarios",
    r"requisitos",
    r"horario",
    r"dirección",
    r"contacto",
    r"teléfono",
    r"email",
    r"cómo\s+llegar",
];

static STANDARD_RULES: LazyLock<RuleSet> = LazyLock::new(|| {
    RuleSet::compile(&RuleSetDefinition::standard()).expect("built-in rule table compiles")
});

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("{category:?} rule '{pattern}' is not a valid pattern: {source}")]
    InvalidPattern {
        category: QueryCategory,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("{0:?} rule must not be empty")]
    EmptyRule(QueryCategory),
    #[error("rule table is not valid JSON: {0}")]
    Definition(#[from] serde_json::Error),
}

/// One case-insensitive test against a query.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Regular expression compiled case-insensitive.
    Pattern(Regex),
    /// Plain substring, compared against the lower-cased query.
    Phrase(String),
}

impl Matcher {
    pub fn pattern(source: &str) -> Result<Self, regex::Error> {
        Regex::new(&format!("(?i){source}")).map(Self::Pattern)
    }

    pub fn phrase(text: &str) -> Self {
        Self::Phrase(text.to_lowercase())
    }

    pub(crate) fn is_match(&self, query: &str, lowered: &str) -> bool {
        match self {
            Matcher::Pattern(regex) => regex.is_match(query),
            Matcher::Phrase(phrase) => lowered.contains(phrase.as_str()),
        }
    }

    /// Source text of the matcher without the case-insensitivity flag.
    pub fn source(&self) -> &str {
        match self {
            Matcher::Pattern(regex) => regex.as_str().trim_start_matches("(?i)"),
            Matcher::Phrase(phrase) => phrase,
        }
    }
}

/// Ordered matchers that all resolve to the same category.
#[derive(Debug, Clone)]
pub struct RuleGroup {
    pub category: QueryCategory,
    pub matchers: Vec<Matcher>,
}

impl RuleGroup {
    pub(crate) fn first_match(&self, query: &str, lowered: &str) -> Option<&Matcher> {
        self.matchers
            .iter()
            .find(|matcher| matcher.is_match(query, lowered))
    }
}

/// Priority-ordered rule groups. The first group with a matching rule wins.
#[derive(Debug, Clone)]
pub struct RuleSet {
    groups: Vec<RuleGroup>,
}

impl RuleSet {
    pub fn standard() -> Self {
        STANDARD_RULES.clone()
    }

    /// Build a rule set from explicit groups, kept in the order given.
    pub fn from_groups(groups: Vec<RuleGroup>) -> Self {
        Self { groups }
    }

    pub fn compile(definition: &RuleSetDefinition) -> Result<Self, RuleError> {
        let ordered = [
            (QueryCategory::AgentHandoff, &definition.agent_handoff),
            (QueryCategory::Complex, &definition.complex),
            (QueryCategory::Simple, &definition.simple),
        ];

        let mut groups = Vec::with_capacity(ordered.len());
        for (category, patterns) in ordered {
            let mut matchers = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                if pattern.trim().is_empty() {
                    return Err(RuleError::EmptyRule(category));
                }
                let matcher =
                    Matcher::pattern(pattern).map_err(|source| RuleError::InvalidPattern {
                        category,
                        pattern: pattern.clone(),
                        source,
                    })?;
                matchers.push(matcher);
            }
            groups.push(RuleGroup { category, matchers });
        }

        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[RuleGroup] {
        &self.groups
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

/// Serializable rule table, one pattern list per category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetDefinition {
    #[serde(default)]
    pub agent_handoff: Vec<String>,
    #[serde(default)]
    pub complex: Vec<String>,
    #[serde(default)]
    pub simple: Vec<String>,
}

impl RuleSetDefinition {
    pub fn standard() -> Self {
        fn owned(patterns: &[&str]) -> Vec<String> {
            patterns.iter().map(|pattern| pattern.to_string()).collect()
        }

        Self {
            agent_handoff: owned(AGENT_HANDOFF_PATTERNS),
            complex: owned(COMPLEX_PATTERNS),
            simple: owned(SIMPLE_PATTERNS),
        }
    }

    /// Read a JSON rule table; categories left out have no rules.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, RuleError> {
        Ok(serde_json::from_reader(reader)?)
    }
}
