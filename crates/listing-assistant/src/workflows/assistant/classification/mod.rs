mod rules;

pub use rules::{Matcher, RuleError, RuleGroup, RuleSet, RuleSetDefinition};

use serde::{Deserialize, Serialize};

/// How a query is handled downstream and what it costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    Simple,
    Complex,
    AgentHandoff,
}

impl QueryCategory {
    pub const fn token_cost(self) -> u32 {
        match self {
            QueryCategory::Simple => 1,
            QueryCategory::Complex => 2,
            QueryCategory::AgentHandoff => 5,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            QueryCategory::Simple => "simple",
            QueryCategory::Complex => "complex",
            QueryCategory::AgentHandoff => "agent_handoff",
        }
    }
}

/// Category and token cost assigned to a single query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedRequest {
    pub category: QueryCategory,
    pub token_cost: u32,
}

impl From<QueryCategory> for ClassifiedRequest {
    fn from(category: QueryCategory) -> Self {
        Self {
            category,
            token_cost: category.token_cost(),
        }
    }
}

/// Classification together with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    #[serde(flatten)]
    pub request: ClassifiedRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,
}

/// Table-driven classifier; dispatch never depends on the rule contents.
#[derive(Debug, Clone, Default)]
pub struct QueryClassifier {
    rules: RuleSet,
}

impl QueryClassifier {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn classify(&self, query: &str) -> ClassifiedRequest {
        self.explain(query).request
    }

    /// Walk the groups in priority order and stop at the first matching rule.
    /// Queries matching no rule fall through to `Simple`.
    pub fn explain(&self, query: &str) -> Classification {
        let lowered = query.to_lowercase();

        for group in self.rules.groups() {
            if let Some(matcher) = group.first_match(query, &lowered) {
                return Classification {
                    request: group.category.into(),
                    matched_rule: Some(matcher.source().to_string()),
                };
            }
        }

        Classification {
            request: QueryCategory::Simple.into(),
            matched_rule: None,
        }
    }
}

/// Classify `query` against the built-in rule table.
pub fn classify(query: &str) -> ClassifiedRequest {
    QueryClassifier::default().classify(query)
}
