use async_trait::async_trait;
use listing_assistant::config::AssistantConfig;
use listing_assistant::error::AppError;
use listing_assistant::workflows::assistant::{
    AccountId, AssistantService, CannedResponder, GatewayError, GeminiClient, KnowledgeBase,
    LedgerError, QueryClassifier, ReplyContext, ReplyGenerator, ResponseComposer, RuleSet,
    RuleSetDefinition, TokenCharge, TokenLedger,
};
use listing_assistant::workflows::catalog::{
    sample_catalog, CatalogFilter, CatalogImporter, Listing, SearchVocabulary,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::fs::File;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

pub(crate) type ConfiguredService = AssistantService<InMemoryTokenLedger, ConfiguredGenerator>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Balances and charge history live under one lock so a recorded charge and
/// its deduction are never observed apart.
#[derive(Default)]
struct LedgerState {
    balances: HashMap<AccountId, u32>,
    charges: Vec<TokenCharge>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryTokenLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryTokenLedger {
    fn state(&self) -> Result<MutexGuard<'_, LedgerState>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Unavailable("ledger store poisoned".to_string()))
    }

    pub(crate) fn charges(&self) -> Result<Vec<TokenCharge>, LedgerError> {
        Ok(self.state()?.charges.clone())
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn open_account(&self, account_id: &AccountId, balance: u32) -> Result<u32, LedgerError> {
        let mut guard = self.state()?;
        if guard.balances.contains_key(account_id) {
            return Err(LedgerError::AccountExists(account_id.clone()));
        }
        guard.balances.insert(account_id.clone(), balance);
        Ok(balance)
    }

    fn balance(&self, account_id: &AccountId) -> Result<u32, LedgerError> {
        self.state()?
            .balances
            .get(account_id)
            .copied()
            .ok_or_else(|| LedgerError::UnknownAccount(account_id.clone()))
    }

    fn charge(&self, charge: TokenCharge) -> Result<u32, LedgerError> {
        let mut guard = self.state()?;
        let balance = guard
            .balances
            .get_mut(&charge.account_id)
            .ok_or_else(|| LedgerError::UnknownAccount(charge.account_id.clone()))?;
        if *balance < charge.amount {
            return Err(LedgerError::InsufficientBalance {
                required: charge.amount,
                available: *balance,
            });
        }
        *balance -= charge.amount;
        let remaining = *balance;
        guard.charges.push(charge);
        Ok(remaining)
    }
}

/// Reply backend picked at startup: Gemini when an API key is configured,
/// the offline knowledge-base responder otherwise.
pub(crate) enum ConfiguredGenerator {
    Gemini(GeminiClient),
    Canned(CannedResponder),
}

impl ConfiguredGenerator {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            ConfiguredGenerator::Gemini(_) => "gemini",
            ConfiguredGenerator::Canned(_) => "canned",
        }
    }
}

#[async_trait]
impl ReplyGenerator for ConfiguredGenerator {
    async fn generate(&self, context: ReplyContext<'_>) -> Result<String, GatewayError> {
        match self {
            ConfiguredGenerator::Gemini(client) => client.generate(context).await,
            ConfiguredGenerator::Canned(responder) => responder.generate(context).await,
        }
    }
}

pub(crate) fn load_catalog(config: &AssistantConfig) -> Result<Vec<Listing>, AppError> {
    match &config.catalog_path {
        Some(path) => {
            let listings = CatalogImporter::from_path(path)?;
            info!(path = %path.display(), listings = listings.len(), "loaded listing catalog");
            Ok(listings)
        }
        None => Ok(sample_catalog()),
    }
}

pub(crate) fn load_classifier(config: &AssistantConfig) -> Result<QueryClassifier, AppError> {
    let rules = match &config.rules_path {
        Some(path) => {
            let definition = RuleSetDefinition::from_json_reader(File::open(path)?)?;
            RuleSet::compile(&definition)?
        }
        None => RuleSet::standard(),
    };
    Ok(QueryClassifier::new(rules))
}

pub(crate) fn build_filter(config: &AssistantConfig) -> CatalogFilter {
    if config.locations.is_none() && config.features.is_none() {
        return CatalogFilter::default();
    }

    let standard = SearchVocabulary::standard();
    let locations = config
        .locations
        .clone()
        .unwrap_or_else(|| standard.locations().to_vec());
    let features = config
        .features
        .clone()
        .unwrap_or_else(|| standard.features().to_vec());
    CatalogFilter::new(SearchVocabulary::new(locations, features))
}

pub(crate) fn build_generator(
    config: &AssistantConfig,
    offline: bool,
) -> Result<ConfiguredGenerator, AppError> {
    match (&config.gemini, offline) {
        (Some(gemini), false) => Ok(ConfiguredGenerator::Gemini(GeminiClient::new(
            gemini.clone(),
        )?)),
        _ => Ok(ConfiguredGenerator::Canned(CannedResponder::new(
            ResponseComposer::new(KnowledgeBase::standard(), config.max_listings),
        ))),
    }
}

pub(crate) fn build_service(
    config: &AssistantConfig,
    offline: bool,
) -> Result<ConfiguredService, AppError> {
    let generator = build_generator(config, offline)?;
    info!(backend = generator.label(), "reply backend selected");

    Ok(AssistantService::new(
        load_catalog(config)?,
        Arc::new(InMemoryTokenLedger::default()),
        Arc::new(generator),
    )
    .with_classifier(load_classifier(config)?)
    .with_filter(build_filter(config))
    .with_max_listings(config.max_listings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use listing_assistant::config::GeminiConfig;
    use listing_assistant::workflows::assistant::QueryCategory;

    fn charge(account: &str, amount: u32) -> TokenCharge {
        TokenCharge {
            account_id: AccountId(account.to_string()),
            amount,
            category: QueryCategory::Complex,
            charged_at: Utc::now(),
        }
    }

    #[test]
    fn ledger_refuses_overdrafts_without_deducting() {
        let ledger = InMemoryTokenLedger::default();
        let account = AccountId("ana".to_string());
        ledger.open_account(&account, 3).expect("opens");

        assert_eq!(ledger.charge(charge("ana", 2)).expect("charged"), 1);
        assert_eq!(
            ledger.charge(charge("ana", 2)),
            Err(LedgerError::InsufficientBalance {
                required: 2,
                available: 1
            })
        );
        assert_eq!(ledger.balance(&account), Ok(1));
        assert_eq!(ledger.charges().expect("history").len(), 1);
    }

    #[test]
    fn poisoned_ledger_reports_unavailable_instead_of_dropping_history() {
        let ledger = InMemoryTokenLedger::default();
        let account = AccountId("ana".to_string());
        ledger.open_account(&account, 3).expect("opens");

        let poisoner = ledger.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.lock().expect("first lock");
            panic!("poison the ledger lock");
        })
        .join();

        assert!(matches!(
            ledger.charge(charge("ana", 1)),
            Err(LedgerError::Unavailable(_))
        ));
        assert!(matches!(ledger.charges(), Err(LedgerError::Unavailable(_))));
        assert!(matches!(
            ledger.balance(&account),
            Err(LedgerError::Unavailable(_))
        ));
    }

    #[test]
    fn generator_falls_back_to_canned_without_api_key() {
        let config = AssistantConfig::default();
        let generator = build_generator(&config, false).expect("builds");
        assert_eq!(generator.label(), "canned");
    }

    #[test]
    fn offline_flag_skips_configured_gemini() {
        let config = AssistantConfig {
            gemini: Some(GeminiConfig {
                api_key: "secret".to_string(),
                model: GeminiConfig::DEFAULT_MODEL.to_string(),
                base_url: GeminiConfig::DEFAULT_BASE_URL.to_string(),
                timeout_secs: 5,
            }),
            ..AssistantConfig::default()
        };

        assert_eq!(build_generator(&config, true).expect("builds").label(), "canned");
        assert_eq!(build_generator(&config, false).expect("builds").label(), "gemini");
    }

    #[test]
    fn custom_locations_keep_standard_features() {
        let config = AssistantConfig {
            locations: Some(vec!["bilbao".to_string()]),
            ..AssistantConfig::default()
        };
        let filter = build_filter(&config);
        assert_eq!(filter.vocabulary().locations(), ["bilbao".to_string()]);
        assert!(filter
            .vocabulary()
            .features()
            .contains(&"piscina".to_string()));
    }

    #[test]
    fn missing_catalog_file_is_reported() {
        let config = AssistantConfig {
            catalog_path: Some("does/not/exist.csv".into()),
            ..AssistantConfig::default()
        };
        assert!(matches!(load_catalog(&config), Err(AppError::Catalog(_))));
    }
}
