use crate::infra::{build_filter, build_service, load_catalog, load_classifier};
use clap::Args;
use listing_assistant::config::{AppConfig, AssistantConfig};
use listing_assistant::error::AppError;
use listing_assistant::workflows::assistant::responder::format_euros;
use listing_assistant::workflows::assistant::{
    AccountId, AssistantServiceError, ChatRequest, ChatTurn, LedgerError, Sender,
};
use listing_assistant::workflows::catalog::Listing;
use std::path::PathBuf;

const DEMO_SCRIPT: [&str; 5] = [
    "Hola, ¿tienen propiedades en Valencia?",
    "Busco una casa con piscina de 4 habitaciones",
    "¿Cuál es el precio medio en Málaga?",
    "¿Qué documentos necesito para comprar?",
    "Quiero hablar con un agente",
];

#[derive(Args, Debug)]
pub(crate) struct ClassifyArgs {
    /// Question to classify
    pub(crate) query: String,
    /// Print the classification as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct SearchArgs {
    /// Free-text question used to filter the catalog
    pub(crate) query: String,
    /// JSON or CSV catalog to search instead of the configured one
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Maximum listings to print (defaults to the configured display cap)
    #[arg(long)]
    pub(crate) limit: Option<usize>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// JSON or CSV catalog to use instead of the configured one
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Tokens granted to the demo account
    #[arg(long, default_value_t = 8)]
    pub(crate) balance: u32,
    /// Call Gemini when an API key is configured instead of the offline responder
    #[arg(long)]
    pub(crate) live: bool,
}

fn assistant_config(catalog: Option<PathBuf>) -> Result<AssistantConfig, AppError> {
    let mut config = AppConfig::load()?.assistant;
    if catalog.is_some() {
        config.catalog_path = catalog;
    }
    Ok(config)
}

pub(crate) fn run_classify(args: ClassifyArgs) -> Result<(), AppError> {
    let config = assistant_config(None)?;
    let classification = load_classifier(&config)?.explain(&args.query);

    if args.json {
        let rendered = serde_json::to_string_pretty(&classification)
            .map_err(|err| AppError::Io(err.into()))?;
        println!("{rendered}");
        return Ok(());
    }

    println!("Category: {}", classification.request.category.label());
    println!("Token cost: {}", classification.request.token_cost);
    match &classification.matched_rule {
        Some(rule) => println!("Matched rule: {rule}"),
        None => println!("Matched rule: none (default)"),
    }
    Ok(())
}

pub(crate) fn run_search(args: SearchArgs) -> Result<(), AppError> {
    let config = assistant_config(args.catalog)?;
    let catalog = load_catalog(&config)?;
    let matches = build_filter(&config).filter(&args.query, &catalog);
    let limit = args.limit.unwrap_or(config.max_listings);

    println!(
        "{} of {} listings match \"{}\"",
        matches.len(),
        catalog.len(),
        args.query
    );
    for listing in matches.iter().take(limit) {
        println!("{}", render_listing(listing));
    }
    if matches.len() > limit {
        println!("... {} more", matches.len() - limit);
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = assistant_config(args.catalog)?;
    let service = build_service(&config, !args.live)?;
    let account_id = AccountId("demo".to_string());

    println!("Listing assistant demo");
    println!(
        "Catalog: {} listings | starting balance: {} tokens",
        service.catalog().len(),
        args.balance
    );
    if let Err(err) = service.open_account(&account_id, args.balance) {
        println!("could not open demo account: {err}");
        return Ok(());
    }

    let mut history: Vec<ChatTurn> = Vec::new();
    for message in DEMO_SCRIPT {
        println!("\n> {message}");
        let request = ChatRequest {
            account_id: account_id.clone(),
            message: message.to_string(),
            history: history.clone(),
        };

        match service.chat(request).await {
            Ok(reply) => {
                println!(
                    "[{} | -{} tokens | {} left | {} matching listings]",
                    reply.category.label(),
                    reply.tokens_used,
                    reply.remaining_balance,
                    reply.total_matches
                );
                println!("{}", reply.message);
                history.push(ChatTurn {
                    sender: Sender::User,
                    content: message.to_string(),
                });
                history.push(ChatTurn {
                    sender: Sender::Assistant,
                    content: reply.message,
                });
            }
            Err(AssistantServiceError::Ledger(LedgerError::InsufficientBalance {
                required,
                available,
            })) => {
                println!("Refused: {required} tokens required, {available} available.");
                break;
            }
            Err(err) => {
                println!("Request failed: {err}");
                break;
            }
        }
    }

    let charges = match service.ledger().charges() {
        Ok(charges) => charges,
        Err(err) => {
            println!("\nToken usage unavailable: {err}");
            return Ok(());
        }
    };
    println!("\nToken usage");
    for charge in &charges {
        println!(
            "- {} {} -{}",
            charge.charged_at.format("%H:%M:%S"),
            charge.category.label(),
            charge.amount
        );
    }
    println!(
        "Total spent: {} tokens",
        charges.iter().map(|charge| charge.amount).sum::<u32>()
    );
    Ok(())
}

fn render_listing(listing: &Listing) -> String {
    let mut line = format!(
        "- [{}] {} ({}): {} habitaciones, {} baños, {}m², {}",
        listing.id,
        listing.display_title(),
        listing.location,
        listing.bedrooms,
        listing.bathrooms,
        listing.size_sq_meters,
        format_euros(listing.price)
    );
    if !listing.features.is_empty() {
        line.push_str(" | ");
        line.push_str(&listing.features.join(", "));
    }
    line
}
