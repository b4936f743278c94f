use super::classification::QueryCategory;
use super::knowledge::KnowledgeBase;
use crate::workflows::catalog::Listing;

const SIMPLE_DEFAULT: &str = "Gracias por tu consulta. Tenemos propiedades en las principales ciudades de España como Madrid, Barcelona, Valencia, Sevilla y Málaga. Los precios varían según la ubicación y características. ¿Te gustaría información sobre alguna zona específica?";
const COMPLEX_DEFAULT: &str = "Basado en tu consulta, he analizado nuestras propiedades disponibles y las tendencias actuales del mercado. Tenemos varias opciones que podrían ajustarse a tus necesidades, con diferentes características y rangos de precio. ¿Podrías especificar tu presupuesto aproximado y si tienes preferencia por alguna zona en particular?";
const AGENT_DEFAULT: &str = "Entiendo que necesitas una atención más personalizada. Uno de nuestros agentes inmobiliarios especializados se pondrá en contacto contigo en las próximas 2 horas. Por favor, confirma tu número de teléfono y el mejor horario para contactarte.";

/// Offline reply composition from the knowledge base and matched listings.
#[derive(Debug, Clone)]
pub struct ResponseComposer {
    knowledge: KnowledgeBase,
    max_listings: usize,
}

impl ResponseComposer {
    pub fn new(knowledge: KnowledgeBase, max_listings: usize) -> Self {
        Self {
            knowledge,
            max_listings,
        }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Knowledge answers take precedence, then a summary of the matched
    /// listings, then the category's default message.
    pub fn compose(&self, query: &str, category: QueryCategory, matches: &[Listing]) -> String {
        if let Some(answer) = self.knowledge.answer(query) {
            return answer;
        }

        if !matches.is_empty() {
            return self.summarize(matches);
        }

        default_message(category).to_string()
    }

    fn summarize(&self, matches: &[Listing]) -> String {
        let lines: Vec<String> = matches
            .iter()
            .take(self.max_listings)
            .map(listing_line)
            .collect();

        format!(
            "He encontrado {} propiedades que coinciden con tu búsqueda. Aquí tienes algunas opciones:\n\n{}\n\n¿Te gustaría más información sobre alguna de estas propiedades?",
            matches.len(),
            lines.join("\n")
        )
    }
}

impl Default for ResponseComposer {
    fn default() -> Self {
        Self::new(KnowledgeBase::standard(), 3)
    }
}

pub fn default_message(category: QueryCategory) -> &'static str {
    match category {
        QueryCategory::Simple => SIMPLE_DEFAULT,
        QueryCategory::Complex => COMPLEX_DEFAULT,
        QueryCategory::AgentHandoff => AGENT_DEFAULT,
    }
}

fn listing_line(listing: &Listing) -> String {
    format!(
        "- {} ({}): {} habitaciones, {} baños, {}m². Precio: {}",
        listing.display_title(),
        listing.location,
        listing.bedrooms,
        listing.bathrooms,
        listing.size_sq_meters.round() as u64,
        format_euros(listing.price)
    )
}

/// Whole euros with Spanish digit grouping, e.g. `1.450.000 €`.
pub fn format_euros(amount: f64) -> String {
    let whole = amount.round().max(0.0) as u64;
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    format!("{grouped} €")
}
