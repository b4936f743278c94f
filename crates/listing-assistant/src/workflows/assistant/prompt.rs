use serde::{Deserialize, Serialize};

use crate::workflows::catalog::Listing;

const DEFAULT_PERSONA: &str = "Actúa como el asistente virtual inmobiliario de la agencia. Comunícate en español con un tono claro, cercano y profesional. Guía al usuario por el catálogo para encontrar el inmueble que se ajuste a sus necesidades.";

const RULES: &str = "Reglas:
1. Si es el primer mensaje, preséntate brevemente.
2. Analiza la consulta y el historial para entender ciudad, zona, presupuesto y número de habitaciones.
3. Si la consulta es general, haz preguntas para acotar la búsqueda.
4. Basa tus respuestas solo en el catálogo proporcionado; no inventes propiedades ni detalles.
5. Si no hay opciones en una zona, dilo con honestidad y sugiere alternativas del catálogo.
6. Responde sin formato markdown y termina con una invitación clara al siguiente paso.
7. Si el usuario pide una foto, incluye la ruta de la imagen con el formato ![Descripción](URL).";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    #[serde(alias = "ai")]
    Assistant,
}

/// One earlier message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub sender: Sender,
    pub content: String,
}

/// Renders the instruction prompt sent to the language backend.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    persona: String,
}

impl PromptBuilder {
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
        }
    }

    pub fn build(
        &self,
        question: &str,
        history: &[ChatTurn],
        listings: &[Listing],
    ) -> Result<String, serde_json::Error> {
        let catalog = serde_json::to_string(listings)?;
        let history = format_history(history);

        Ok(format!(
            "{persona}\n\nCatálogo de propiedades (única fuente de verdad, formato JSON):\n{catalog}\n\nHistorial de la conversación:\n---\n{history}\n---\n\n{RULES}\n\nConsulta del usuario: {question}",
            persona = self.persona,
        ))
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PERSONA)
    }
}

pub fn format_history(history: &[ChatTurn]) -> String {
    history
        .iter()
        .map(|turn| {
            let speaker = match turn.sender {
                Sender::User => "Usuario",
                Sender::Assistant => "Asistente",
            };
            format!("{speaker}: {}", turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::catalog::sample_catalog;

    #[test]
    fn history_lines_are_labelled_by_speaker() {
        let history = vec![
            ChatTurn {
                sender: Sender::User,
                content: "Hola".to_string(),
            },
            ChatTurn {
                sender: Sender::Assistant,
                content: "¡Hola! ¿En qué ciudad buscas?".to_string(),
            },
        ];
        assert_eq!(
            format_history(&history),
            "Usuario: Hola\nAsistente: ¡Hola! ¿En qué ciudad buscas?"
        );
    }

    #[test]
    fn prompt_embeds_catalog_history_and_question() {
        let listings = sample_catalog();
        let prompt = PromptBuilder::default()
            .build("¿Algo en Sevilla?", &[], &listings[..1])
            .expect("prompt renders");

        assert!(prompt.contains("\"id\":\"prop-001\""));
        assert!(prompt.contains("Consulta del usuario: ¿Algo en Sevilla?"));
        assert!(!prompt.contains("prop-002"));
    }

    #[test]
    fn legacy_ai_sender_is_accepted() {
        let turn: ChatTurn =
            serde_json::from_str(r#"{"sender": "ai", "content": "hola"}"#).expect("parses");
        assert_eq!(turn.sender, Sender::Assistant);
    }
}
