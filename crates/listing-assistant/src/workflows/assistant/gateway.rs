use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::classification::ClassifiedRequest;
use super::prompt::{ChatTurn, PromptBuilder};
use super::responder::ResponseComposer;
use crate::config::GeminiConfig;
use crate::workflows::catalog::Listing;

/// Everything a backend needs to answer one chat message.
#[derive(Debug, Clone, Copy)]
pub struct ReplyContext<'a> {
    pub question: &'a str,
    pub classification: ClassifiedRequest,
    pub history: &'a [ChatTurn],
    /// Listings the query narrowed down to, in catalog order.
    pub matches: &'a [Listing],
    pub catalog: &'a [Listing],
}

impl<'a> ReplyContext<'a> {
    /// Listings worth sending as context: the matches, or the whole catalog
    /// when the query did not narrow anything down.
    pub fn context_listings(&self) -> &'a [Listing] {
        if self.matches.is_empty() {
            self.catalog
        } else {
            self.matches
        }
    }
}

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Failures talking to the language backend. Display output never carries the
/// request URL or the upstream body, so it is safe to hand to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("language backend is not configured: {0}")]
    NotConfigured(String),
    #[error("language backend request failed: {0}")]
    Transport(reqwest::Error),
    #[error("language backend returned HTTP {status}")]
    Api { status: u16, body: String },
    #[error("language backend returned an unexpected response: {0}")]
    InvalidResponse(String),
    #[error("language backend payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Produces the assistant's reply text for a classified message.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, context: ReplyContext<'_>) -> Result<String, GatewayError>;
}

/// Offline backend answering from the knowledge base and matched listings.
#[derive(Debug, Clone, Default)]
pub struct CannedResponder {
    composer: ResponseComposer,
}

impl CannedResponder {
    pub fn new(composer: ResponseComposer) -> Self {
        Self { composer }
    }
}

#[async_trait]
impl ReplyGenerator for CannedResponder {
    async fn generate(&self, context: ReplyContext<'_>) -> Result<String, GatewayError> {
        Ok(self.composer.compose(
            context.question,
            context.classification.category,
            context.matches,
        ))
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u32>,
    #[serde(default)]
    candidates_token_count: Option<u32>,
    #[serde(default)]
    total_token_count: Option<u32>,
}

/// Google Gemini `generateContent` backend.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
    prompts: PromptBuilder,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, GatewayError> {
        if config.api_key.trim().is_empty() {
            return Err(GatewayError::NotConfigured(
                "GOOGLE_GEMINI_API_KEY is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(transport)?;

        Ok(Self {
            client,
            config,
            prompts: PromptBuilder::default(),
        })
    }

    pub fn with_prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl ReplyGenerator for GeminiClient {
    async fn generate(&self, context: ReplyContext<'_>) -> Result<String, GatewayError> {
        let prompt =
            self.prompts
                .build(context.question, context.history, context.context_listings())?;

        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let endpoint = self.endpoint();
        debug!(%endpoint, model = %self.config.model, "sending generateContent request");

        let response = self
            .client
            .post(&endpoint)
            .header(API_KEY_HEADER, self.config.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("application/json"))
            .unwrap_or(false);
        let text = response.text().await.map_err(transport)?;

        if !status.is_success() {
            warn!(status = status.as_u16(), body = %text, "language backend rejected request");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        if !is_json {
            debug!(body = %text, "language backend answered with a non-JSON body");
            return Err(GatewayError::InvalidResponse(
                "expected an application/json body".to_string(),
            ));
        }

        parse_reply(&text)
    }
}

// reqwest errors embed the request URL; strip it before the error travels on.
fn transport(err: reqwest::Error) -> GatewayError {
    GatewayError::Transport(err.without_url())
}

fn parse_reply(raw: &str) -> Result<String, GatewayError> {
    let parsed: GenerateContentResponse = serde_json::from_str(raw)?;

    if let Some(usage) = &parsed.usage_metadata {
        info!(
            prompt_tokens = ?usage.prompt_token_count,
            reply_tokens = ?usage.candidates_token_count,
            total_tokens = ?usage.total_token_count,
            "language backend usage"
        );
    }

    parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| GatewayError::InvalidResponse("no candidate text in response".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::assistant::classification::QueryCategory;
    use crate::workflows::catalog::sample_catalog;
    use std::sync::{Arc, Mutex};

    fn gemini_config(api_key: &str) -> GeminiConfig {
        GeminiConfig {
            api_key: api_key.to_string(),
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://example.invalid/v1beta/models/".to_string(),
            timeout_secs: 5,
        }
    }

    #[derive(Debug, Clone)]
    struct CapturedRequest {
        uri: String,
        api_key: Option<String>,
        body: serde_json::Value,
    }

    #[derive(Clone)]
    struct StubBackend {
        status: axum::http::StatusCode,
        content_type: &'static str,
        body: &'static str,
        requests: Arc<Mutex<Vec<CapturedRequest>>>,
    }

    async fn answer(
        axum::extract::State(backend): axum::extract::State<StubBackend>,
        uri: axum::http::Uri,
        headers: axum::http::HeaderMap,
        axum::Json(body): axum::Json<serde_json::Value>,
    ) -> axum::response::Response {
        use axum::response::IntoResponse;

        backend
            .requests
            .lock()
            .expect("capture mutex poisoned")
            .push(CapturedRequest {
                uri: uri.to_string(),
                api_key: headers
                    .get(API_KEY_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string),
                body,
            });
        (
            backend.status,
            [(axum::http::header::CONTENT_TYPE, backend.content_type)],
            backend.body,
        )
            .into_response()
    }

    /// Serve `body` for every request on an ephemeral port and return a
    /// client pointed at it together with the captured requests.
    async fn stub_backend(
        status: u16,
        content_type: &'static str,
        body: &'static str,
    ) -> (GeminiClient, Arc<Mutex<Vec<CapturedRequest>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let backend = StubBackend {
            status: axum::http::StatusCode::from_u16(status).expect("valid status"),
            content_type,
            body,
            requests: requests.clone(),
        };
        let app = axum::Router::new().fallback(answer).with_state(backend);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub backend");
        let addr = listener.local_addr().expect("stub address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub backend serves");
        });

        let mut config = gemini_config("stub-key");
        config.base_url = format!("http://{addr}/v1beta/models");
        (GeminiClient::new(config).expect("client builds"), requests)
    }

    fn context(catalog: &[Listing]) -> ReplyContext<'_> {
        ReplyContext {
            question: "¿Tienen áticos en Madrid?",
            classification: QueryCategory::Simple.into(),
            history: &[],
            matches: &catalog[..1],
            catalog,
        }
    }

    #[test]
    fn parse_reply_extracts_first_candidate_text() {
        let raw = r#"{
            "candidates": [{"content": {"parts": [{"text": "¡Hola! Tengo tres opciones."}]}}],
            "usageMetadata": {"promptTokenCount": 120, "candidatesTokenCount": 9, "totalTokenCount": 129}
        }"#;
        assert_eq!(
            parse_reply(raw).expect("reply parses"),
            "¡Hola! Tengo tres opciones."
        );
    }

    #[test]
    fn parse_reply_rejects_empty_candidates() {
        let error = parse_reply(r#"{"candidates": []}"#).expect_err("no candidates");
        assert!(matches!(error, GatewayError::InvalidResponse(_)));

        let error = parse_reply(r#"{"candidates": [{"content": {"parts": [{"text": "  "}]}}]}"#)
            .expect_err("blank text");
        assert!(matches!(error, GatewayError::InvalidResponse(_)));
    }

    #[test]
    fn parse_reply_surfaces_malformed_json() {
        let error = parse_reply("not json").expect_err("malformed");
        assert!(matches!(error, GatewayError::Json(_)));
    }

    #[test]
    fn gemini_client_requires_an_api_key() {
        let error = GeminiClient::new(gemini_config("  ")).expect_err("empty key");
        assert!(matches!(error, GatewayError::NotConfigured(_)));
    }

    #[test]
    fn endpoint_joins_base_url_and_model() {
        let client = GeminiClient::new(gemini_config("secret")).expect("client builds");
        assert_eq!(
            client.endpoint(),
            "https://example.invalid/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn context_listings_fall_back_to_catalog() {
        let catalog = sample_catalog();
        let mut context = ReplyContext {
            question: "hola",
            classification: QueryCategory::Simple.into(),
            history: &[],
            matches: &[],
            catalog: &catalog,
        };
        assert_eq!(context.context_listings().len(), catalog.len());

        context.matches = &catalog[..1];
        assert_eq!(context.context_listings().len(), 1);
    }

    #[tokio::test]
    async fn canned_responder_uses_category_default_without_matches() {
        let catalog = sample_catalog();
        let reply = CannedResponder::default()
            .generate(ReplyContext {
                question: "necesito ayuda personalizada",
                classification: QueryCategory::AgentHandoff.into(),
                history: &[],
                matches: &[],
                catalog: &catalog,
            })
            .await
            .expect("canned reply");
        assert!(reply.contains("agentes inmobiliarios"));
    }

    #[tokio::test]
    async fn generate_sends_prompt_with_key_header_and_returns_text() {
        let (client, requests) = stub_backend(
            200,
            "application/json; charset=UTF-8",
            r#"{"candidates": [{"content": {"parts": [{"text": "Sí, tenemos un ático en Chamberí."}]}}]}"#,
        )
        .await;
        let catalog = sample_catalog();

        let reply = client.generate(context(&catalog)).await.expect("reply");

        assert_eq!(reply, "Sí, tenemos un ático en Chamberí.");
        let requests = requests.lock().expect("capture mutex poisoned").clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].uri,
            "/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(requests[0].api_key.as_deref(), Some("stub-key"));
        let prompt = requests[0].body["contents"][0]["parts"][0]["text"]
            .as_str()
            .expect("prompt text");
        assert!(prompt.contains("Consulta del usuario: ¿Tienen áticos en Madrid?"));
        assert!(prompt.contains("prop-001"));
        assert!(!prompt.contains("prop-002"));
    }

    #[tokio::test]
    async fn generate_maps_error_status_without_exposing_body() {
        let (client, _) = stub_backend(
            429,
            "application/json",
            r#"{"error": {"message": "quota exhausted for project 1234"}}"#,
        )
        .await;
        let catalog = sample_catalog();

        let error = client.generate(context(&catalog)).await.expect_err("429");

        match &error {
            GatewayError::Api { status, body } => {
                assert_eq!(*status, 429);
                assert!(body.contains("quota exhausted"));
            }
            other => panic!("expected api error, got {other:?}"),
        }
        assert!(!error.to_string().contains("quota"));
    }

    #[tokio::test]
    async fn generate_rejects_non_json_bodies() {
        let (client, _) = stub_backend(200, "text/html", "<html>login required</html>").await;
        let catalog = sample_catalog();

        let error = client.generate(context(&catalog)).await.expect_err("html");

        assert!(matches!(error, GatewayError::InvalidResponse(_)));
        assert!(!error.to_string().contains("login required"));
    }

    #[tokio::test]
    async fn generate_rejects_empty_candidates() {
        let (client, _) = stub_backend(200, "application/json", r#"{"candidates": []}"#).await;
        let catalog = sample_catalog();

        let error = client.generate(context(&catalog)).await.expect_err("empty");

        assert!(matches!(error, GatewayError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn transport_errors_do_not_carry_the_api_key() {
        let mut config = gemini_config("SUPERSECRETKEY123");
        config.base_url = "http://127.0.0.1:1/v1beta/models".to_string();
        let client = GeminiClient::new(config).expect("client builds");
        let catalog = sample_catalog();

        let error = client
            .generate(context(&catalog))
            .await
            .expect_err("nothing listens on port 1");

        assert!(matches!(error, GatewayError::Transport(_)));
        assert!(!error.to_string().contains("SUPERSECRETKEY123"));
        assert!(!format!("{error:?}").contains("SUPERSECRETKEY123"));
    }
}
