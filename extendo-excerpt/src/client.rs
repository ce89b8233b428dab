use std::sync::Arc;
use std::time::Duration;

use extendo_core_models::COMPILATION_API_PATH;
use extendo_storage::ExtensionSettings;
use reqwest::Client;
use serde_json::Value;
use tracing::{error, info};
use url::form_urlencoded;

use crate::dto::{
    CompilationFetchRequest, CompilationFetchResponse, LlmProvider, RuntimeRequest,
    FETCH_COMPILATION_EXCERPT_TYPE,
};
use crate::errors::ExcerptError;

pub fn build_compilation_endpoint(api_instance: &str, provider: LlmProvider, max_tokens: u32) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("provider", provider.as_str())
        .append_pair("maxTokens", &max_tokens.to_string())
        .finish();
    format!("{api_instance}{COMPILATION_API_PATH}?{query}")
}

/// Fetches size-bounded conversation excerpts from the translations backend.
#[derive(Clone)]
pub struct CompilationClient {
    client: Client,
    settings: Arc<dyn ExtensionSettings>,
}

impl CompilationClient {
    pub fn new(settings: Arc<dyn ExtensionSettings>, timeout: Duration) -> Result<Self, ExcerptError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ExcerptError::Client(err.to_string()))?;
        Ok(Self { client, settings })
    }

    pub async fn fetch_excerpt(&self, request: &CompilationFetchRequest) -> Result<String, ExcerptError> {
        let api_instance = self.settings.translations_api_instance().await?;
        if api_instance.is_empty() {
            return Err(ExcerptError::NotConfigured);
        }

        let max_tokens = request.token_budget().ok_or(ExcerptError::MissingBudget)?;
        let endpoint = build_compilation_endpoint(&api_instance, request.provider, max_tokens);
        let transport = |err: reqwest::Error| ExcerptError::Transport {
            endpoint: endpoint.clone(),
            cause: err.to_string(),
        };

        let response = self.client.get(&endpoint).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExcerptError::Status {
                endpoint: endpoint.clone(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let text = response.text().await.map_err(transport)?;
        info!(%endpoint, provider = %request.provider, max_tokens, bytes = text.len(), "fetched compilation excerpt");
        Ok(text)
    }

    /// Answers a runtime message. `None` means the message is not ours.
    pub async fn handle_runtime_message(&self, message: &Value) -> Option<CompilationFetchResponse> {
        if message.get("type").and_then(Value::as_str) != Some(FETCH_COMPILATION_EXCERPT_TYPE) {
            return None;
        }

        let request = match serde_json::from_value::<RuntimeRequest>(message.clone()) {
            Ok(RuntimeRequest::FetchCompilationExcerpt(request)) => request,
            Err(err) => {
                error!(error = %err, "malformed compilation fetch request");
                return Some(CompilationFetchResponse::failure(format!(
                    "Failed to fetch compilation excerpt. {err}"
                )));
            }
        };

        Some(match self.fetch_excerpt(&request).await {
            Ok(text) => CompilationFetchResponse::success(text),
            Err(err) => {
                error!(error = %err, "compilation fetch failed");
                CompilationFetchResponse::failure(err.to_string())
            }
        })
    }
}
