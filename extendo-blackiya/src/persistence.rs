use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use extendo_core_models::{ConversationPayload, TRANSLATIONS_API_PATH};
use extendo_storage::ExtensionSettings;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{error, info};

use crate::errors::PersistenceError;

/// Destination of conversation payloads that passed every processing stage.
#[async_trait]
pub trait ConversationSink: Send + Sync {
    async fn save_conversation(
        &self,
        payload: &ConversationPayload,
        conversation_id: &str,
    ) -> Result<(), PersistenceError>;
}

pub fn translation_endpoint(api_instance: &str, translation_id: &str) -> String {
    format!(
        "{}{}/{}",
        api_instance.trim_end_matches('/'),
        TRANSLATIONS_API_PATH,
        urlencoding::encode(translation_id)
    )
}

/// POSTs payloads to `{base}/translations/{id}`. The base is read from settings
/// on every call so option changes apply without a restart.
#[derive(Clone)]
pub struct TranslationsClient {
    client: Client,
    settings: Arc<dyn ExtensionSettings>,
}

impl TranslationsClient {
    pub fn new(
        settings: Arc<dyn ExtensionSettings>,
        timeout: Duration,
    ) -> Result<Self, PersistenceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PersistenceError::Client(err.to_string()))?;
        Ok(Self::with_client(client, settings))
    }

    pub fn with_client(client: Client, settings: Arc<dyn ExtensionSettings>) -> Self {
        Self { client, settings }
    }

    async fn post(&self, endpoint: &str, body: String) -> Result<(), PersistenceError> {
        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| PersistenceError::Transport {
                endpoint: endpoint.to_string(),
                cause: err.to_string(),
            })?;

        let status = response.status();
        let response_body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            if !response_body.is_empty() {
                error!(%endpoint, body = %response_body, "translation save failure response body");
            }
            return Err(PersistenceError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        info!(
            %endpoint,
            status = status.as_u16(),
            response_bytes = response_body.len(),
            "translation POST completed"
        );
        Ok(())
    }
}

#[async_trait]
impl ConversationSink for TranslationsClient {
    async fn save_conversation(
        &self,
        payload: &ConversationPayload,
        conversation_id: &str,
    ) -> Result<(), PersistenceError> {
        let body = serde_json::to_string(payload)
            .map_err(|err| PersistenceError::Serialization(err.to_string()))?;

        let api_instance = self.settings.translations_api_instance().await?;
        if api_instance.is_empty() {
            error!(conversation_id, "translation save failed: api instance not configured");
            return Err(PersistenceError::NotConfigured);
        }

        let endpoint = translation_endpoint(&api_instance, conversation_id);
        info!(
            conversation_id,
            %endpoint,
            payload_keys = payload.len(),
            payload_bytes = body.len(),
            "saving conversation payload"
        );

        match self.post(&endpoint, body).await {
            Ok(()) => {
                info!(conversation_id, "saved conversation payload");
                Ok(())
            }
            Err(err) => {
                error!(conversation_id, error = %err, "translation save failed");
                Err(err)
            }
        }
    }
}
