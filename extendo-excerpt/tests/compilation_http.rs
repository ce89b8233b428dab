use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use extendo_core_models::PersistedConversationHashEntry;
use extendo_excerpt::*;
use extendo_storage::{ExtensionSettings, StoreError};
use httpmock::prelude::*;
use serde_json::json;

struct FixedSettings {
    api_instance: String,
}

#[async_trait]
impl ExtensionSettings for FixedSettings {
    async fn translations_api_instance(&self) -> Result<String, StoreError> {
        Ok(self.api_instance.clone())
    }

    async fn blackiya_extension_id(&self) -> Result<String, StoreError> {
        Ok(String::new())
    }

    async fn saved_conversation_hashes(
        &self,
    ) -> Result<Vec<PersistedConversationHashEntry>, StoreError> {
        Ok(Vec::new())
    }

    async fn save_conversation_hashes(
        &self,
        _entries: &[PersistedConversationHashEntry],
    ) -> Result<(), StoreError> {
        Ok(())
    }
}

fn client_for(base: &str) -> CompilationClient {
    let settings = Arc::new(FixedSettings {
        api_instance: base.to_string(),
    });
    CompilationClient::new(settings, Duration::from_secs(5)).expect("client")
}

#[tokio::test]
async fn fetches_excerpt_with_provider_and_budget() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/compilation/excerpts/shift")
                .query_param("provider", "grok")
                .query_param("maxTokens", "15000");
            then.status(200).body("## excerpt");
        })
        .await;

    let response = client_for(&server.base_url())
        .handle_runtime_message(&json!({
            "type": "fetch-compilation-excerpt",
            "provider": "grok",
            "maxTokens": 15000
        }))
        .await
        .expect("handled");

    mock.assert_async().await;
    assert_eq!(response, CompilationFetchResponse::success("## excerpt".into()));
}

#[tokio::test]
async fn failing_backend_reports_status_line() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/compilation/excerpts/shift");
            then.status(404);
        })
        .await;

    let response = client_for(&server.base_url())
        .handle_runtime_message(&json!({
            "type": "fetch-compilation-excerpt",
            "provider": "openai",
            "maxTokens": 10000
        }))
        .await
        .expect("handled");

    mock.assert_async().await;
    let endpoint = format!(
        "{}/compilation/excerpts/shift?provider=openai&maxTokens=10000",
        server.base_url()
    );
    assert_eq!(
        response,
        CompilationFetchResponse::failure(format!(
            "Failed to fetch compilation excerpt. {endpoint} -> 404 Not Found"
        ))
    );
}

#[tokio::test]
async fn shortcut_variant_sets_budget_when_max_tokens_absent() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/compilation/excerpts/shift")
                .query_param("provider", "gemini")
                .query_param("maxTokens", "20000");
            then.status(200).body("excerpt");
        })
        .await;

    let text = client_for(&server.base_url())
        .fetch_excerpt(&CompilationFetchRequest::for_variant(
            LlmProvider::Gemini,
            TokenVariant::RightCommandRightOption0,
        ))
        .await
        .expect("fetched");

    mock.assert_async().await;
    assert_eq!(text, "excerpt");
}

#[tokio::test]
async fn request_without_budget_is_rejected() {
    let response = client_for("http://127.0.0.1:9")
        .handle_runtime_message(&json!({
            "type": "fetch-compilation-excerpt",
            "provider": "openai"
        }))
        .await
        .expect("handled");
    assert_eq!(
        response,
        CompilationFetchResponse::failure(ExcerptError::MissingBudget.to_string())
    );
}

#[tokio::test]
async fn unconfigured_instance_is_reported() {
    let response = client_for("")
        .handle_runtime_message(&json!({
            "type": "fetch-compilation-excerpt",
            "provider": "gemini",
            "maxTokens": 7000
        }))
        .await
        .expect("handled");
    assert_eq!(
        response,
        CompilationFetchResponse::failure("Translations API instance is not configured.")
    );
}

#[tokio::test]
async fn other_message_types_are_ignored() {
    let client = client_for("http://127.0.0.1:9");
    assert!(client
        .handle_runtime_message(&json!({"type": "translate-selection"}))
        .await
        .is_none());
    assert!(client.handle_runtime_message(&json!("ping")).await.is_none());
}

#[tokio::test]
async fn malformed_request_gets_failure_response() {
    let response = client_for("http://127.0.0.1:9")
        .handle_runtime_message(&json!({
            "type": "fetch-compilation-excerpt",
            "provider": "claude"
        }))
        .await
        .expect("handled");
    assert!(!response.ok);
    assert!(response.error.is_some());
}
