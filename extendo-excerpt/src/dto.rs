use std::fmt;

use serde::{Deserialize, Serialize};

pub const FETCH_COMPILATION_EXCERPT_TYPE: &str = "fetch-compilation-excerpt";

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Openai,
    Grok,
    Gemini,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Openai => "openai",
            LlmProvider::Grok => "grok",
            LlmProvider::Gemini => "gemini",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyboard shortcut variants, each with its own excerpt token budget.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum TokenVariant {
    LeftCommandLeftOption0,
    RightCommandRightOption0,
    LeftCommandLeftOption7,
    RightCommandRightOption5,
}

impl TokenVariant {
    pub fn max_tokens(&self) -> u32 {
        match self {
            TokenVariant::LeftCommandLeftOption0 => 10_000,
            TokenVariant::RightCommandRightOption0 => 20_000,
            TokenVariant::LeftCommandLeftOption7 => 7_000,
            TokenVariant::RightCommandRightOption5 => 15_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompilationFetchRequest {
    pub provider: LlmProvider,
    #[serde(rename = "maxTokens", default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Shortcut that triggered the copy. Its budget applies when `maxTokens`
    /// is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<TokenVariant>,
}

impl CompilationFetchRequest {
    pub fn for_variant(provider: LlmProvider, variant: TokenVariant) -> Self {
        Self {
            provider,
            max_tokens: None,
            variant: Some(variant),
        }
    }

    pub fn token_budget(&self) -> Option<u32> {
        self.max_tokens
            .or_else(|| self.variant.map(|variant| variant.max_tokens()))
    }
}

/// Runtime messages this background half answers. Anything else is left to
/// other listeners.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuntimeRequest {
    #[serde(rename = "fetch-compilation-excerpt")]
    FetchCompilationExcerpt(CompilationFetchRequest),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompilationFetchResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompilationFetchResponse {
    pub fn success(text: String) -> Self {
        Self {
            ok: true,
            text: Some(text),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            text: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn variants_map_to_budgets() {
        let variant: TokenVariant = serde_json::from_value(json!("rightCommandRightOption5")).unwrap();
        assert_eq!(variant.max_tokens(), 15_000);
        assert_eq!(TokenVariant::LeftCommandLeftOption7.max_tokens(), 7_000);
    }

    #[test]
    fn request_parses_tagged_shape() {
        let RuntimeRequest::FetchCompilationExcerpt(request) = serde_json::from_value(json!({
            "type": "fetch-compilation-excerpt",
            "provider": "gemini",
            "maxTokens": 20000
        }))
        .unwrap();
        assert_eq!(request.provider, LlmProvider::Gemini);
        assert_eq!(request.token_budget(), Some(20_000));

        let other = serde_json::from_value::<RuntimeRequest>(json!({
            "type": "something-else",
            "provider": "gemini",
            "maxTokens": 1
        }));
        assert!(other.is_err());
    }

    #[test]
    fn explicit_budget_wins_over_shortcut_variant() {
        let RuntimeRequest::FetchCompilationExcerpt(request) = serde_json::from_value(json!({
            "type": "fetch-compilation-excerpt",
            "provider": "grok",
            "variant": "leftCommandLeftOption7"
        }))
        .unwrap();
        assert_eq!(request.token_budget(), Some(7_000));

        let pinned = CompilationFetchRequest {
            max_tokens: Some(1_234),
            ..request
        };
        assert_eq!(pinned.token_budget(), Some(1_234));

        let bare = CompilationFetchRequest {
            provider: LlmProvider::Openai,
            max_tokens: None,
            variant: None,
        };
        assert_eq!(bare.token_budget(), None);
        assert_eq!(
            CompilationFetchRequest::for_variant(LlmProvider::Gemini, TokenVariant::RightCommandRightOption0)
                .token_budget(),
            Some(20_000)
        );
    }

    #[test]
    fn responses_omit_unused_fields() {
        assert_eq!(
            serde_json::to_value(CompilationFetchResponse::success("excerpt".into())).unwrap(),
            json!({"ok": true, "text": "excerpt"})
        );
        assert_eq!(
            serde_json::to_value(CompilationFetchResponse::failure("nope")).unwrap(),
            json!({"ok": false, "error": "nope"})
        );
    }
}
