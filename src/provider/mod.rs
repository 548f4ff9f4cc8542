//! Provider adapters: authentication headers and request bodies.
//!
//! Every supported vendor speaks the OpenAI chat-completions body; they differ
//! in base URL, endpoint path and how the API key is presented.

pub mod http;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::AbacusError;
use crate::types::{ChatMessage, ModelSettings};

const AZURE_API_VERSION: &str = "2024-06-01";

/// Supported model vendors.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    DeepSeek,
    Qwen,
    Moonshot,
    Zhipu,
    OpenRouter,
    Azure,
    Custom,
}

impl ProviderKind {
    /// Base URL used when none is configured.
    pub fn default_base_url(self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("https://api.openai.com/v1"),
            Self::DeepSeek => Some("https://api.deepseek.com/v1"),
            Self::Qwen => Some("https://dashscope.aliyuncs.com/compatible-mode/v1"),
            Self::Moonshot => Some("https://api.moonshot.cn/v1"),
            Self::Zhipu => Some("https://open.bigmodel.cn/api/paas/v4"),
            Self::OpenRouter => Some("https://openrouter.ai/api/v1"),
            Self::Azure | Self::Custom => None,
        }
    }

    /// Model used when none is configured.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi | Self::Azure | Self::Custom => "gpt-4o-mini",
            Self::DeepSeek => "deepseek-chat",
            Self::Qwen => "qwen-plus",
            Self::Moonshot => "moonshot-v1-8k",
            Self::Zhipu => "glm-4-flash",
            Self::OpenRouter => "openai/gpt-4o-mini",
        }
    }
}

/// A fully built HTTP request, ready for the transport.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub endpoint: String,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

/// Builds provider-specific requests from a normalized message list.
///
/// Contains no business logic; every method is pure.
#[derive(Debug, Clone)]
pub struct ProviderAdapter {
    kind: ProviderKind,
    api_key: String,
    base_url: String,
    model: String,
}

impl ProviderAdapter {
    pub fn new(
        kind: ProviderKind,
        api_key: impl Into<String>,
        base_url: Option<String>,
        model: impl Into<String>,
    ) -> Result<Self, AbacusError> {
        let base_url = base_url
            .filter(|url| !url.trim().is_empty())
            .or_else(|| kind.default_base_url().map(str::to_string))
            .ok_or_else(|| {
                AbacusError::Configuration(format!("provider '{kind}' requires a base URL"))
            })?;
        Ok(Self {
            kind,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full URL of the chat-completions endpoint.
    pub fn endpoint(&self) -> String {
        match self.kind {
            ProviderKind::Azure => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={AZURE_API_VERSION}",
                self.base_url, self.model
            ),
            _ => format!("{}/chat/completions", self.base_url),
        }
    }

    pub fn headers(&self, stream: bool) -> Result<HeaderMap, AbacusError> {
        match self.kind {
            ProviderKind::Azure => http::api_key_headers(&self.api_key, stream),
            ProviderKind::OpenRouter => {
                let mut headers = http::bearer_headers(&self.api_key, stream)?;
                headers.insert(
                    "HTTP-Referer",
                    HeaderValue::from_static("https://github.com/abacus-ledger/abacus"),
                );
                headers.insert("X-Title", HeaderValue::from_static("abacus"));
                Ok(headers)
            }
            _ => http::bearer_headers(&self.api_key, stream),
        }
    }

    pub fn build_body(&self, messages: &[ChatMessage], settings: &ModelSettings) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": settings.max_tokens,
            "temperature": settings.temperature,
            "stream": settings.stream,
        })
    }

    pub fn build_request(
        &self,
        messages: &[ChatMessage],
        settings: &ModelSettings,
    ) -> Result<PreparedRequest, AbacusError> {
        Ok(PreparedRequest {
            endpoint: self.endpoint(),
            headers: self.headers(settings.stream)?,
            body: self.build_body(messages, settings),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reqwest::header::AUTHORIZATION;

    #[test]
    fn openai_request_shape() {
        let adapter =
            ProviderAdapter::new(ProviderKind::OpenAi, "sk-1", None, "gpt-4o-mini").unwrap();
        let settings = ModelSettings::builder().max_tokens(512).temperature(0.3).build();
        let request = adapter
            .build_request(
                &[ChatMessage::system("rules"), ChatMessage::user("hi")],
                &settings,
            )
            .unwrap();

        assert_eq!(request.endpoint, "https://api.openai.com/v1/chat/completions");
        assert_eq!(request.headers[AUTHORIZATION], "Bearer sk-1");
        assert_eq!(
            request.body,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "rules"},
                    {"role": "user", "content": "hi"}
                ],
                "max_tokens": 512,
                "temperature": 0.3,
                "stream": true,
            })
        );
    }

    #[test]
    fn azure_uses_deployment_url_and_api_key() {
        let adapter = ProviderAdapter::new(
            ProviderKind::Azure,
            "az",
            Some("https://res.openai.azure.com/".into()),
            "gpt4o",
        )
        .unwrap();
        assert_eq!(
            adapter.endpoint(),
            "https://res.openai.azure.com/openai/deployments/gpt4o/chat/completions?api-version=2024-06-01"
        );
        let headers = adapter.headers(false).unwrap();
        assert_eq!(headers["api-key"], "az");
    }

    #[test]
    fn custom_provider_requires_base_url() {
        let err = ProviderAdapter::new(ProviderKind::Custom, "k", None, "m").unwrap_err();
        assert!(matches!(err, AbacusError::Configuration(_)));
    }

    #[test]
    fn openrouter_adds_attribution_headers() {
        let adapter = ProviderAdapter::new(ProviderKind::OpenRouter, "k", None, "m").unwrap();
        let headers = adapter.headers(true).unwrap();
        assert_eq!(headers["X-Title"], "abacus");
        assert!(headers.contains_key("HTTP-Referer"));
    }

    #[test]
    fn provider_kind_parses_snake_case() {
        assert_eq!("deep_seek".parse::<ProviderKind>().unwrap(), ProviderKind::DeepSeek);
        assert_eq!(ProviderKind::OpenRouter.to_string(), "open_router");
    }
}
