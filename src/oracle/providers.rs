use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::OracleError;
use crate::settings::{OracleSettings, ProviderKind};

/// Raw prompt-in, text-out access to a language model. Everything above
/// this trait is provider-agnostic.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, OracleError>;
}

/// Builds the generator for the configured provider. Fails when a hosted
/// provider has no API key.
pub fn build_generator(settings: &OracleSettings) -> Result<Arc<dyn TextGenerator>> {
    // Network-level cap; callers apply their own, tighter deadlines.
    let timeout = Duration::from_secs(settings.score_timeout_secs.max(settings.report_timeout_secs));
    let client = Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default();

    let generator: Arc<dyn TextGenerator> = match settings.provider {
        ProviderKind::Ollama => Arc::new(OllamaGenerator {
            client,
            base_url: settings.base_url(),
            model: settings.model(),
            temperature: settings.temperature,
        }),
        ProviderKind::OpenAi => {
            let Some(api_key) = settings.api_key() else {
                bail!("no API key for the OpenAI-compatible provider (set GROQ_API_KEY or OPENAI_API_KEY)");
            };
            Arc::new(OpenAiGenerator {
                client,
                base_url: settings.base_url(),
                model: settings.model(),
                api_key,
                temperature: settings.temperature,
            })
        }
        ProviderKind::Gemini => {
            let Some(api_key) = settings.api_key() else {
                bail!("no API key for Gemini (set GEMINI_API_KEY)");
            };
            Arc::new(GeminiGenerator {
                client,
                base_url: settings.base_url(),
                model: settings.model(),
                api_key,
                temperature: settings.temperature,
            })
        }
        ProviderKind::HuggingFace => {
            let Some(api_key) = settings.api_key() else {
                bail!("no API key for Hugging Face (set HF_API_KEY)");
            };
            Arc::new(HuggingFaceGenerator {
                client,
                base_url: settings.base_url(),
                model: settings.model(),
                api_key,
                temperature: settings.temperature,
            })
        }
        ProviderKind::Offline => Arc::new(OfflineGenerator),
    };
    Ok(generator)
}

fn unavailable(err: reqwest::Error) -> OracleError {
    OracleError::Unavailable(err.to_string())
}

async fn post_json<B: Serialize + ?Sized>(
    request: reqwest::RequestBuilder,
    body: &B,
) -> Result<Value, OracleError> {
    let response = request.json(body).send().await.map_err(unavailable)?;
    let status = response.status();
    if !status.is_success() {
        return Err(OracleError::Unavailable(format!("provider returned {status}")));
    }
    response
        .json::<Value>()
        .await
        .map_err(|err| OracleError::MalformedResponse(err.to_string()))
}

fn text_at(body: &Value, pointer: &str) -> Result<String, OracleError> {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| OracleError::MalformedResponse(format!("response has no text at {pointer}")))
}

pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, OracleError> {
        let body = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                num_predict: max_tokens,
                temperature: self.temperature,
            },
        };
        let request = self.client.post(format!("{}/api/generate", self.base_url));
        let json = post_json(request, &body).await?;
        text_at(&json, "/response")
    }
}

pub struct OpenAiGenerator {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, OracleError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature: self.temperature,
        };
        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key);
        let json = post_json(request, &body).await?;
        text_at(&json, "/choices/0/message/content")
    }
}

pub struct GeminiGenerator {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, OracleError> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "maxOutputTokens": max_tokens,
                "temperature": self.temperature,
            },
        });
        let request = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())]);
        let json = post_json(request, &body).await?;
        text_at(&json, "/candidates/0/content/parts/0/text")
    }
}

pub struct HuggingFaceGenerator {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
}

#[async_trait]
impl TextGenerator for HuggingFaceGenerator {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, OracleError> {
        let body = serde_json::json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": max_tokens,
                "temperature": self.temperature,
                "return_full_text": false,
            },
        });
        let request = self
            .client
            .post(format!("{}/models/{}", self.base_url, self.model))
            .bearer_auth(&self.api_key);
        let json = post_json(request, &body).await?;
        let text = text_at(&json, "/0/generated_text")?;
        // Some deployments ignore return_full_text and echo the prompt.
        Ok(text
            .strip_prefix(prompt.trim())
            .map(|rest| rest.trim().to_string())
            .unwrap_or(text))
    }
}

/// Stand-in when no provider is configured. Every call fails, so the
/// pipeline runs on its fallbacks.
pub struct OfflineGenerator;

#[async_trait]
impl TextGenerator for OfflineGenerator {
    fn name(&self) -> &str {
        "offline"
    }

    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String, OracleError> {
        Err(OracleError::Unavailable("no oracle provider configured".into()))
    }
}
