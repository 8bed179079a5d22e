use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

use super::prompt;
use super::traits::{Translator, TranslatorInfo};
use crate::config::{Lang, PromptMode, TranslatorConfig};
use crate::error::{Error, Result};

/// Seconds to wait on HTTP 429 when the server sends no `retry-after`
const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 5;

/// OpenAI-compatible API translator
/// Works with: llama.cpp server, Ollama, vLLM, text-generation-inference, OpenAI, etc.
pub struct OpenAiTranslator {
    client: Client,
    config: TranslatorConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

impl OpenAiTranslator {
    /// Create a new OpenAI-compatible translator.
    pub fn new(config: TranslatorConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::TranslationRequest(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        match self.config.mode {
            PromptMode::Chat => format!("{base}/chat/completions"),
            PromptMode::Completion => format!("{base}/completions"),
        }
    }

    /// Build the request for one attempt
    fn build_request(&self, url: &str, text: &str, target: &Lang) -> RequestBuilder {
        let req = match self.config.mode {
            PromptMode::Chat => {
                let user = prompt::chat_user_prompt(text, target);
                self.client.post(url).json(&ChatRequest {
                    model: &self.config.model,
                    messages: vec![
                        Message {
                            role: "system",
                            content: &self.config.system_prompt,
                        },
                        Message {
                            role: "user",
                            content: &user,
                        },
                    ],
                    temperature: self.config.temperature,
                    max_tokens: self.config.max_tokens,
                })
            }
            PromptMode::Completion => {
                let raw = prompt::completion_prompt(text, target);
                self.client.post(url).json(&CompletionRequest {
                    model: &self.config.model,
                    prompt: &raw,
                    temperature: self.config.temperature,
                    max_tokens: self.config.max_tokens,
                })
            }
        };

        match self.config.api_key {
            Some(ref key) => req.header("Authorization", format!("Bearer {key}")),
            None => req,
        }
    }

    /// Pull the generated text out of a successful response body
    fn parse_answer(&self, body: &str) -> Result<String> {
        let answer = match self.config.mode {
            PromptMode::Chat => serde_json::from_str::<ChatResponse>(body)
                .map_err(|e| Error::TranslationInvalidResponse(e.to_string()))?
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content),
            PromptMode::Completion => serde_json::from_str::<CompletionResponse>(body)
                .map_err(|e| Error::TranslationInvalidResponse(e.to_string()))?
                .choices
                .into_iter()
                .next()
                .map(|choice| prompt::extract_completion_answer(&choice.text)),
        };

        answer
            .map(|text| prompt::clean_answer(&text))
            .ok_or_else(|| Error::TranslationInvalidResponse("No choices in response".to_string()))
    }

    /// Make API request with retry logic
    async fn request_with_retry(&self, text: &str, target: &Lang) -> Result<String> {
        let url = self.endpoint();
        let attempts = self.config.retry_count;
        let mut last_error = None;

        for attempt in 0..attempts {
            debug!(
                "Translation request attempt {}/{} to {}",
                attempt + 1,
                attempts,
                url
            );

            match self.build_request(&url, text, target).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        match response.text().await {
                            Ok(body) => match self.parse_answer(&body) {
                                Ok(answer) => return Ok(answer),
                                Err(e) => {
                                    warn!("Failed to parse response: {}", e);
                                    last_error = Some(e);
                                }
                            },
                            Err(e) => {
                                warn!("Failed to read response body: {}", e);
                                last_error = Some(Error::TranslationInvalidResponse(e.to_string()));
                            }
                        }
                    } else if status.as_u16() == 429 {
                        let retry_after = response
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse().ok());

                        warn!("Rate limited, retry after {:?}s", retry_after);
                        last_error = Some(Error::TranslationRateLimited { retry_after });

                        // Wait longer on rate limit
                        let wait = retry_after.unwrap_or(DEFAULT_RATE_LIMIT_WAIT_SECS);
                        tokio::time::sleep(Duration::from_secs(wait)).await;
                        continue;
                    } else {
                        let body = response.text().await.unwrap_or_default();
                        warn!("API error: {} - {}", status, body);
                        last_error = Some(Error::TranslationRequest(format!("HTTP {status}: {body}")));
                    }
                }
                Err(e) => {
                    warn!("Request failed: {}", e);
                    last_error = Some(if e.is_timeout() {
                        Error::TranslationTimeout
                    } else {
                        Error::TranslationRequest(e.to_string())
                    });
                }
            }

            // Wait before retry
            if attempt + 1 < attempts {
                tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
            }
        }

        error!("Translation failed after {} attempts", attempts);
        Err(last_error.unwrap_or(Error::TranslationMaxRetriesExceeded))
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: match self.config.mode {
                PromptMode::Chat => "OpenAI Compatible (chat)",
                PromptMode::Completion => "OpenAI Compatible (completion)",
            },
            model: self.config.model.clone(),
        }
    }

    async fn translate(&self, text: &str, target: &Lang) -> Result<String> {
        // Skip empty text
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        self.request_with_retry(text, target).await
    }
}
