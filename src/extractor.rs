//! Ingredient extraction via the OpenAI chat completions API. Free text is
//! sent as-is; images are base64-encoded into a vision request.

use std::path::Path;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::fs;

use crate::config::OpenAiConfig;
use crate::error::BotError;

const EXTRACTION_PROMPT: &str = r#"
You are a culinary assistant that identifies food ingredients.
Given a user's text, or a photo of food such as the inside of a refrigerator,
list every distinct food ingredient you can identify. Ignore anything that
is not edible. If you see no food at all, return an empty array.
Output only this JSON without any other characters:

["<ingredient 1>", "<ingredient 2>", ...]
"#;

/// Turns free text or an image into an ingredient list.
#[async_trait]
pub trait IngredientExtractor: Send + Sync {
    async fn from_text(&self, text: &str) -> Result<Vec<String>, BotError>;
    async fn from_image(&self, image_path: &Path) -> Result<Vec<String>, BotError>;
}

pub struct OpenAiExtractor {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiExtractor {
    /// Create a new extractor from configuration
    pub fn new(config: &OpenAiConfig) -> Result<Self, BotError> {
        // Try config first, then fall back to environment variable
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                BotError::MissingConfig(
                    "OPENAI_API_KEY not found in config or environment".to_string(),
                )
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com".to_string());

        Ok(OpenAiExtractor {
            client: Client::new(),
            api_key,
            base_url,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String, model: String) -> Self {
        OpenAiExtractor {
            client: Client::new(),
            api_key,
            base_url,
            model,
            temperature: 0.2,
            max_tokens: 500,
        }
    }

    async fn complete(&self, user_content: Value) -> Result<Vec<String>, BotError> {
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": EXTRACTION_PROMPT},
                    {"role": "user", "content": user_content}
                ],
                "temperature": self.temperature,
                "max_tokens": self.max_tokens
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(BotError::Extraction(format!(
                "OpenAI API error ({status}): {error_text}"
            )));
        }

        let response_body: Value = response.json().await?;
        debug!("{:?}", response_body);

        let content = response_body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                BotError::Extraction("Failed to extract content from response".to_string())
            })?;

        parse_ingredient_array(content)
    }
}

/// The model occasionally wraps the array in prose or a code fence;
/// parse from the first '[' to the last ']'.
fn parse_ingredient_array(content: &str) -> Result<Vec<String>, BotError> {
    let start = content
        .find('[')
        .ok_or_else(|| BotError::Extraction("No JSON array in model response".to_string()))?;
    let end = content
        .rfind(']')
        .ok_or_else(|| BotError::Extraction("Unterminated JSON array in model response".to_string()))?;

    let parsed: Value = serde_json::from_str(&content[start..=end])?;
    let ingredients = parsed
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    Ok(ingredients)
}

fn mime_for(image_path: &Path) -> &'static str {
    match image_path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

#[async_trait]
impl IngredientExtractor for OpenAiExtractor {
    async fn from_text(&self, text: &str) -> Result<Vec<String>, BotError> {
        self.complete(json!(text)).await
    }

    async fn from_image(&self, image_path: &Path) -> Result<Vec<String>, BotError> {
        let image_data = fs::read(image_path).await?;
        let base64_image = STANDARD.encode(&image_data);

        let content = json!([
            {
                "type": "text",
                "text": "Which food ingredients do you see in this photo?"
            },
            {
                "type": "image_url",
                "image_url": {
                    "url": format!("data:{};base64,{}", mime_for(image_path), base64_image)
                }
            }
        ]);

        self.complete(content).await
    }
}
