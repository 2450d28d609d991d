//! Recipe search against the Spoonacular API: a ranked ingredient search
//! followed by one detail lookup per hit. Non-2xx responses skip the
//! affected recipe rather than failing the whole search.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::SpoonacularConfig;
use crate::error::BotError;
use crate::model::RecipeDetail;

/// Finds recipes matching an ingredient list.
#[async_trait]
pub trait RecipeFinder: Send + Sync {
    /// Up to `count` recipes with full detail, best match first.
    async fn find_detailed(
        &self,
        ingredients: &[String],
        count: usize,
    ) -> Result<Vec<RecipeDetail>, BotError>;
}

pub struct SpoonacularFinder {
    client: Client,
    api_key: String,
    base_url: String,
}

/// One hit from the ingredient search. Only the id is needed; everything
/// else comes from the detail lookup.
#[derive(Debug, Deserialize)]
struct SearchHit {
    id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InformationResponse {
    title: Option<String>,
    image: Option<String>,
    health_score: Option<f64>,
    source_url: Option<String>,
    video: Option<String>,
    #[serde(default)]
    analyzed_instructions: Vec<Instruction>,
    #[serde(default)]
    extended_ingredients: Vec<ExtendedIngredient>,
    #[serde(default)]
    nutrition: Value,
}

#[derive(Debug, Deserialize)]
struct Instruction {
    #[serde(default)]
    steps: Vec<InstructionStep>,
}

#[derive(Debug, Deserialize)]
struct InstructionStep {
    step: String,
}

#[derive(Debug, Deserialize)]
struct ExtendedIngredient {
    original: String,
}

impl SpoonacularFinder {
    /// Create a new finder from configuration
    pub fn new(config: &SpoonacularConfig) -> Result<Self, BotError> {
        // Try config first, then fall back to environment variable
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("SPOONACULAR_API_KEY").ok())
            .ok_or_else(|| {
                BotError::MissingConfig(
                    "SPOONACULAR_API_KEY not found in config or environment".to_string(),
                )
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.spoonacular.com".to_string());

        Ok(SpoonacularFinder {
            client: Client::new(),
            api_key,
            base_url,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        SpoonacularFinder {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    /// Ranked search (best match first, pantry staples ignored).
    /// A non-2xx status yields an empty result, not an error.
    async fn search(&self, ingredients: &[String], count: usize) -> Result<Vec<SearchHit>, BotError> {
        let response = self
            .client
            .get(format!("{}/recipes/findByIngredients", self.base_url))
            .query(&[
                ("ingredients", ingredients.join(",").as_str()),
                ("number", count.to_string().as_str()),
                ("ranking", "1"),
                ("ignorePantry", "true"),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("recipe search returned status {}", response.status());
            return Ok(Vec::new());
        }

        Ok(response.json().await?)
    }

    /// Fetch full detail for one recipe; `None` when the lookup fails.
    async fn information(&self, id: u64) -> Result<Option<RecipeDetail>, BotError> {
        let response = self
            .client
            .get(format!("{}/recipes/{}/information", self.base_url, id))
            .query(&[
                ("includeNutrition", "true"),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(
                "failed to fetch details for recipe {id}: status {}",
                response.status()
            );
            return Ok(None);
        }

        let info: InformationResponse = response.json().await?;
        debug!("fetched detail for recipe {id}");

        Ok(Some(RecipeDetail {
            name: info.title.unwrap_or_else(|| "Unknown Recipe".to_string()),
            image_url: info.image.unwrap_or_default(),
            health_score: info.health_score,
            source_url: info.source_url.unwrap_or_default(),
            video_url: info
                .video
                .unwrap_or_else(|| "No video available".to_string()),
            steps: info
                .analyzed_instructions
                .into_iter()
                .flat_map(|i| i.steps)
                .map(|s| s.step)
                .collect(),
            ingredients: info
                .extended_ingredients
                .into_iter()
                .map(|z| z.original)
                .collect(),
            nutrition: info.nutrition,
        }))
    }
}

#[async_trait]
impl RecipeFinder for SpoonacularFinder {
    async fn find_detailed(
        &self,
        ingredients: &[String],
        count: usize,
    ) -> Result<Vec<RecipeDetail>, BotError> {
        let hits = self.search(ingredients, count).await?;

        let mut recipes = Vec::with_capacity(hits.len());
        for hit in hits {
            if let Some(detail) = self.information(hit.id).await? {
                recipes.push(detail);
            }
        }
        Ok(recipes)
    }
}
