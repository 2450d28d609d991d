use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored an inbound message. Messages the bot sends through the
/// Conversations API come back in the poll window authored as `System`
/// and must never be re-dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    System,
}

/// Reference to a media attachment. The bytes stay with the transport;
/// the controller only ever sees the resolved local file path.
#[derive(Debug, Clone)]
pub struct MediaRef {
    pub sid: String,
    pub content_type: String,
}

/// One delivered message, tagged once at ingestion. Handlers never
/// re-inspect the raw transport payload.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub sid: String,
    pub author: Author,
    pub body: Option<String>,
    pub media: Vec<MediaRef>,
}

impl InboundMessage {
    /// Text content, if the message carries a non-empty body.
    pub fn text(&self) -> Option<&str> {
        self.body.as_deref().filter(|b| !b.is_empty())
    }

    /// First image attachment, if any. Non-image media is ignored.
    pub fn first_image(&self) -> Option<&MediaRef> {
        self.media
            .iter()
            .find(|m| m.content_type.starts_with("image/"))
    }
}

/// Full recipe record as returned by the recipe API. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDetail {
    pub name: String,
    pub image_url: String,
    /// 0-100, absent for some recipes
    pub health_score: Option<f64>,
    pub source_url: String,
    pub video_url: String,
    pub steps: Vec<String>,
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub nutrition: serde_json::Value,
}

/// A recipe the user selected, stamped at save time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedRecipe {
    #[serde(flatten)]
    pub recipe: RecipeDetail,
    pub saved_at: DateTime<Utc>,
}

/// Per-user profile. Created on first save, mutated only by appending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub saved_recipes: Vec<SavedRecipe>,
}

/// The whole-file unit of persistence, keyed by phone identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub users: HashMap<String, UserProfile>,
}
