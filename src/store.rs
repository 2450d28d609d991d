//! Whole-file JSON persistence for saved recipes. Every mutation loads the
//! document, modifies it and rewrites it atomically (temp file + rename),
//! so the read-only viewer never observes a partially written file.

use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, warn};

use crate::error::BotError;
use crate::model::{RecipeDetail, SavedRecipe, StoreData, UserProfile};

pub struct RecipeStore {
    data_file: PathBuf,
}

impl RecipeStore {
    /// Open (and create if needed) the store under `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self, BotError> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        Ok(RecipeStore {
            data_file: data_dir.join("data.json"),
        })
    }

    /// Load the whole store. A missing file is an empty store; a corrupt
    /// file is logged and treated as empty (data loss accepted).
    pub fn load(&self) -> StoreData {
        let raw = match std::fs::read_to_string(&self.data_file) {
            Ok(raw) => raw,
            Err(_) => return StoreData::default(),
        };

        match serde_json::from_str(&raw) {
            Ok(data) => data,
            Err(e) => {
                warn!("store file is corrupt ({e}); reinitializing an empty store");
                StoreData::default()
            }
        }
    }

    /// Append one selected recipe to the user's profile, creating the
    /// profile on first save.
    pub fn save_recipe_for_user(
        &self,
        phone_number: &str,
        recipe: &RecipeDetail,
    ) -> Result<(), BotError> {
        let mut data = self.load();

        let profile = data
            .users
            .entry(phone_number.to_string())
            .or_insert_with(|| UserProfile {
                created_at: Utc::now(),
                saved_recipes: Vec::new(),
            });

        profile.saved_recipes.push(SavedRecipe {
            recipe: recipe.clone(),
            saved_at: Utc::now(),
        });

        self.write(&data)?;
        debug!("recipe saved for user {phone_number}");
        Ok(())
    }

    /// The profile for one user, if any recipes were ever saved.
    pub fn user_profile(&self, phone_number: &str) -> Option<UserProfile> {
        self.load().users.get(phone_number).cloned()
    }

    fn write(&self, data: &StoreData) -> Result<(), BotError> {
        let tmp = self.data_file.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(data)?)?;
        std::fs::rename(&tmp, &self.data_file)?;
        Ok(())
    }
}
