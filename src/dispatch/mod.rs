//! Conversation dispatch: classifies each inbound message, routes it to
//! ingredient extraction or recipe selection, owns the most recent
//! suggestion set, and renders every outbound reply.

pub mod classify;
pub mod render;

use std::path::Path;
use std::sync::Arc;

use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::extractor::IngredientExtractor;
use crate::finder::RecipeFinder;
use crate::model::{Author, InboundMessage, RecipeDetail};
use crate::store::RecipeStore;
use crate::transport::MessageSender;

pub use classify::{classify, MessageKind};
pub use render::SUGGESTION_COUNT;

/// Per-conversation dispatcher.
///
/// Owns the suggestion set a numeric reply resolves against: it is
/// overwritten by every successful search, so a stale selection can never
/// reach an outdated recipe. One instance serves one conversation; nothing
/// here is shared between users.
pub struct DispatchController {
    extractor: Box<dyn IngredientExtractor>,
    finder: Box<dyn RecipeFinder>,
    sender: Arc<dyn MessageSender>,
    store: Arc<RecipeStore>,
    current_user: String,
    suggestions: Vec<RecipeDetail>,
    backlog_complete: bool,
    rng: StdRng,
}

impl DispatchController {
    pub fn new(
        extractor: Box<dyn IngredientExtractor>,
        finder: Box<dyn RecipeFinder>,
        sender: Arc<dyn MessageSender>,
        store: Arc<RecipeStore>,
        current_user: impl Into<String>,
    ) -> Self {
        Self::with_rng(
            extractor,
            finder,
            sender,
            store,
            current_user,
            StdRng::from_entropy(),
        )
    }

    /// Like [`new`](Self::new) but with a caller-provided RNG, so tests can
    /// pin the humor-response choice.
    pub fn with_rng(
        extractor: Box<dyn IngredientExtractor>,
        finder: Box<dyn RecipeFinder>,
        sender: Arc<dyn MessageSender>,
        store: Arc<RecipeStore>,
        current_user: impl Into<String>,
        rng: StdRng,
    ) -> Self {
        DispatchController {
            extractor,
            finder,
            sender,
            store,
            current_user: current_user.into(),
            suggestions: Vec::new(),
            backlog_complete: false,
            rng,
        }
    }

    /// One-way latch out of the replay phase. Before this is called,
    /// arriving messages are acknowledged but never acted on, so a restart
    /// does not reprocess historical attachments.
    pub fn complete_backlog(&mut self) {
        if !self.backlog_complete {
            self.backlog_complete = true;
            info!("backlog replay complete; new messages will be fully processed");
        }
    }

    /// Number of recipes in the current suggestion set.
    pub fn suggestion_count(&self) -> usize {
        self.suggestions.len()
    }

    /// Entry point, invoked once per delivered message in transport order.
    pub async fn handle_message(&mut self, message: &InboundMessage) {
        if message.author == Author::System {
            return;
        }

        if !self.backlog_complete {
            if !message.media.is_empty() {
                debug!(
                    "skipping media download during backlog replay: {}",
                    message.sid
                );
            }
            return;
        }

        if let Some(text) = message.text() {
            self.handle_text(text).await;
        } else if let Some(image) = message.first_image() {
            self.handle_image(image).await;
        }
    }

    async fn handle_text(&mut self, text: &str) {
        match classify(text) {
            MessageKind::Selection(n) => self.handle_selection(n).await,
            MessageKind::Ingredients(clean) => {
                debug!("extracting ingredients from: {clean}");
                match self.extractor.from_text(&clean).await {
                    Ok(ingredients) => self.suggest_recipes(ingredients, false).await,
                    Err(e) => {
                        warn!("ingredient extraction from text failed: {e}");
                        self.send(render::TEXT_PROCESSING_FAILED).await;
                    }
                }
            }
            MessageKind::Unrecognized => self.send(render::GREETING).await,
        }
    }

    async fn handle_image(&mut self, image: &crate::model::MediaRef) {
        let path = match self.sender.fetch_media(image).await {
            Ok(Some(path)) => path,
            Ok(None) => {
                warn!("media {} could not be downloaded", image.sid);
                return;
            }
            Err(e) => {
                warn!("media fetch failed for {}: {e}", image.sid);
                return;
            }
        };

        info!("analyzing image at {}", path.display());
        match self.extractor.from_image(Path::new(&path)).await {
            Ok(ingredients) => self.suggest_recipes(ingredients, true).await,
            Err(e) => {
                warn!("ingredient extraction from image failed: {e}");
                self.send(render::IMAGE_ANALYSIS_FAILED).await;
            }
        }
    }

    /// Validate the extracted list, run the search and publish a fresh
    /// suggestion set. A search failure is logged and answered, never fatal.
    async fn suggest_recipes(&mut self, ingredients: Vec<String>, from_image: bool) {
        if ingredients.len() < 2 {
            debug!("too few ingredients extracted: {ingredients:?}");
            let reply = render::too_few_ingredients(&mut self.rng, from_image);
            self.send(&reply).await;
            return;
        }

        self.send(&render::searching_notice(&ingredients, from_image))
            .await;

        match self.finder.find_detailed(&ingredients, SUGGESTION_COUNT).await {
            Ok(recipes) if recipes.is_empty() => {
                self.send(render::NO_RECIPES_FOUND).await;
            }
            Ok(recipes) => {
                info!("found {} recipe(s) for {ingredients:?}", recipes.len());
                self.suggestions = recipes;
                let reply = render::suggestion_response(&ingredients, &self.suggestions);
                self.send(&reply).await;
            }
            Err(e) => {
                error!("recipe search failed: {e}");
                self.send(render::SEARCH_FAILED).await;
            }
        }
    }

    /// Resolve a 1-based pick against the current suggestion set, persist
    /// it and reply with the full recipe. The store call is best-effort:
    /// a persistence failure is logged but the reply still goes out.
    async fn handle_selection(&mut self, n: usize) {
        if self.suggestions.is_empty() {
            self.send(render::NO_RECENT_SUGGESTIONS).await;
            return;
        }
        if n > self.suggestions.len() {
            self.send(render::SELECTION_OUT_OF_RANGE).await;
            return;
        }

        let recipe = self.suggestions[n - 1].clone();
        if let Err(e) = self.store.save_recipe_for_user(&self.current_user, &recipe) {
            error!("failed to persist selected recipe: {e}");
        }
        self.send(&render::detail_response(&recipe)).await;
    }

    async fn send(&self, body: &str) {
        match self.sender.send(body).await {
            Ok(true) => {}
            Ok(false) => warn!("outbound message was not accepted by the transport"),
            Err(e) => warn!("failed to send message: {e}"),
        }
    }
}
