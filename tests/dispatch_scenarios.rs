//! End-to-end dispatcher scenarios over scripted collaborators: no network,
//! no real store file, deterministic RNG.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;

use nutriscan::dispatch::render;
use nutriscan::dispatch::DispatchController;
use nutriscan::error::BotError;
use nutriscan::extractor::IngredientExtractor;
use nutriscan::finder::RecipeFinder;
use nutriscan::model::{Author, InboundMessage, MediaRef, RecipeDetail};
use nutriscan::store::RecipeStore;
use nutriscan::transport::MessageSender;

struct ScriptedExtractor {
    ingredients: Vec<String>,
}

#[async_trait]
impl IngredientExtractor for ScriptedExtractor {
    async fn from_text(&self, _text: &str) -> Result<Vec<String>, BotError> {
        Ok(self.ingredients.clone())
    }

    async fn from_image(&self, _image_path: &Path) -> Result<Vec<String>, BotError> {
        Ok(self.ingredients.clone())
    }
}

struct ScriptedFinder {
    recipes: Vec<RecipeDetail>,
    calls: AtomicUsize,
}

#[async_trait]
impl RecipeFinder for ScriptedFinder {
    async fn find_detailed(
        &self,
        _ingredients: &[String],
        count: usize,
    ) -> Result<Vec<RecipeDetail>, BotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.recipes.iter().take(count).cloned().collect())
    }
}

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<String>>,
}

impl RecordingSender {
    fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, body: &str) -> Result<bool, BotError> {
        self.sent.lock().unwrap().push(body.to_string());
        Ok(true)
    }

    async fn fetch_media(&self, _media: &MediaRef) -> Result<Option<PathBuf>, BotError> {
        Ok(None)
    }
}

const USER: &str = "whatsapp:+491700000000";

fn recipe(name: &str, score: Option<f64>) -> RecipeDetail {
    RecipeDetail {
        name: name.to_string(),
        image_url: format!("https://img.example.com/{name}.jpg"),
        health_score: score,
        source_url: format!("https://recipes.example.com/{name}"),
        video_url: "No video available".to_string(),
        steps: vec!["Chop everything.".to_string(), "Cook it.".to_string()],
        ingredients: vec!["tomatoes".to_string(), "cheese".to_string()],
        nutrition: serde_json::Value::Null,
    }
}

struct Harness {
    controller: DispatchController,
    sender: Arc<RecordingSender>,
    store: Arc<RecipeStore>,
    finder_calls: Arc<ScriptedFinder>,
    _tmp: tempfile::TempDir,
}

fn harness(extracted: Vec<&str>, found: Vec<RecipeDetail>) -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(RecipeStore::new(tmp.path()).unwrap());
    let sender = Arc::new(RecordingSender::default());
    let finder = Arc::new(ScriptedFinder {
        recipes: found,
        calls: AtomicUsize::new(0),
    });

    let mut controller = DispatchController::with_rng(
        Box::new(ScriptedExtractor {
            ingredients: extracted.into_iter().map(String::from).collect(),
        }),
        Box::new(SharedFinder(Arc::clone(&finder))),
        Arc::clone(&sender) as Arc<dyn MessageSender>,
        Arc::clone(&store),
        USER,
        StdRng::seed_from_u64(7),
    );
    controller.complete_backlog();

    Harness {
        controller,
        sender,
        store,
        finder_calls: finder,
        _tmp: tmp,
    }
}

/// Lets the test keep a handle on the finder's call counter while the
/// controller owns the boxed trait object.
struct SharedFinder(Arc<ScriptedFinder>);

#[async_trait]
impl RecipeFinder for SharedFinder {
    async fn find_detailed(
        &self,
        ingredients: &[String],
        count: usize,
    ) -> Result<Vec<RecipeDetail>, BotError> {
        self.0.find_detailed(ingredients, count).await
    }
}

fn text_message(sid: &str, body: &str) -> InboundMessage {
    InboundMessage {
        sid: sid.to_string(),
        author: Author::User,
        body: Some(body.to_string()),
        media: vec![],
    }
}

#[tokio::test]
async fn ingredient_text_produces_numbered_suggestions() {
    let mut h = harness(
        vec!["tomatoes", "cheese", "bread"],
        vec![
            recipe("Bruschetta", Some(75.0)),
            recipe("Caprese", Some(55.0)),
            recipe("Pizza", Some(30.0)),
        ],
    );

    h.controller
        .handle_message(&text_message("IM1", "tomatoes, cheese, bread"))
        .await;

    assert_eq!(h.controller.suggestion_count(), 3);
    let sent = h.sender.messages();
    assert_eq!(sent.len(), 2, "searching notice plus suggestion list");
    assert_eq!(sent[0], "Looking for recipes with your ingredients...");
    assert!(sent[1].contains("*1. Bruschetta*"));
    assert!(sent[1].contains("*2. Caprese*"));
    assert!(sent[1].contains("*3. Pizza*"));
    assert!(sent[1].contains("https://recipes.example.com/Bruschetta"));
}

#[tokio::test]
async fn selection_without_prior_suggestions_is_corrected() {
    let mut h = harness(vec!["tomatoes", "cheese"], vec![]);

    h.controller.handle_message(&text_message("IM1", "1")).await;

    let sent = h.sender.messages();
    assert_eq!(sent, vec![render::NO_RECENT_SUGGESTIONS.to_string()]);
    assert_eq!(h.finder_calls.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn single_ingredient_gets_humor_and_no_search() {
    let mut h = harness(vec!["salt"], vec![recipe("Should Not Appear", None)]);

    h.controller
        .handle_message(&text_message("IM1", "just some salt"))
        .await;

    let sent = h.sender.messages();
    assert_eq!(sent.len(), 1);
    assert!(render::TEXT_HUMOR.iter().any(|humor| sent[0].starts_with(humor)));
    assert!(sent[0].contains("Please provide more ingredients"));
    assert_eq!(h.finder_calls.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.controller.suggestion_count(), 0);
}

#[tokio::test]
async fn selection_out_of_range_is_corrected() {
    let mut h = harness(
        vec!["tomatoes", "cheese"],
        vec![recipe("One", Some(80.0)), recipe("Two", Some(60.0))],
    );

    h.controller
        .handle_message(&text_message("IM1", "tomatoes, cheese"))
        .await;
    assert_eq!(h.controller.suggestion_count(), 2);

    h.controller.handle_message(&text_message("IM2", "3")).await;

    let sent = h.sender.messages();
    assert_eq!(sent.last().unwrap(), render::SELECTION_OUT_OF_RANGE);
}

#[tokio::test]
async fn selection_sends_detail_and_persists_recipe() {
    let mut h = harness(
        vec!["tomatoes", "cheese"],
        vec![recipe("One", Some(80.0)), recipe("Two", Some(60.0))],
    );

    h.controller
        .handle_message(&text_message("IM1", "tomatoes, cheese"))
        .await;
    h.controller
        .handle_message(&text_message("IM2", "choose 2"))
        .await;

    let sent = h.sender.messages();
    let detail = sent.last().unwrap();
    assert!(detail.contains("🍲 *Two*"));
    assert!(detail.contains("saved to your profile"));

    let profile = h.store.user_profile(USER).expect("profile created on save");
    assert_eq!(profile.saved_recipes.len(), 1);
    assert_eq!(profile.saved_recipes[0].recipe.name, "Two");
}

#[tokio::test]
async fn empty_search_results_get_apology() {
    let mut h = harness(vec!["tomatoes", "cheese"], vec![]);

    h.controller
        .handle_message(&text_message("IM1", "tomatoes, cheese"))
        .await;

    let sent = h.sender.messages();
    assert_eq!(sent.last().unwrap(), render::NO_RECIPES_FOUND);
    assert_eq!(h.controller.suggestion_count(), 0);
}

#[tokio::test]
async fn new_search_overwrites_suggestion_set() {
    let mut h = harness(
        vec!["tomatoes", "cheese"],
        vec![recipe("First", Some(50.0))],
    );

    h.controller
        .handle_message(&text_message("IM1", "tomatoes, cheese"))
        .await;
    assert_eq!(h.controller.suggestion_count(), 1);

    h.controller
        .handle_message(&text_message("IM2", "eggs, flour"))
        .await;
    assert_eq!(h.controller.suggestion_count(), 1);

    // The selection resolves against the latest set.
    h.controller.handle_message(&text_message("IM3", "1")).await;
    let sent = h.sender.messages();
    assert!(sent.last().unwrap().contains("🍲 *First*"));
}

#[tokio::test]
async fn single_word_gets_greeting() {
    let mut h = harness(vec!["tomatoes", "cheese"], vec![]);

    h.controller
        .handle_message(&text_message("IM1", "hello"))
        .await;

    assert_eq!(h.sender.messages(), vec![render::GREETING.to_string()]);
}

#[tokio::test]
async fn system_messages_are_ignored() {
    let mut h = harness(vec!["tomatoes", "cheese"], vec![recipe("One", None)]);

    let mut msg = text_message("IM1", "tomatoes, cheese");
    msg.author = Author::System;
    h.controller.handle_message(&msg).await;

    assert!(h.sender.messages().is_empty());
    assert_eq!(h.finder_calls.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn backlog_messages_are_acknowledged_but_not_processed() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(RecipeStore::new(tmp.path()).unwrap());
    let sender = Arc::new(RecordingSender::default());

    // No complete_backlog() call: the controller is still replaying.
    let mut controller = DispatchController::with_rng(
        Box::new(ScriptedExtractor {
            ingredients: vec!["tomatoes".to_string(), "cheese".to_string()],
        }),
        Box::new(ScriptedFinder {
            recipes: vec![recipe("One", None)],
            calls: AtomicUsize::new(0),
        }),
        Arc::clone(&sender) as Arc<dyn MessageSender>,
        store,
        USER,
        StdRng::seed_from_u64(7),
    );

    controller
        .handle_message(&text_message("IM1", "tomatoes, cheese"))
        .await;
    assert!(sender.messages().is_empty());

    // The latch is one-way: after it, the same text is processed.
    controller.complete_backlog();
    controller
        .handle_message(&text_message("IM2", "tomatoes, cheese"))
        .await;
    assert!(!sender.messages().is_empty());
}
