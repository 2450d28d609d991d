//! NutriScan: a WhatsApp food-recipe assistant.
//!
//! Users send an ingredient list or a photo of their fridge; the bot
//! extracts ingredients with an OpenAI vision/text model, searches
//! Spoonacular for matching recipes and replies with up to three numbered
//! suggestions. Replying with a number returns the full recipe and saves
//! it to the user's profile, which a small read-only web page renders.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod extractor;
pub mod finder;
pub mod model;
pub mod store;
pub mod transport;
pub mod viewer;

pub use config::AppConfig;
pub use dispatch::{classify, DispatchController, MessageKind};
pub use error::BotError;
pub use extractor::{IngredientExtractor, OpenAiExtractor};
pub use finder::{RecipeFinder, SpoonacularFinder};
pub use model::{Author, InboundMessage, MediaRef, RecipeDetail, SavedRecipe, UserProfile};
pub use store::RecipeStore;
pub use transport::{MessageSender, TwilioTransport};
