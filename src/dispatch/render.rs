//! Outbound message rendering. Everything here is a pure function of its
//! inputs except the humor pickers, which take the caller's RNG so tests
//! can pin a seed.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::model::RecipeDetail;

/// How many suggestions a search produces and how many a reply may pick from.
pub const SUGGESTION_COUNT: usize = 3;

/// How many ingredient names the suggestion list previews per recipe.
const INGREDIENT_PREVIEW: usize = 5;

/// How many preparation steps the detail response includes.
const STEP_LIMIT: usize = 10;

pub const GREETING: &str = "Hello! Send me a photo of your refrigerator or a list of ingredients \
     (e.g., 'tomatoes, cheese, chicken'), and I'll suggest matching recipes for you.";

pub const NO_RECIPES_FOUND: &str = "I couldn't find any recipes with these ingredients. \
     Try different ingredients or add more items to your list.";

pub const SEARCH_FAILED: &str = "I had trouble finding recipes. Please try again later.";

pub const TEXT_PROCESSING_FAILED: &str = "I had trouble processing your message. \
     Please try again with a clear list of ingredients.";

pub const IMAGE_ANALYSIS_FAILED: &str =
    "I encountered an error analyzing your image. Please try again later.";

pub const NO_RECENT_SUGGESTIONS: &str =
    "I don't have any recent recipe suggestions. Please send me ingredients first.";

pub const SELECTION_OUT_OF_RANGE: &str =
    "Sorry, I couldn't find that recipe. Please select from the options provided (1-3).";

/// Replies when a photo yielded too few ingredients.
pub const IMAGE_HUMOR: &[&str] = &[
    "I'm looking for food ingredients, but my recipe radar isn't picking up much. 🔍",
    "Hmm, I don't see anything I can turn into a delicious meal there. 🤔",
    "My recipe powers are strong, but I need actual ingredients to work with! ✨",
    "I'm great at suggesting recipes, but even I can't cook with what I'm seeing here. 🍳",
    "I searched high and low but couldn't find enough ingredients to work with. 🧐",
    "That's an interesting image, but I don't think it belongs in a recipe! 😄",
    "I'm a foodie at heart, but I need actual food ingredients to suggest recipes. 🥗",
];

/// Replies when a text yielded too few ingredients.
pub const TEXT_HUMOR: &[&str] = &[
    "I need a bit more to work with to create something delicious! 🍽️",
    "My recipe creativity needs at least a few ingredients to spark. ✨",
    "I'm afraid that's not enough for me to suggest something tasty. 😊",
    "Even master chefs need more than that to make a proper meal! 👨‍🍳",
    "I could suggest recipes with more ingredients - one or two just isn't enough. 🥄",
];

const IMAGE_RESEND_HINT: &str = "Please send a photo of food ingredients or list them in a \
     text message like 'tomatoes, chicken, pasta'.";

const TEXT_RESEND_HINT: &str = "Please provide more ingredients (at least 2-3) separated by \
     commas, like 'chicken, rice, carrots'.";

/// A randomized "not enough ingredients" reply plus the resend instruction.
pub fn too_few_ingredients<R: Rng>(rng: &mut R, from_image: bool) -> String {
    let (pool, hint) = if from_image {
        (IMAGE_HUMOR, IMAGE_RESEND_HINT)
    } else {
        (TEXT_HUMOR, TEXT_RESEND_HINT)
    };
    let humor = pool.choose(rng).copied().unwrap_or(pool[0]);
    format!("{humor}\n\n{hint}")
}

/// Interim notice sent before the recipe search starts.
pub fn searching_notice(ingredients: &[String], from_image: bool) -> String {
    if from_image {
        format!(
            "I found these ingredients: {}\n\nLooking for recipes now...",
            ingredients.join(", ")
        )
    } else {
        "Looking for recipes with your ingredients...".to_string()
    }
}

fn health_emoji(score: Option<f64>) -> &'static str {
    match score {
        Some(s) if s > 70.0 => "🟢",
        Some(s) if s > 40.0 => "🟡",
        Some(_) => "🟠",
        None => "⚪",
    }
}

fn health_score_text(score: Option<f64>) -> String {
    match score {
        Some(s) => format!("{s}/100"),
        None => "N/A".to_string(),
    }
}

/// The numbered suggestion list. Position in `recipes` is the 1-based
/// index later selection replies resolve against.
pub fn suggestion_response(ingredients: &[String], recipes: &[RecipeDetail]) -> String {
    let mut response = format!(
        "📋 *Ingredients found:*\n{}\n\n",
        ingredients.join(", ")
    );
    response.push_str("🍽️ *Here are 3 recipe suggestions for you:*\n\n");

    for (i, recipe) in recipes.iter().enumerate() {
        response.push_str(&format!(
            "*{}. {}* {}\n",
            i + 1,
            recipe.name,
            health_emoji(recipe.health_score)
        ));
        response.push_str(&format!(
            "   Health Score: {}\n",
            health_score_text(recipe.health_score)
        ));

        if !recipe.ingredients.is_empty() {
            let preview: Vec<&str> = recipe
                .ingredients
                .iter()
                .take(INGREDIENT_PREVIEW)
                .map(String::as_str)
                .collect();
            response.push_str(&format!("   Contains: {}", preview.join(", ")));
            if recipe.ingredients.len() > INGREDIENT_PREVIEW {
                response.push_str(&format!(
                    " and {} more ingredients",
                    recipe.ingredients.len() - INGREDIENT_PREVIEW
                ));
            }
            response.push('\n');
        }

        response.push_str(&format!("   🔗 {}\n\n", recipe.source_url));
    }

    response.push_str(
        "To see detailed instructions for a recipe, reply with the number (1, 2, or 3).\n",
    );
    response.push_str("Or send another photo or list of ingredients for new suggestions! 🍳");
    response
}

/// The full recipe, sent after a selection was persisted.
pub fn detail_response(recipe: &RecipeDetail) -> String {
    let mut response = format!("🍲 *{}*\n\n", recipe.name);
    response.push_str(&format!(
        "Health Score: {}\n\n",
        health_score_text(recipe.health_score)
    ));

    response.push_str("*Ingredients:*\n");
    for ingredient in &recipe.ingredients {
        response.push_str(&format!("• {ingredient}\n"));
    }
    response.push('\n');

    if !recipe.steps.is_empty() {
        response.push_str("*Instructions:*\n");
        for (i, step) in recipe.steps.iter().take(STEP_LIMIT).enumerate() {
            response.push_str(&format!("{}. {}\n", i + 1, step));
        }
        if recipe.steps.len() > STEP_LIMIT {
            response.push_str("...\n");
        }
    }

    response.push_str("\n*🔗 RECIPE LINK:*\n");
    response.push_str(&format!("{}\n\n", recipe.source_url));
    response.push_str("✅ This recipe has been saved to your profile!\n\n");
    response.push_str(
        "Want to try another recipe? Send me new ingredients or a photo of your fridge! 🥗",
    );
    response
}
