//! Read-only web page listing the configured user's saved recipes. Shares
//! nothing with the dispatcher except the on-disk store file, which is
//! re-read on every request.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use html_escape::encode_text;
use log::info;

use crate::error::BotError;
use crate::model::SavedRecipe;
use crate::store::RecipeStore;

#[derive(Clone)]
struct ViewerState {
    store: Arc<RecipeStore>,
    user: String,
}

pub fn router(store: Arc<RecipeStore>, user: String) -> Router {
    Router::new()
        .route("/", get(index))
        .with_state(ViewerState { store, user })
}

/// Serve the viewer until the process exits.
pub async fn serve(store: Arc<RecipeStore>, user: String, port: u16) -> Result<(), BotError> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("recipe viewer listening on http://0.0.0.0:{port}");
    axum::serve(listener, router(store, user)).await?;
    Ok(())
}

async fn index(State(state): State<ViewerState>) -> Html<String> {
    let recipes = state
        .store
        .user_profile(&state.user)
        .map(|profile| profile.saved_recipes)
        .unwrap_or_default();
    Html(render_page(&recipes))
}

fn render_page(recipes: &[SavedRecipe]) -> String {
    let mut body = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>NutriScan - Saved Recipes</title>\n</head>\n<body>\n\
         <h1>Saved Recipes</h1>\n",
    );

    if recipes.is_empty() {
        body.push_str("<p>No recipes saved yet. Send some ingredients over WhatsApp!</p>\n");
    } else {
        body.push_str("<ul>\n");
        for saved in recipes {
            let score = saved
                .recipe
                .health_score
                .map(|s| format!("{s}/100"))
                .unwrap_or_else(|| "N/A".to_string());
            body.push_str(&format!(
                "<li><a href=\"{}\">{}</a> &mdash; health score {} &mdash; saved {}</li>\n",
                encode_text(&saved.recipe.source_url),
                encode_text(&saved.recipe.name),
                score,
                saved.saved_at.format("%Y-%m-%d %H:%M"),
            ));
        }
        body.push_str("</ul>\n");
    }

    body.push_str("</body>\n</html>\n");
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecipeDetail;
    use chrono::Utc;

    fn saved(name: &str) -> SavedRecipe {
        SavedRecipe {
            recipe: RecipeDetail {
                name: name.to_string(),
                image_url: String::new(),
                health_score: Some(55.0),
                source_url: "https://example.com/r".to_string(),
                video_url: "No video available".to_string(),
                steps: vec![],
                ingredients: vec![],
                nutrition: serde_json::Value::Null,
            },
            saved_at: Utc::now(),
        }
    }

    #[test]
    fn renders_empty_state() {
        let page = render_page(&[]);
        assert!(page.contains("No recipes saved yet"));
    }

    #[test]
    fn escapes_recipe_names() {
        let page = render_page(&[saved("Chili <con> Carne & Friends")]);
        assert!(page.contains("Chili &lt;con&gt; Carne &amp; Friends"));
        assert!(page.contains("55/100"));
    }
}
