use std::sync::Arc;

use log::{error, info};

use nutriscan::config::AppConfig;
use nutriscan::dispatch::DispatchController;
use nutriscan::extractor::OpenAiExtractor;
use nutriscan::finder::SpoonacularFinder;
use nutriscan::store::RecipeStore;
use nutriscan::transport::{self, MessageSender, TwilioTransport};
use nutriscan::viewer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = AppConfig::load()?;
    info!("starting NutriScan for {}", config.twilio.user_whatsapp);

    let store = Arc::new(RecipeStore::new(&config.storage.data_dir)?);
    let extractor = OpenAiExtractor::new(&config.openai)?;
    let finder = SpoonacularFinder::new(&config.spoonacular)?;

    let mut twilio = TwilioTransport::new(&config.twilio, &config.storage.img_dir)?;
    twilio.setup_conversation().await?;
    let twilio = Arc::new(twilio);

    if config.viewer.enabled {
        let store = Arc::clone(&store);
        let user = config.twilio.user_whatsapp.clone();
        let port = config.viewer.port;
        tokio::spawn(async move {
            if let Err(e) = viewer::serve(store, user, port).await {
                error!("recipe viewer stopped: {e}");
            }
        });
    }

    let sender: Arc<dyn MessageSender> = twilio.clone();
    let mut controller = DispatchController::new(
        Box::new(extractor),
        Box::new(finder),
        sender,
        Arc::clone(&store),
        config.twilio.user_whatsapp.clone(),
    );

    tokio::select! {
        result = transport::run(&twilio, &mut controller, &config.poll) => {
            if let Err(e) = result {
                error!("message loop ended: {e}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted; shutting down");
        }
    }

    Ok(())
}
