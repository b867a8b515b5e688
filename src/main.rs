use dotenvy::dotenv;
use tracing::{info, warn};

mod art;
mod config;
mod error;
mod handlers;
mod llm;
mod server;
mod state;
mod therapy;
mod utils;

#[cfg(test)]
mod test_support;

use config::Config;
use state::AppState;
use utils::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Config::load()?;
    let _guards = init_logging(&config);

    if config.openai_api_key.trim().is_empty() {
        warn!("OPENAI_API_KEY is not set; question, image and reappraisal calls will fail.");
    }
    info!(
        "Starting Mind Palette (completion model={}, image model={}, image size={})",
        config.completion_model, config.image_model, config.image_size
    );

    let state = AppState::new(config)?;
    server::serve(state).await
}
