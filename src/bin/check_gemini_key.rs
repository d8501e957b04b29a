//! Sends a trivial prompt to Gemini with the configured key and model.
//!
//! Exits non-zero when the key is rejected or the service is unreachable.

use mood2movie_api::{
    config::Config,
    services::{GeminiProvider, GenerationProvider},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CHECK_PROMPT: &str = r#"Respond with "API key is working!" if you receive this message."#;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mood2movie_api=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let provider = GeminiProvider::new(
        config.gemini_api_key,
        config.gemini_api_url,
        config.gemini_model.clone(),
    );

    println!("Testing Gemini API key with model {}...", config.gemini_model);

    match provider.generate(CHECK_PROMPT).await {
        Ok(reply) => {
            println!("API Response: {}", reply.trim());
            println!("Success! The Gemini API key is valid and working.");
        }
        Err(e) => {
            eprintln!("Error testing API key: {}", e);
            std::process::exit(1);
        }
    }
}
