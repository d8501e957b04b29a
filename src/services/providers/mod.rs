/// Text-generation provider abstraction
///
/// The recommendation flow only needs "send a prompt, get text back". Keeping
/// that behind a trait lets the Gemini client be swapped or stubbed without
/// touching prompt construction or normalization.
use crate::error::AppResult;

pub mod gemini;

pub use gemini::GeminiProvider;

/// Trait for hosted text-generation services
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Sends one prompt and returns the model's text reply verbatim
    ///
    /// Transport, quota and refusal failures surface as `AppError::Upstream`.
    /// No retries.
    async fn generate(&self, prompt: &str) -> AppResult<String>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
