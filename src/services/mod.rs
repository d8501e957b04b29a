pub mod identity;
pub mod normalizer;
pub mod providers;
pub mod recommendations;

pub use identity::{FirebaseVerifier, Identity, IdentityVerifier};
pub use providers::{GeminiProvider, GenerationProvider};
pub use recommendations::RecommendationService;
