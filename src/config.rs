use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Gemini API key, resolved from `GEMINI_API_KEY` or `GOOGLE_GENAI_API_KEY`
    #[serde(skip_deserializing)]
    pub gemini_api_key: String,

    /// Gemini API base URL
    #[serde(default = "default_gemini_api_url")]
    pub gemini_api_url: String,

    /// Gemini model used for recommendations
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// PostgreSQL database connection URL. Search history is kept in memory when unset.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Firebase project whose ID tokens are accepted. Every request is anonymous when unset.
    #[serde(default)]
    pub firebase_project_id: Option<String>,

    /// JWKS endpoint publishing the Firebase token signing keys
    #[serde(default = "default_firebase_jwks_url")]
    pub firebase_jwks_url: String,

    /// Origins allowed to call the API from a browser
    #[serde(default = "default_cors_allowed_origins")]
    pub cors_allowed_origins: Vec<String>,

    /// Directory of static browser assets served as the fallback route
    #[serde(default)]
    pub static_dir: Option<String>,

    /// Deadline applied to every HTTP request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_gemini_api_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_firebase_jwks_url() -> String {
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com"
        .to_string()
}

fn default_cors_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Both accepted names for the Gemini key; the first non-empty one wins
#[derive(Debug, Deserialize)]
struct ApiKeyVars {
    #[serde(default)]
    gemini_api_key: Option<String>,
    #[serde(default)]
    google_genai_api_key: Option<String>,
}

impl ApiKeyVars {
    fn resolve(self) -> Option<String> {
        self.gemini_api_key
            .filter(|key| !key.is_empty())
            .or_else(|| self.google_genai_api_key.filter(|key| !key.is_empty()))
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from `(NAME, value)` pairs
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars.into_iter().collect();

        let mut config = envy::from_iter::<_, Config>(vars.clone())
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        config.gemini_api_key = envy::from_iter::<_, ApiKeyVars>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?
            .resolve()
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Failed to load config: GEMINI_API_KEY or GOOGLE_GENAI_API_KEY must be set"
                )
            })?;

        Ok(config)
    }
}
