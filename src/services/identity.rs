/// Caller identity resolution
///
/// Authentication is optional everywhere except the history endpoint. A
/// missing, malformed or rejected token degrades to [`Identity::Anonymous`]
/// instead of failing the request.
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, decode_header, errors::ErrorKind, jwk::JwkSet, Algorithm, DecodingKey, Validation,
};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};

const FIREBASE_ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const MIN_KEY_CACHE_TTL_SECS: i64 = 300;
const DEFAULT_KEY_CACHE_TTL_SECS: i64 = 3600;
/// Unknown key ids trigger at most one key fetch per interval
const MIN_KEY_REFRESH_INTERVAL_SECS: i64 = 60;

/// Who is making the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Authenticated { uid: String, name: Option<String> },
    Anonymous,
}

impl Identity {
    pub fn uid(&self) -> Option<&str> {
        match self {
            Identity::Authenticated { uid, .. } => Some(uid),
            Identity::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated { .. })
    }
}

/// User details taken from a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedUser {
    pub uid: String,
    pub name: Option<String>,
}

/// Trait for identity providers that validate bearer tokens
#[async_trait::async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> AppResult<VerifiedUser>;

    /// Verifier name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Token part of an `Authorization: Bearer <token>` header value
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves the caller from an optional `Authorization` header value
///
/// Never fails: anything short of a verified token is anonymous.
pub async fn resolve_identity(
    verifier: Option<&dyn IdentityVerifier>,
    authorization: Option<&str>,
) -> Identity {
    let Some(verifier) = verifier else {
        return Identity::Anonymous;
    };

    let Some(token) = authorization.and_then(bearer_token) else {
        return Identity::Anonymous;
    };

    match verifier.verify(token).await {
        Ok(user) => Identity::Authenticated {
            uid: user.uid,
            name: user.name,
        },
        Err(e) => {
            tracing::warn!(
                error = %e,
                verifier = verifier.name(),
                "Token verification failed, continuing unauthenticated"
            );
            Identity::Anonymous
        }
    }
}

/// Claims read from a Firebase ID token
#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    #[serde(default)]
    name: Option<String>,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Verifies Firebase ID tokens against Google's published signing keys
pub struct FirebaseVerifier {
    http_client: HttpClient,
    project_id: String,
    jwks_url: String,
    cached_keys: RwLock<Option<CachedKeys>>,
}

impl FirebaseVerifier {
    pub fn new(project_id: String, jwks_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            project_id,
            jwks_url,
            cached_keys: RwLock::new(None),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[format!("{}{}", FIREBASE_ISSUER_PREFIX, self.project_id)]);
        validation
    }

    /// Decoding key for `kid`, refreshing the key set once when it is stale or
    /// does not know the key yet
    async fn decoding_key(&self, kid: &str) -> AppResult<DecodingKey> {
        if let Some(key) = self.cached_key(kid).await? {
            return Ok(key);
        }

        if self.refreshed_recently().await {
            return Err(AppError::Unauthorized(format!(
                "Unknown token signing key {}",
                kid
            )));
        }

        self.refresh_keys().await?;

        self.cached_key(kid)
            .await?
            .ok_or_else(|| AppError::Unauthorized(format!("Unknown token signing key {}", kid)))
    }

    async fn cached_key(&self, kid: &str) -> AppResult<Option<DecodingKey>> {
        let cache = self.cached_keys.read().await;
        let Some(cached) = cache.as_ref().filter(|c| c.expires_at > Utc::now()) else {
            return Ok(None);
        };

        cached
            .keys
            .find(kid)
            .map(|jwk| {
                DecodingKey::from_jwk(jwk)
                    .map_err(|e| AppError::Internal(format!("Invalid signing key {}: {}", kid, e)))
            })
            .transpose()
    }

    /// True while the cached key set is fresh and was fetched within the
    /// refresh interval
    async fn refreshed_recently(&self) -> bool {
        let now = Utc::now();
        self.cached_keys.read().await.as_ref().is_some_and(|cached| {
            cached.expires_at > now
                && now - cached.fetched_at < Duration::seconds(MIN_KEY_REFRESH_INTERVAL_SECS)
        })
    }

    async fn refresh_keys(&self) -> AppResult<()> {
        tracing::info!(url = %self.jwks_url, "Fetching Firebase signing keys");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to fetch signing keys: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "Signing key endpoint returned status {}",
                response.status()
            )));
        }

        let ttl = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_KEY_CACHE_TTL_SECS)
            .max(MIN_KEY_CACHE_TTL_SECS);

        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse signing keys: {}", e)))?;

        let fetched_at = Utc::now();
        let expires_at = fetched_at + Duration::seconds(ttl);
        tracing::info!(
            keys = keys.keys.len(),
            ttl_secs = ttl,
            expires_at = %expires_at,
            "Firebase signing keys cached"
        );

        *self.cached_keys.write().await = Some(CachedKeys {
            keys,
            fetched_at,
            expires_at,
        });
        Ok(())
    }
}

#[async_trait::async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> AppResult<VerifiedUser> {
        let header = decode_header(token)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token header: {}", e)))?;

        let kid = header
            .kid
            .ok_or_else(|| AppError::Unauthorized("Token missing key ID".to_string()))?;

        let key = self.decoding_key(&kid).await?;

        let data = decode::<FirebaseClaims>(token, &key, &self.validation()).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "Token expired".to_string(),
                ErrorKind::InvalidAudience => "Invalid token audience".to_string(),
                ErrorKind::InvalidIssuer => "Invalid token issuer".to_string(),
                _ => format!("Invalid token: {}", e),
            };
            AppError::Unauthorized(reason)
        })?;

        tracing::debug!(user_id = %data.claims.sub, "Firebase token verified");

        Ok(VerifiedUser {
            uid: data.claims.sub,
            name: data.claims.name,
        })
    }

    fn name(&self) -> &'static str {
        "firebase"
    }
}

/// Parses max-age from a Cache-Control header
///
/// Example: "public, max-age=19845, must-revalidate" -> 19845
fn parse_max_age(cache_control: &str) -> Option<i64> {
    cache_control
        .split(',')
        .map(str::trim)
        .find_map(|directive| directive.strip_prefix("max-age="))
        .and_then(|secs| secs.parse().ok())
}
