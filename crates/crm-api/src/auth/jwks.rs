//! Bearer token verification with JWKS key discovery
//!
//! [`TokenVerifier`] owns its key cache explicitly. Keys come from a
//! [`KeySource`]: a remote JWKS endpoint (e.g. a Cognito user pool), the
//! local identity provider, or both. The cache refreshes either on a miss or
//! when its TTL elapses, per [`CachePolicy`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use crm_core::models::{Claims, Jwk, Jwks, TokenClaims};
use crm_core::AppError;
use crm_services::LocalIdentityProvider;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use tokio::sync::RwLock;

const KEY_NOT_FOUND: &str = "Public key not found in JWKS";
const INVALID_CREDENTIALS: &str = "Could not validate credentials";

/// Supplies the current key set.
#[async_trait::async_trait]
pub trait KeySource: Send + Sync {
    async fn fetch(&self) -> Result<Jwks, AppError>;
}

/// A JWKS document served over HTTP
pub struct HttpKeySource {
    url: String,
    client: reqwest::Client,
}

impl HttpKeySource {
    pub fn new(url: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build JWKS client: {}", e)))?;
        Ok(Self { url, client })
    }
}

#[async_trait::async_trait]
impl KeySource for HttpKeySource {
    #[tracing::instrument(skip(self), fields(jwks.url = %self.url))]
    async fn fetch(&self) -> Result<Jwks, AppError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AppError::IdentityBackend(format!("Failed to fetch JWKS: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::IdentityBackend(format!(
                "JWKS endpoint returned error: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::IdentityBackend(format!("Failed to parse JWKS: {}", e)))
    }
}

/// Keys of tokens issued in-process. Never served over HTTP.
#[async_trait::async_trait]
impl KeySource for LocalIdentityProvider {
    async fn fetch(&self) -> Result<Jwks, AppError> {
        Ok(self.jwks())
    }
}

/// Union of several sources, e.g. an external user pool alongside local tokens.
///
/// A failing source is skipped; the fetch fails only when every source does.
pub struct ChainedKeySource(pub Vec<Arc<dyn KeySource>>);

#[async_trait::async_trait]
impl KeySource for ChainedKeySource {
    async fn fetch(&self) -> Result<Jwks, AppError> {
        let mut keys = Vec::new();
        let mut last_error = None;
        for source in &self.0 {
            match source.fetch().await {
                Ok(jwks) => keys.extend(jwks.keys),
                Err(e) => {
                    tracing::warn!(error = %e, "Key source unavailable");
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) if keys.is_empty() => Err(e),
            _ => Ok(Jwks { keys }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Refresh only when a token names an unknown key id
    OnMiss,
    /// Refresh when the cached set is older than the TTL, and on a miss
    Ttl(Duration),
}

impl CachePolicy {
    pub fn from_ttl_seconds(ttl: Option<u64>) -> Self {
        match ttl {
            Some(seconds) => CachePolicy::Ttl(Duration::from_secs(seconds)),
            None => CachePolicy::OnMiss,
        }
    }
}

#[derive(Clone)]
struct CachedKey {
    key: DecodingKey,
    algorithm: Algorithm,
}

#[derive(Default)]
struct KeyCache {
    keys: HashMap<String, CachedKey>,
    /// Key used for tokens without a `kid`: the first key of the set
    first: Option<String>,
    fetched_at: Option<DateTime<Utc>>,
}

impl KeyCache {
    fn lookup(&self, kid: Option<&str>) -> Option<CachedKey> {
        let kid = kid.or(self.first.as_deref())?;
        self.keys.get(kid).cloned()
    }

    fn is_stale(&self, policy: CachePolicy) -> bool {
        match (policy, self.fetched_at) {
            (_, None) => true,
            (CachePolicy::OnMiss, Some(_)) => false,
            (CachePolicy::Ttl(ttl), Some(fetched_at)) => {
                let age = Utc::now().signed_duration_since(fetched_at);
                age.to_std().map(|age| age >= ttl).unwrap_or(false)
            }
        }
    }
}

pub struct TokenVerifier {
    source: Arc<dyn KeySource>,
    policy: CachePolicy,
    cache: RwLock<KeyCache>,
    audience: Option<String>,
    issuer: Option<String>,
}

impl TokenVerifier {
    pub fn new(source: Arc<dyn KeySource>, policy: CachePolicy) -> Self {
        Self {
            source,
            policy,
            cache: RwLock::new(KeyCache::default()),
            audience: None,
            issuer: None,
        }
    }

    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    /// Verify signature and expiry, then extract the claims.
    pub async fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        let header = decode_header(token).map_err(|e| {
            tracing::debug!(error = %e, "Invalid token header");
            AppError::Unauthorized(INVALID_CREDENTIALS.to_string())
        })?;

        let cached = self.decoding_key(header.kid.as_deref()).await?;
        if cached.algorithm != header.alg {
            tracing::debug!(alg = ?header.alg, "Token algorithm does not match its key");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let mut validation = Validation::new(cached.algorithm);
        validation.leeway = 0;
        validation.validate_nbf = true;
        // A configured audience or issuer must be present, not merely match when present
        let mut required = vec!["exp"];
        match &self.audience {
            Some(audience) => {
                validation.set_audience(&[audience]);
                required.push("aud");
            }
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
            required.push("iss");
        }
        validation.set_required_spec_claims(&required);

        let data = decode::<TokenClaims>(token, &cached.key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "Token validation failed");
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AppError::InvalidSignature,
                _ => AppError::Unauthorized(INVALID_CREDENTIALS.to_string()),
            }
        })?;

        Claims::try_from(data.claims)
    }

    /// Cached key for `kid`, refreshing at most once per call.
    async fn decoding_key(&self, kid: Option<&str>) -> Result<CachedKey, AppError> {
        {
            let cache = self.cache.read().await;
            if !cache.is_stale(self.policy) {
                if let Some(key) = cache.lookup(kid) {
                    return Ok(key);
                }
            }
        }

        self.refresh().await?;

        self.cache
            .read()
            .await
            .lookup(kid)
            .ok_or_else(|| AppError::Unauthorized(KEY_NOT_FOUND.to_string()))
    }

    async fn refresh(&self) -> Result<(), AppError> {
        let jwks = self.source.fetch().await?;

        let mut keys = HashMap::new();
        let mut first = None;
        for jwk in &jwks.keys {
            let kid = jwk.key_id.clone().unwrap_or_else(|| "default".to_string());
            match jwk_to_decoding_key(jwk) {
                Ok(cached) => {
                    first.get_or_insert_with(|| kid.clone());
                    keys.insert(kid, cached);
                }
                Err(e) => tracing::warn!(kid = %kid, error = %e, "Skipping unusable JWKS key"),
            }
        }

        tracing::debug!(keys = keys.len(), "Refreshed signing keys");
        *self.cache.write().await = KeyCache {
            keys,
            first,
            fetched_at: Some(Utc::now()),
        };
        Ok(())
    }
}

/// Convert a JWK into a decoding key and the single algorithm it may verify.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<CachedKey, AppError> {
    let missing = |what: &str| AppError::Unauthorized(format!("JWK missing {}", what));

    let (key, default_alg) = match jwk.key_type.as_str() {
        "RSA" => {
            let n = jwk.modulus.as_deref().ok_or_else(|| missing("modulus"))?;
            let e = jwk.exponent.as_deref().ok_or_else(|| missing("exponent"))?;
            let key = DecodingKey::from_rsa_components(n, e)
                .map_err(|e| AppError::Unauthorized(format!("Failed to create RSA key: {}", e)))?;
            (key, Algorithm::RS256)
        }
        "EC" => {
            let x = jwk.x_coordinate.as_deref().ok_or_else(|| missing("x coordinate"))?;
            let y = jwk.y_coordinate.as_deref().ok_or_else(|| missing("y coordinate"))?;
            let curve = jwk.curve.as_deref().ok_or_else(|| missing("curve"))?;
            if curve != "P-256" {
                return Err(AppError::Unauthorized(format!(
                    "Unsupported EC curve: {} (only P-256 is supported)",
                    curve
                )));
            }
            let key = DecodingKey::from_ec_components(x, y)
                .map_err(|e| AppError::Unauthorized(format!("Failed to create EC key: {}", e)))?;
            (key, Algorithm::ES256)
        }
        "oct" => {
            let k = jwk.secret.as_deref().ok_or_else(|| missing("secret"))?;
            let secret = URL_SAFE_NO_PAD
                .decode(k)
                .map_err(|e| AppError::Unauthorized(format!("Invalid oct key: {}", e)))?;
            (DecodingKey::from_secret(&secret), Algorithm::HS256)
        }
        other => {
            return Err(AppError::Unauthorized(format!(
                "Unsupported key type: {}",
                other
            )))
        }
    };

    let algorithm = match jwk.algorithm.as_deref() {
        None => default_alg,
        Some(alg) if alg == format!("{:?}", default_alg) => default_alg,
        Some(alg) => {
            return Err(AppError::Unauthorized(format!(
                "Unsupported algorithm {} for {} key",
                alg, jwk.key_type
            )))
        }
    };

    Ok(CachedKey { key, algorithm })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const SECRET: &[u8] = b"verifier-test-secret-0123456789abcdef";

    /// Serves a mutable key set and counts fetches.
    struct StaticSource {
        jwks: Mutex<Jwks>,
        fetches: AtomicUsize,
    }

    impl StaticSource {
        fn new(keys: Vec<Jwk>) -> Arc<Self> {
            Arc::new(Self {
                jwks: Mutex::new(Jwks { keys }),
                fetches: AtomicUsize::new(0),
            })
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl KeySource for StaticSource {
        async fn fetch(&self) -> Result<Jwks, AppError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.jwks.lock().unwrap().clone())
        }
    }

    fn oct(kid: &str, secret: &[u8]) -> Jwk {
        Jwk {
            key_type: "oct".to_string(),
            key_id: Some(kid.to_string()),
            algorithm: Some("HS256".to_string()),
            secret: Some(URL_SAFE_NO_PAD.encode(secret)),
            ..Default::default()
        }
    }

    fn claims(exp_offset_secs: i64) -> TokenClaims {
        let now = Utc::now().timestamp();
        TokenClaims {
            sub: "user-1".to_string(),
            email: Some("ada@example.com".to_string()),
            tenant_id: Some("tenant-1".to_string()),
            role: Some("admin".to_string()),
            is_active: Some(serde_json::Value::String("true".to_string())),
            session: None,
            exp: now + exp_offset_secs,
            iat: now,
            iss: None,
            aud: None,
        }
    }

    fn token(kid: &str, secret: &[u8], claims: &TokenClaims) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(kid.to_string());
        encode(&header, claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_yields_claims() {
        let source = StaticSource::new(vec![oct("k1", SECRET)]);
        let verifier = TokenVerifier::new(source.clone(), CachePolicy::OnMiss);

        let verified = verifier
            .verify_token(&token("k1", SECRET, &claims(300)))
            .await
            .unwrap();
        assert_eq!(verified.user_id, "user-1");
        assert_eq!(verified.tenant_id, "tenant-1");

        verifier
            .verify_token(&token("k1", SECRET, &claims(300)))
            .await
            .unwrap();
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test]
    async fn test_expired_token_with_valid_signature() {
        let verifier =
            TokenVerifier::new(StaticSource::new(vec![oct("k1", SECRET)]), CachePolicy::OnMiss);
        let err = verifier
            .verify_token(&token("k1", SECRET, &claims(-60)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TokenExpired));
    }

    #[tokio::test]
    async fn test_wrong_secret_is_invalid_signature() {
        let verifier =
            TokenVerifier::new(StaticSource::new(vec![oct("k1", SECRET)]), CachePolicy::OnMiss);
        let err = verifier
            .verify_token(&token("k1", b"some-other-secret-entirely-000000", &claims(300)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidSignature));
    }

    #[tokio::test]
    async fn test_unknown_kid_refreshes_once_then_fails() {
        let source = StaticSource::new(vec![oct("k1", SECRET)]);
        let verifier = TokenVerifier::new(source.clone(), CachePolicy::OnMiss);
        verifier
            .verify_token(&token("k1", SECRET, &claims(300)))
            .await
            .unwrap();

        let err = verifier
            .verify_token(&token("k2", SECRET, &claims(300)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == KEY_NOT_FOUND));
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_rotated_key_is_picked_up_on_miss() {
        let source = StaticSource::new(vec![oct("k1", SECRET)]);
        let verifier = TokenVerifier::new(source.clone(), CachePolicy::OnMiss);
        verifier
            .verify_token(&token("k1", SECRET, &claims(300)))
            .await
            .unwrap();

        let rotated = b"rotated-secret-0123456789abcdefghij";
        *source.jwks.lock().unwrap() = Jwks {
            keys: vec![oct("k2", rotated)],
        };
        assert!(verifier
            .verify_token(&token("k2", rotated, &claims(300)))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_ttl_policy_refetches_stale_keys() {
        let source = StaticSource::new(vec![oct("k1", SECRET)]);
        let verifier = TokenVerifier::new(source.clone(), CachePolicy::Ttl(Duration::ZERO));
        for _ in 0..2 {
            verifier
                .verify_token(&token("k1", SECRET, &claims(300)))
                .await
                .unwrap();
        }
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_algorithm_must_match_key() {
        let verifier =
            TokenVerifier::new(StaticSource::new(vec![oct("k1", SECRET)]), CachePolicy::OnMiss);
        let mut header = Header::new(Algorithm::HS384);
        header.kid = Some("k1".to_string());
        let forged = encode(&header, &claims(300), &EncodingKey::from_secret(SECRET)).unwrap();
        assert!(matches!(
            verifier.verify_token(&forged).await.unwrap_err(),
            AppError::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn test_audience_is_enforced_when_configured() {
        let verifier =
            TokenVerifier::new(StaticSource::new(vec![oct("k1", SECRET)]), CachePolicy::OnMiss)
                .with_audience(Some("crm".to_string()));

        let missing = verifier
            .verify_token(&token("k1", SECRET, &claims(300)))
            .await
            .unwrap_err();
        assert!(matches!(missing, AppError::Unauthorized(_)));

        let mut foreign = claims(300);
        foreign.aud = Some("billing".to_string());
        assert!(verifier
            .verify_token(&token("k1", SECRET, &foreign))
            .await
            .is_err());

        let mut ours = claims(300);
        ours.aud = Some("crm".to_string());
        assert!(verifier
            .verify_token(&token("k1", SECRET, &ours))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_issuer_is_required_when_configured() {
        let verifier =
            TokenVerifier::new(StaticSource::new(vec![oct("k1", SECRET)]), CachePolicy::OnMiss)
                .with_issuer(Some("https://idp.example.com".to_string()));

        assert!(verifier
            .verify_token(&token("k1", SECRET, &claims(300)))
            .await
            .is_err());

        let mut issued = claims(300);
        issued.iss = Some("https://idp.example.com".to_string());
        assert!(verifier
            .verify_token(&token("k1", SECRET, &issued))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_unconfigured_audience_ignores_claim() {
        let verifier =
            TokenVerifier::new(StaticSource::new(vec![oct("k1", SECRET)]), CachePolicy::OnMiss);
        let mut with_aud = claims(300);
        with_aud.aud = Some("anything".to_string());
        assert!(verifier
            .verify_token(&token("k1", SECRET, &with_aud))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let verifier =
            TokenVerifier::new(StaticSource::new(vec![oct("k1", SECRET)]), CachePolicy::OnMiss);
        assert!(matches!(
            verifier.verify_token("not-a-jwt").await.unwrap_err(),
            AppError::Unauthorized(_)
        ));
    }

    struct DownSource;

    #[async_trait::async_trait]
    impl KeySource for DownSource {
        async fn fetch(&self) -> Result<Jwks, AppError> {
            Err(AppError::IdentityBackend("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_chained_source_survives_one_outage() {
        let up: Arc<dyn KeySource> = StaticSource::new(vec![oct("k1", SECRET)]);
        let down: Arc<dyn KeySource> = Arc::new(DownSource);
        let chained = ChainedKeySource(vec![up, down.clone()]);
        let verifier = TokenVerifier::new(Arc::new(chained), CachePolicy::OnMiss);
        assert!(verifier
            .verify_token(&token("k1", SECRET, &claims(300)))
            .await
            .is_ok());

        let all_down = ChainedKeySource(vec![down]);
        assert!(matches!(
            all_down.fetch().await.unwrap_err(),
            AppError::IdentityBackend(_)
        ));
    }

    #[test]
    fn test_unsupported_key_type_is_rejected() {
        let jwk = Jwk {
            key_type: "OKP".to_string(),
            ..Default::default()
        };
        assert!(jwk_to_decoding_key(&jwk).is_err());
        assert!(jwk_to_decoding_key(&Jwk {
            key_type: "RSA".to_string(),
            ..Default::default()
        })
        .is_err());
    }
}
