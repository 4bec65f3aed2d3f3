//! Self-contained identity provider backed by the key-value store.
//!
//! Passwords are argon2 hashes. Tokens are HS256 JWTs carrying the same
//! `custom:` claims a Cognito user pool would emit, so the verifier treats both
//! issuers alike. Logout bumps a per-user session generation that the
//! authorization resolver compares against the token's `custom:session` claim.

use std::collections::BTreeSet;
use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use crm_core::models::{Entity, Jwk, Jwks, TokenClaims, UserRole};
use crm_core::AppError;
use crm_db::{Filter, KeyValueBackend, TenantScopedStore};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::{IdentityBackend, ResetCodeSink, SignUp, UserAttributes};

const IDENTITY_PARTITION: &str = "__identity__";
const RESET_CODE_TTL_MINUTES: i64 = 60;
/// Wrong guesses tolerated before an issued reset code is discarded
const MAX_RESET_ATTEMPTS: u32 = 5;
const INVALID_CREDENTIALS: &str = "Incorrect username or password";
const INVALID_RESET_CODE: &str = "Invalid or expired confirmation code";

#[derive(Debug, Clone)]
pub struct LocalIdentitySettings {
    pub signing_secret: String,
    pub token_ttl: Duration,
    pub issuer: Option<String>,
    /// Stamped as `aud` so the token verifier's audience check accepts local tokens
    pub audience: Option<String>,
}

/// Stored identity, keyed by normalized email.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Credential {
    email: String,
    user_id: String,
    password_hash: String,
    tenant_id: String,
    given_name: String,
    family_name: String,
    role: UserRole,
    /// Mirrors the user record; surfaces as the `custom:is_active` claim
    is_active: bool,
    session: u64,
    reset_code_hash: Option<String>,
    reset_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    reset_attempts: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Credential {
    fn clear_reset_code(&mut self) {
        self.reset_code_hash = None;
        self.reset_expires_at = None;
        self.reset_attempts = 0;
    }
}

impl Entity for Credential {
    const COLLECTION: &'static str = "identity_credentials";
    const LABEL: &'static str = "User";

    fn id(&self) -> &str {
        &self.email
    }

    fn partition_key(&self) -> &str {
        IDENTITY_PARTITION
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Group {
    name: String,
    description: String,
    members: BTreeSet<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Entity for Group {
    const COLLECTION: &'static str = "identity_groups";
    const LABEL: &'static str = "Group";

    fn id(&self) -> &str {
        &self.name
    }

    fn partition_key(&self) -> &str {
        IDENTITY_PARTITION
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

pub struct LocalIdentityProvider {
    credentials: TenantScopedStore<Credential>,
    groups: TenantScopedStore<Group>,
    settings: LocalIdentitySettings,
    key_id: String,
    encoding_key: EncodingKey,
    sink: Arc<dyn ResetCodeSink>,
    /// Serializes the email uniqueness check with the write that claims it
    registration: tokio::sync::Mutex<()>,
}

impl LocalIdentityProvider {
    pub fn new(
        backend: Arc<dyn KeyValueBackend>,
        settings: LocalIdentitySettings,
        sink: Arc<dyn ResetCodeSink>,
    ) -> Self {
        let digest = Sha256::digest(settings.signing_secret.as_bytes());
        let key_id = hex::encode(digest)[..16].to_string();
        let encoding_key = EncodingKey::from_secret(settings.signing_secret.as_bytes());

        Self {
            credentials: TenantScopedStore::new(backend.clone()),
            groups: TenantScopedStore::new(backend),
            settings,
            key_id,
            encoding_key,
            sink,
            registration: tokio::sync::Mutex::new(()),
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Verification keys for tokens issued here. Contains the shared secret:
    /// hand it to in-process verifiers only.
    pub fn jwks(&self) -> Jwks {
        Jwks {
            keys: vec![Jwk {
                key_type: "oct".to_string(),
                key_id: Some(self.key_id.clone()),
                key_use: Some("sig".to_string()),
                algorithm: Some("HS256".to_string()),
                secret: Some(URL_SAFE_NO_PAD.encode(self.settings.signing_secret.as_bytes())),
                ..Default::default()
            }],
        }
    }

    fn issue_token(&self, credential: &Credential) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: credential.user_id.clone(),
            email: Some(credential.email.clone()),
            tenant_id: Some(credential.tenant_id.clone()),
            role: Some(credential.role.as_str().to_string()),
            is_active: Some(serde_json::Value::String(credential.is_active.to_string())),
            session: Some(credential.session),
            exp: (now + self.settings.token_ttl).timestamp(),
            iat: now.timestamp(),
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.key_id.clone());

        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, AppError> {
        self.credentials
            .find(&normalize_email(email), IDENTITY_PARTITION)
            .await
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<Credential>, AppError> {
        let mut matches = self
            .credentials
            .query_all(IDENTITY_PARTITION, Filter::new().eq("user_id", user_id))
            .await?;
        Ok(matches.pop())
    }

    async fn require_by_user_id(&self, user_id: &str) -> Result<Credential, AppError> {
        self.find_by_user_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }
}

#[async_trait::async_trait]
impl IdentityBackend for LocalIdentityProvider {
    #[tracing::instrument(skip(self, request), fields(identity.operation = "sign_up", tenant_id = %request.tenant_id))]
    async fn sign_up(&self, request: SignUp) -> Result<String, AppError> {
        let email = normalize_email(&request.email);
        let password_hash = hash_password(&request.password).await?;

        // Single-process guard; the key-value contract has no put-if-absent
        let _registration = self.registration.lock().await;
        if self.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let now = Utc::now();
        let credential = Credential {
            email,
            user_id: uuid::Uuid::new_v4().to_string(),
            password_hash,
            tenant_id: request.tenant_id,
            given_name: request.given_name,
            family_name: request.family_name,
            role: request.role,
            is_active: true,
            session: 0,
            reset_code_hash: None,
            reset_expires_at: None,
            reset_attempts: 0,
            created_at: now,
            updated_at: now,
        };
        let credential = self.credentials.put(credential).await?;

        tracing::info!(user_id = %credential.user_id, "Identity registered");
        Ok(credential.user_id)
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        if let Some(credential) = self.find_by_user_id(user_id).await? {
            self.credentials
                .remove(&credential.email, IDENTITY_PARTITION)
                .await?;
            tracing::info!(user_id = %user_id, "Identity deleted");
        }
        Ok(())
    }

    async fn update_user_attributes(
        &self,
        user_id: &str,
        attributes: UserAttributes,
    ) -> Result<(), AppError> {
        let mut credential = self.require_by_user_id(user_id).await?;
        if let Some(role) = attributes.role {
            credential.role = role;
        }
        if let Some(is_active) = attributes.is_active {
            credential.is_active = is_active;
        }
        self.credentials.put(credential).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, password), fields(identity.operation = "authenticate"))]
    async fn authenticate(&self, username: &str, password: &str) -> Result<String, AppError> {
        let credential = match self.find_by_email(username).await? {
            Some(credential) => credential,
            None => {
                tracing::debug!("Authentication failed: unknown user");
                return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };
        if !verify_password(password, &credential.password_hash).await? {
            tracing::debug!("Authentication failed");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        self.issue_token(&credential)
    }

    async fn global_sign_out(&self, user_id: &str) -> Result<(), AppError> {
        let mut credential = self.require_by_user_id(user_id).await?;
        credential.session += 1;
        self.credentials.put(credential).await?;
        tracing::info!(user_id = %user_id, "All sessions revoked");
        Ok(())
    }

    async fn change_password(
        &self,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let mut credential = self.require_by_user_id(user_id).await?;
        if !verify_password(old_password, &credential.password_hash).await? {
            return Err(AppError::BadRequest("Incorrect password".to_string()));
        }
        credential.password_hash = hash_password(new_password).await?;
        self.credentials.put(credential).await?;
        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        let Some(mut credential) = self.find_by_email(email).await? else {
            tracing::debug!("Password reset requested for unknown address");
            return Ok(());
        };

        let code = generate_reset_code();
        credential.reset_code_hash = Some(hash_code(&code));
        credential.reset_expires_at = Some(Utc::now() + Duration::minutes(RESET_CODE_TTL_MINUTES));
        credential.reset_attempts = 0;
        let credential = self.credentials.put(credential).await?;

        self.sink.deliver(&credential.email, &code).await
    }

    async fn confirm_forgot_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let invalid = || AppError::BadRequest(INVALID_RESET_CODE.to_string());
        let mut credential = self.find_by_email(email).await?.ok_or_else(invalid)?;

        let (Some(expected), Some(expires_at)) =
            (&credential.reset_code_hash, credential.reset_expires_at)
        else {
            return Err(invalid());
        };
        if expires_at < Utc::now() {
            credential.clear_reset_code();
            self.credentials.put(credential).await?;
            return Err(invalid());
        }

        let matches: bool = expected.as_bytes().ct_eq(hash_code(code).as_bytes()).into();
        if !matches {
            credential.reset_attempts += 1;
            if credential.reset_attempts >= MAX_RESET_ATTEMPTS {
                tracing::warn!(
                    user_id = %credential.user_id,
                    attempts = credential.reset_attempts,
                    "Reset code discarded after repeated wrong guesses"
                );
                credential.clear_reset_code();
            }
            self.credentials.put(credential).await?;
            return Err(invalid());
        }

        credential.password_hash = hash_password(new_password).await?;
        credential.clear_reset_code();
        self.credentials.put(credential).await?;
        tracing::info!("Password reset confirmed");
        Ok(())
    }

    async fn create_group(&self, group: &str, description: &str) -> Result<(), AppError> {
        if self.groups.find(group, IDENTITY_PARTITION).await?.is_some() {
            return Err(AppError::Conflict(format!("Group {} already exists", group)));
        }
        let now = Utc::now();
        self.groups
            .put(Group {
                name: group.to_string(),
                description: description.to_string(),
                members: BTreeSet::new(),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;
        tracing::info!(group = %group, "Identity group created");
        Ok(())
    }

    async fn delete_group(&self, group: &str) -> Result<(), AppError> {
        if self.groups.remove(group, IDENTITY_PARTITION).await? {
            tracing::info!(group = %group, "Identity group deleted");
        }
        Ok(())
    }

    async fn add_user_to_group(&self, user_id: &str, group: &str) -> Result<(), AppError> {
        let mut record = self
            .groups
            .find(group, IDENTITY_PARTITION)
            .await?
            .ok_or_else(|| AppError::not_found("Group"))?;
        self.require_by_user_id(user_id).await?;

        if record.members.insert(user_id.to_string()) {
            self.groups.put(record).await?;
        }
        Ok(())
    }

    async fn session_generation(&self, user_id: &str) -> Result<Option<u64>, AppError> {
        Ok(self.find_by_user_id(user_id).await?.map(|c| c.session))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// Argon2 is CPU-bound by design; both run off the async pool.
async fn hash_password(password: &str) -> Result<String, AppError> {
    use argon2::{
        password_hash::{PasswordHasher, SaltString},
        Argon2,
    };
    use rand_core::OsRng;

    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
}

async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    use argon2::{
        password_hash::{PasswordHash, PasswordVerifier},
        Argon2,
    };

    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&hash)
            .map_err(|e| AppError::Internal(format!("Invalid hash format: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    })
    .await
    .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?
}

/// Six decimal digits
fn generate_reset_code() -> String {
    use rand::Rng;

    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}

fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.trim().as_bytes()))
}
