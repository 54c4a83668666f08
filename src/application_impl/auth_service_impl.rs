use crate::application_port::*;
use crate::domain_port::{SessionStore, UserRepo};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const REVOKED_SENTINEL: &str = "true";

pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    refresh_tokens: Arc<dyn RefreshTokenGenerator>,
    session_store: Arc<dyn SessionStore>,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        refresh_tokens: Arc<dyn RefreshTokenGenerator>,
        session_store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            user_repo,
            credential_hasher,
            token_codec,
            refresh_tokens,
            session_store,
        }
    }

    /// Remaining lifetime of a token, never less than one second so the
    /// revocation write is always issued.
    fn remaining_ttl(until: DateTime<Utc>) -> Duration {
        let millis = (until - Utc::now()).num_milliseconds();
        if millis < 1000 {
            Duration::from_secs(1)
        } else {
            Duration::from_millis(millis as u64)
        }
    }

    /// Issue an access token plus a freshly stored refresh token for `subject`.
    async fn issue_pair(&self, subject: &str) -> Result<TokenPair, AuthError> {
        let access_token = self
            .token_codec
            .create(subject)
            .map_err(|e| AuthError::InternalError(format!("failed to create access token: {e}")))?;

        let refresh_token = self.refresh_tokens.create();
        self.session_store
            .set_ex(&refresh_key(&refresh_token), subject, REFRESH_TTL)
            .await
            .map_err(|e| AuthError::Store(format!("failed to store refresh token: {e}")))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    async fn discard_refresh_token(&self, key: &str) {
        if let Err(e) = self.session_store.del(key).await {
            warn!(error = %e, "failed to delete refresh token");
        }
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn login(&self, request: LoginInput) -> Result<TokenPair, AuthError> {
        let LoginInput { username, password } = request;

        let rec = self
            .user_repo
            .find_by_username(&username)
            .await
            .map_err(|e| AuthError::Store(format!("failed to find user by username: {e}")))?
            .ok_or(AuthError::UserNotFound)?;

        let ok = self
            .credential_hasher
            .verify_password(&password, &rec.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidPassword);
        }

        self.issue_pair(&rec.user_id.to_string()).await
    }

    async fn logout(&self, request: LogoutInput) -> Result<(), AuthError> {
        let LogoutInput {
            claims,
            refresh_token,
        } = request;
        let key = refresh_key(&refresh_token);

        let subject = self
            .session_store
            .get(&key)
            .await
            .map_err(|e| AuthError::Store(format!("failed to get refresh token: {e}")))?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if subject != claims.sub {
            return Err(AuthError::InvalidLogoutSession);
        }

        let ttl = Self::remaining_ttl(claims.expires_at());
        self.session_store
            .set_ex(&revoke_key(&claims.jti), REVOKED_SENTINEL, ttl)
            .await
            .map_err(|e| AuthError::Store(format!("failed to set revoke token: {e}")))?;

        // A failed delete leaves the refresh token usable until its TTL runs out.
        self.discard_refresh_token(&key).await;

        info!(user_id = %claims.sub, jti = %claims.jti, "session logged out");
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        // Claiming the old record consumes it, so each refresh token rotates
        // at most once. A failure after this point forces a new login.
        let subject = self
            .session_store
            .take(&refresh_key(refresh_token))
            .await
            .map_err(|e| AuthError::Store(format!("failed to claim refresh token: {e}")))?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if subject.is_empty() {
            return Err(AuthError::InvalidUserId);
        }

        self.issue_pair(&subject).await
    }

    async fn validate_request(&self, bearer_token: &str) -> Result<SessionClaims, AuthError> {
        let claims = self
            .token_codec
            .parse(bearer_token)
            .map_err(|e| AuthError::InvalidAuthToken(e.to_string()))?;

        let revoked = self
            .session_store
            .exists(&revoke_key(&claims.jti))
            .await
            .map_err(|e| AuthError::InvalidAuthToken(e.to_string()))?;
        if revoked {
            return Err(AuthError::TokenRevoked);
        }

        Ok(claims)
    }
}
