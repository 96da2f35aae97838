//! Bearer token verification. Tokens are issued elsewhere; this service only
//! checks their signature and expiry and resolves the user they name.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{dao::models::UserEntity, error::ServiceError, state::SharedState};

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Id of the user the token was issued to.
    pub sub: String,
    /// Expiry as a unix timestamp.
    pub exp: u64,
}

/// A verified token. The user profile may not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credential {
    pub user_id: Uuid,
}

/// A verified token whose user profile exists.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub user: UserEntity,
}

/// Check signature and expiry of `token` and extract the user id.
pub fn verify_token(state: &SharedState, token: &str) -> Result<Credential, ServiceError> {
    let secret = state
        .config()
        .auth_secret()
        .ok_or_else(|| ServiceError::Unauthorized("authentication is not configured".into()))?;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|err| {
        debug!(error = %err, "rejected bearer token");
        ServiceError::Unauthorized("invalid or expired token".into())
    })?;

    let user_id = Uuid::parse_str(&data.claims.sub)
        .map_err(|_| ServiceError::Unauthorized("token subject is not a user id".into()))?;
    Ok(Credential { user_id })
}

/// Resolve the user behind a verified credential.
pub async fn authenticate(
    state: &SharedState,
    credential: Credential,
) -> Result<AuthContext, ServiceError> {
    let store = state.require_pool_store().await?;
    let user = store
        .find_user(credential.user_id)
        .await?
        .ok_or_else(|| ServiceError::Unauthorized("unknown user".into()))?;
    Ok(AuthContext {
        user_id: credential.user_id,
        user,
    })
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;
    use crate::{config::AppConfig, state::AppState};

    fn token(secret: &str, sub: &str, exp: u64) -> String {
        encode(
            &Header::default(),
            &Claims {
                sub: sub.into(),
                exp,
            },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn far_future() -> u64 {
        4_102_444_800
    }

    #[test]
    fn accepts_valid_token() {
        let state = AppState::new(AppConfig::default().with_auth_secret("s3cret"));
        let user_id = Uuid::new_v4();
        let credential =
            verify_token(&state, &token("s3cret", &user_id.to_string(), far_future())).unwrap();
        assert_eq!(credential.user_id, user_id);
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let state = AppState::new(AppConfig::default().with_auth_secret("s3cret"));
        let sub = Uuid::new_v4().to_string();

        assert!(matches!(
            verify_token(&state, &token("other", &sub, far_future())),
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            verify_token(&state, &token("s3cret", &sub, 1_000)),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn rejects_non_uuid_subject() {
        let state = AppState::new(AppConfig::default().with_auth_secret("s3cret"));
        assert!(matches!(
            verify_token(&state, &token("s3cret", "42", far_future())),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn rejects_everything_without_a_secret() {
        let state = AppState::new(AppConfig::default());
        let sub = Uuid::new_v4().to_string();
        assert!(matches!(
            verify_token(&state, &token("s3cret", &sub, far_future())),
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
