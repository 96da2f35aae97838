use tracing::info;

use crate::{
    dao::models::UserEntity, dto::user::UpsertProfileRequest, error::ServiceError,
    services::auth_service::Credential, state::SharedState,
};

/// Create or refresh the profile of the token holder. The first registration
/// time is kept on later updates.
pub async fn upsert_profile(
    state: &SharedState,
    credential: Credential,
    request: UpsertProfileRequest,
) -> Result<UserEntity, ServiceError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("name must not be blank".into()));
    }

    let store = state.require_pool_store().await?;
    let user = store
        .upsert_user(UserEntity {
            id: credential.user_id,
            name: name.to_owned(),
            email: request.email.trim().to_owned(),
            avatar_url: request.avatar_url,
            created_at: state.clock().now(),
        })
        .await?;

    info!(user_id = %user.id, "user profile saved");
    Ok(user)
}
