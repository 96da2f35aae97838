//! Extractors turning the `Authorization` header into caller identities.

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::{
    error::AppError,
    services::auth_service::{self, AuthContext, Credential},
    state::SharedState,
};

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::Unauthorized("malformed authorization header".into()))?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Some)
        .ok_or_else(|| AppError::Unauthorized("expected a bearer token".into()))
}

impl FromRequestParts<SharedState> for Credential {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;
        Ok(auth_service::verify_token(state, token)?)
    }
}

/// A missing header yields `None`; a present but invalid token is still rejected.
impl OptionalFromRequestParts<SharedState> for Credential {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Option<Self>, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(Some(auth_service::verify_token(state, token)?)),
            None => Ok(None),
        }
    }
}

impl FromRequestParts<SharedState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let credential =
            <Credential as FromRequestParts<SharedState>>::from_request_parts(parts, state)
                .await?;
        Ok(auth_service::authenticate(state, credential).await?)
    }
}
