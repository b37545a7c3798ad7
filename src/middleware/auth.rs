use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::entities::user::Entity as UserEntity;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub exp: usize,
}

#[derive(Clone)]
pub struct AuthState {
    pub db: Arc<DatabaseConnection>,
    pub secret: Arc<str>,
}

#[derive(Error, Debug)]
pub enum AuthMiddlewareError {
    #[error("Missing or malformed Authorization header")]
    MissingToken,
    #[error("Invalid user id")]
    InvalidUser,
    #[error("Token expired or invalid")]
    TokenExpired,
    #[error("Failed to generate token")]
    GenerationFail,
    #[error("Internal server error")]
    InternalServerError,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AuthMiddlewareError::MissingToken)
        .map_err(reject)?;

    let claims = validate_token(&state.db, &state.secret, token)
        .await
        .map_err(reject)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

fn reject(err: AuthMiddlewareError) -> StatusCode {
    debug!(reason = %err, "Rejected unauthenticated request");
    match err {
        AuthMiddlewareError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::UNAUTHORIZED,
    }
}

pub fn generate_token(
    user_id: i32,
    secret: &str,
    ttl_hours: i64,
) -> Result<String, AuthMiddlewareError> {
    let exp = Utc::now()
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or(AuthMiddlewareError::GenerationFail)?
        .timestamp() as usize;

    let claims = Claims { user_id, exp };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthMiddlewareError::GenerationFail)
}

pub async fn validate_token(
    db: &DatabaseConnection,
    secret: &str,
    token: &str,
) -> Result<Claims, AuthMiddlewareError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AuthMiddlewareError::TokenExpired)?
    .claims;

    match UserEntity::find_by_id(claims.user_id).one(db).await {
        Ok(Some(_)) => Ok(claims),
        Ok(None) => Err(AuthMiddlewareError::InvalidUser),
        Err(_) => Err(AuthMiddlewareError::InternalServerError),
    }
}
