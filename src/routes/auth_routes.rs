use axum::{
    extract::Extension, http::StatusCode, response::Response, routing::post, Json, Router,
};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::config::Config;
use crate::entities::user::{self, hash_password, Entity as UserEntity};
use crate::middleware::{
    auth::generate_token,
    logging::{error_response, internal_error, to_response, ApiError},
};

pub fn auth_routes() -> Router {
    Router::new()
        .route("/auth/register", post(register_user))
        .route("/auth/login", post(login))
}

// ROUTES
async fn register_user(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<CreateUser>,
) -> Response {
    if let Err(err) = payload.validate() {
        return error_response(
            StatusCode::BAD_REQUEST,
            err.to_string(),
            ApiError::ValidationFail(err.to_string()),
        );
    }

    let password = match hash_password(&payload.password) {
        Ok(password) => password,
        Err(err) => return internal_error(ApiError::PasswordHashFailed(err)),
    };

    let new_user = user::ActiveModel {
        username: Set(payload.username),
        password: Set(password),
        ..Default::default()
    };

    match new_user.insert(&*db).await {
        Ok(model) => to_response(
            (
                StatusCode::CREATED,
                Json(json!({
                    "id": model.id,
                    "username": model.username
                })),
            ),
            Ok(()),
        ),
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            error_response(
                StatusCode::CONFLICT,
                "Username already exists",
                ApiError::General(err.to_string()),
            )
        }
        Err(err) => internal_error(ApiError::DbError(err.to_string())),
    }
}

async fn login(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<Config>>,
    Json(payload): Json<UserLogin>,
) -> Response {
    let result = UserEntity::find()
        .filter(user::Column::Username.eq(payload.username.as_str()))
        .one(&*db)
        .await;

    let model = match result {
        Ok(Some(model)) => model,
        Ok(None) => return invalid_credentials(),
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    if model.check_hash(&payload.password).is_err() {
        return invalid_credentials();
    }

    match generate_token(model.id, &config.secret, config.token_ttl_hours) {
        Ok(token) => to_response(
            (
                StatusCode::OK,
                Json(json!({
                    "token": token
                })),
            ),
            Ok(()),
        ),
        Err(err) => internal_error(ApiError::TokenGenerationFailed(err.to_string())),
    }
}

fn invalid_credentials() -> Response {
    error_response(
        StatusCode::UNAUTHORIZED,
        "Invalid username or password",
        ApiError::General("Invalid username or password".to_owned()),
    )
}

//Structs
static USERNAME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_.@+-]+$").unwrap());

#[derive(Deserialize, Validate)]
struct CreateUser {
    #[validate(length(min = 3, max = 150), regex(path = *USERNAME_REGEX))]
    username: String,
    #[validate(length(min = 8))]
    password: String,
}

#[derive(Deserialize)]
struct UserLogin {
    username: String,
    password: String,
}
