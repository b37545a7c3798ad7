use axum::{
    body::Bytes,
    extract::{Extension, Path},
    http::StatusCode,
    middleware,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::Arc;

use crate::config::Config;
use crate::middleware::{
    auth::{auth_middleware, AuthState, Claims},
    logging::{error_response, internal_error, to_response, ApiError},
};
use crate::services::cart::{CartError, CartService, Updated};

//ROUTERS
pub fn cart_routes(auth: AuthState) -> Router {
    Router::new()
        .route(
            "/products/:id/cart",
            post(add_product).patch(patch_entry).delete(remove_product),
        )
        .route("/cart", get(get_cart).delete(clear_cart))
        .route_layer(middleware::from_fn_with_state(auth, auth_middleware))
}

//Routes
async fn get_cart(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<Config>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    match CartService::new(&db, &config, claims.user_id).list().await {
        Ok(cart) => to_response((StatusCode::OK, Json(cart)), Ok(())),
        Err(err) => cart_error(err),
    }
}

async fn add_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<Config>>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Response {
    //Body is optional, an empty one means "one piece".
    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        AddProduct::default()
    } else {
        match serde_json::from_slice::<AddProduct>(&body) {
            Ok(payload) => payload,
            Err(err) => return malformed_body(err),
        }
    };

    match CartService::new(&db, &config, claims.user_id)
        .add(id, payload.amount)
        .await
    {
        Ok(line) => to_response((StatusCode::CREATED, Json(line)), Ok(())),
        Err(err) => cart_error(err),
    }
}

async fn patch_entry(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<Config>>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Response {
    let payload = match serde_json::from_slice::<PatchCart>(&body) {
        Ok(payload) => payload,
        Err(err) => return malformed_body(err),
    };

    match CartService::new(&db, &config, claims.user_id)
        .update(id, &payload.amount.as_text())
        .await
    {
        Ok(Updated::Line(line)) => to_response((StatusCode::OK, Json(line)), Ok(())),
        Ok(Updated::Removed) => to_response(StatusCode::NO_CONTENT, Ok(())),
        Err(err) => cart_error(err),
    }
}

async fn remove_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<Config>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    match CartService::new(&db, &config, claims.user_id)
        .remove(id)
        .await
    {
        Ok(()) => to_response(StatusCode::NO_CONTENT, Ok(())),
        Err(err) => cart_error(err),
    }
}

async fn clear_cart(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<Config>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    match CartService::new(&db, &config, claims.user_id).clear().await {
        Ok(_) => to_response(StatusCode::NO_CONTENT, Ok(())),
        Err(err) => cart_error(err),
    }
}

fn malformed_body(err: serde_json::Error) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        format!("Malformed body: {err}"),
        ApiError::ValidationFail(err.to_string()),
    )
}

fn cart_error(err: CartError) -> Response {
    let status = match &err {
        CartError::Validation(_)
        | CartError::Duplicate
        | CartError::NotInCart
        | CartError::EmptyCart => StatusCode::BAD_REQUEST,
        CartError::ProductNotFound(_) | CartError::LineNotFound(_) => StatusCode::NOT_FOUND,
        CartError::Db(db_err) => return internal_error(ApiError::DbError(db_err.to_string())),
    };

    let ext = match &err {
        CartError::Validation(_) => ApiError::ValidationFail(err.to_string()),
        _ => ApiError::General(err.to_string()),
    };
    error_response(status, err.to_string(), ext)
}

//Structs
#[derive(Deserialize, Debug, Default)]
struct AddProduct {
    amount: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct PatchCart {
    amount: AmountField,
}

//Clients send both "3" and 3.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum AmountField {
    Text(String),
    Number(u64),
}

impl AmountField {
    fn as_text(&self) -> Cow<'_, str> {
        match self {
            AmountField::Text(text) => Cow::Borrowed(text),
            AmountField::Number(number) => Cow::Owned(number.to_string()),
        }
    }
}
