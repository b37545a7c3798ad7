pub mod auth_routes;
pub mod cart_routes;
pub mod category_routes;
pub mod product_routes;

use axum::{http::StatusCode, middleware, response::Response, Extension, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::middleware::{
    auth::AuthState,
    logging::{error_response, internal_error, logging_middleware, ApiError},
};
use crate::services::catalog::CatalogError;

use {
    auth_routes::auth_routes, cart_routes::cart_routes, category_routes::category_routes,
    product_routes::product_routes,
};

pub fn api_router(db: Arc<DatabaseConnection>, config: Arc<Config>) -> Router {
    let auth_state = AuthState {
        db: db.clone(),
        secret: Arc::from(config.secret.as_str()),
    };

    let api = Router::new()
        .merge(auth_routes())
        .merge(category_routes())
        .merge(product_routes())
        .merge(cart_routes(auth_state));

    Router::new()
        .nest("/api/v1", api)
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(db))
        .layer(Extension(config))
}

pub(crate) fn catalog_error(err: CatalogError) -> Response {
    match err {
        CatalogError::NotFound(..) | CatalogError::InvalidPage => error_response(
            StatusCode::NOT_FOUND,
            err.to_string(),
            ApiError::General(err.to_string()),
        ),
        CatalogError::Db(db_err) => internal_error(ApiError::DbError(db_err.to_string())),
    }
}
