use axum::{
    extract::{Extension, OriginalUri, Path, Query},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use std::sync::Arc;

use crate::config::Config;
use crate::middleware::logging::{internal_error, to_response, ApiError};
use crate::routes::catalog_error;
use crate::services::catalog::Catalog;

//ROUTERS
pub fn category_routes() -> Router {
    Router::new()
        .route("/categories", get(get_categories))
        .route("/categories/:id", get(get_category))
}

//ROUTES
async fn get_categories(
    OriginalUri(uri): OriginalUri,
    Query(params): Query<GetCategoriesQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<Config>>,
) -> Response {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };

    match Catalog::new(&txn, &config)
        .list_categories(uri.path(), params.limit, params.offset)
        .await
    {
        Ok(page) => to_response((StatusCode::OK, Json(page)), Ok(())),
        Err(err) => catalog_error(err),
    }
}

async fn get_category(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<Config>>,
) -> Response {
    match Catalog::new(&*db, &config).category(id).await {
        Ok(category) => to_response((StatusCode::OK, Json(category)), Ok(())),
        Err(err) => catalog_error(err),
    }
}

#[derive(Deserialize)]
struct GetCategoriesQuery {
    limit: Option<u64>,
    offset: Option<u64>,
}
