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
pub fn product_routes() -> Router {
    Router::new()
        .route("/products", get(get_products))
        .route("/products/:id", get(get_product))
}

//ROUTES
async fn get_products(
    OriginalUri(uri): OriginalUri,
    Query(params): Query<GetProductsQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<Config>>,
) -> Response {
    //count and page have to come from the same snapshot
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };

    match Catalog::new(&txn, &config)
        .list_products(uri.path(), params.page, params.page_size)
        .await
    {
        Ok(page) => to_response((StatusCode::OK, Json(page)), Ok(())),
        Err(err) => catalog_error(err),
    }
}

async fn get_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<Config>>,
) -> Response {
    match Catalog::new(&*db, &config).product(id).await {
        Ok(product) => to_response((StatusCode::OK, Json(product)), Ok(())),
        Err(err) => catalog_error(err),
    }
}

#[derive(Deserialize)]
struct GetProductsQuery {
    page: Option<u64>,
    page_size: Option<u64>,
}
