use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shop_api::{api_router, entities::setup_schema, fixtures, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("shop_api=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env()?;

    let db: DatabaseConnection = Database::connect(&config.database_url).await?;
    setup_schema(&db).await?;

    if let Some(path) = &config.catalog_fixture {
        let fixture = fixtures::CatalogFixture::read(path).await?;
        fixtures::load_catalog(&db, &fixture).await?;
    }

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "Listening");

    let app = api_router(Arc::new(db), Arc::new(config));
    axum::serve(listener, app).await?;
    Ok(())
}
