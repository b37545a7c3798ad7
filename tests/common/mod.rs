#![allow(dead_code)]

use reqwest::{header, Client, RequestBuilder, StatusCode};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{json, Value};
use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use shop_api::{
    api_router,
    entities::setup_schema,
    fixtures::{load_catalog, CatalogFixture},
    Config,
};

// Ids follow insertion order: rye-loaf = 1, baguette = 2, whole-milk = 3.
pub const RYE_LOAF: i32 = 1;
pub const BAGUETTE: i32 = 2;
pub const WHOLE_MILK: i32 = 3;

pub const CATALOG: &str = r#"{
    "categories": [
        {
            "name": "Bakery",
            "slug": "bakery",
            "picture": "categories/bakery.png",
            "subcategories": [{
                "name": "Bread",
                "slug": "bread",
                "picture": "categories/bread.png",
                "products": [
                    {"name": "Rye loaf", "slug": "rye-loaf", "price": 100,
                     "images": ["products/rye-1.jpg", "products/rye-2.jpg"]},
                    {"name": "Baguette", "slug": "baguette", "price": 80}
                ]
            }]
        },
        {
            "name": "Dairy",
            "slug": "dairy",
            "picture": "categories/dairy.png",
            "subcategories": [{
                "name": "Milk",
                "slug": "milk",
                "picture": "categories/milk.png",
                "products": [
                    {"name": "Whole milk", "slug": "whole-milk", "price": 35}
                ]
            }]
        }
    ]
}"#;

pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: Arc<DatabaseConnection>,
}

/// Serves the API over a fresh in-memory database seeded with [`CATALOG`].
pub async fn spawn_app() -> TestApp {
    let mut options = ConnectOptions::new("sqlite::memory:");
    // One connection, otherwise every pooled connection sees its own database.
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");

    setup_schema(&db).await.expect("Failed to create schema");
    let fixture = CatalogFixture::parse(CATALOG).expect("Test catalog is invalid");
    load_catalog(&db, &fixture)
        .await
        .expect("Failed to load test catalog");

    let config = Config::from_vars(HashMap::from([
        ("DATABASE_URL".to_owned(), "sqlite::memory:".to_owned()),
        ("SECRET".to_owned(), "test-secret".to_owned()),
        ("PAGE_SIZE".to_owned(), "2".to_owned()),
    ]))
    .expect("Test config is invalid");

    let db = Arc::new(db);
    let app = api_router(db.clone(), Arc::new(config));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });

    TestApp {
        addr,
        client: Client::new(),
        db,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}/api/v1{}", self.addr, path)
    }

    pub async fn register(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/register"))
            .json(&json!({
                "username": username,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to send register request")
    }

    pub async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/login"))
            .json(&json!({
                "username": username,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to send login request")
    }

    /// Registers `username` and returns a bearer token for it.
    pub async fn token_for(&self, username: &str) -> String {
        let password = "Muzion15secret";
        assert_eq!(
            self.register(username, password).await.status(),
            StatusCode::CREATED
        );

        let login_body = self
            .login(username, password)
            .await
            .json::<Value>()
            .await
            .expect("Failed to parse login response JSON");

        login_body["token"]
            .as_str()
            .expect("Token not found in login response")
            .to_owned()
    }

    pub fn authorized(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder.header(header::AUTHORIZATION, format!("Bearer {}", token))
    }

    pub async fn get_json(&self, path: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send request");
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn add_to_cart(&self, token: &str, product_id: i32) -> reqwest::Response {
        self.authorized(
            self.client
                .post(self.url(&format!("/products/{}/cart", product_id))),
            token,
        )
        .send()
        .await
        .expect("Failed to send add to cart request")
    }

    pub async fn patch_amount(&self, token: &str, product_id: i32, amount: Value) -> reqwest::Response {
        self.authorized(
            self.client
                .patch(self.url(&format!("/products/{}/cart", product_id))),
            token,
        )
        .json(&json!({ "amount": amount }))
        .send()
        .await
        .expect("Failed to send patch cart request")
    }

    pub async fn remove_from_cart(&self, token: &str, product_id: i32) -> reqwest::Response {
        self.authorized(
            self.client
                .delete(self.url(&format!("/products/{}/cart", product_id))),
            token,
        )
        .send()
        .await
        .expect("Failed to send remove from cart request")
    }

    pub async fn clear_cart(&self, token: &str) -> reqwest::Response {
        self.authorized(self.client.delete(self.url("/cart")), token)
            .send()
            .await
            .expect("Failed to send clear cart request")
    }

    pub async fn cart(&self, token: &str) -> Value {
        let response = self
            .authorized(self.client.get(self.url("/cart")), token)
            .send()
            .await
            .expect("Failed to send get cart request");
        assert_eq!(response.status(), StatusCode::OK);
        response
            .json::<Value>()
            .await
            .expect("Failed to parse cart response JSON")
    }
}
