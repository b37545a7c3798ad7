//! Catalog fixtures: a nested JSON document of categories, subcategories,
//! products and their images, loaded out of band by administrators.

use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::Deserialize;
use std::{collections::HashSet, path::Path};
use thiserror::Error;
use tracing::info;
use validator::{Validate, ValidationErrors};

use crate::entities::{category, product, product_image, subcategory};

static SLUG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap());

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Failed to read fixture: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed fixture: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid fixture: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("Slug `{0}` is used more than once")]
    DuplicateSlug(String),
    #[error("Database error: {0}")]
    Db(#[from] DbErr),
}

#[derive(Deserialize, Validate, Debug, Clone)]
pub struct CatalogFixture {
    #[validate(nested)]
    pub categories: Vec<CategoryFixture>,
}

#[derive(Deserialize, Validate, Debug, Clone)]
pub struct CategoryFixture {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(min = 1, max = 64), regex(path = *SLUG_REGEX))]
    pub slug: String,
    #[validate(length(min = 1))]
    pub picture: String,
    #[serde(default)]
    #[validate(nested)]
    pub subcategories: Vec<SubcategoryFixture>,
}

#[derive(Deserialize, Validate, Debug, Clone)]
pub struct SubcategoryFixture {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(min = 1, max = 64), regex(path = *SLUG_REGEX))]
    pub slug: String,
    #[validate(length(min = 1))]
    pub picture: String,
    #[serde(default)]
    #[validate(nested)]
    pub products: Vec<ProductFixture>,
}

#[derive(Deserialize, Validate, Debug, Clone)]
pub struct ProductFixture {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(min = 1, max = 128), regex(path = *SLUG_REGEX))]
    pub slug: String,
    #[validate(range(min = 1, max = 1000000))]
    pub price: u32,
    // Admins attach at most three pictures per product.
    #[serde(default)]
    #[validate(length(max = 3))]
    pub images: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub categories: usize,
    pub subcategories: usize,
    pub products: usize,
    pub images: usize,
}

impl CatalogFixture {
    pub fn parse(raw: &str) -> Result<Self, FixtureError> {
        let fixture: CatalogFixture = serde_json::from_str(raw)?;
        fixture.check()?;
        Ok(fixture)
    }

    pub async fn read(path: &Path) -> Result<Self, FixtureError> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::parse(&raw)
    }

    /// Field rules plus slug uniqueness per entity kind.
    pub fn check(&self) -> Result<(), FixtureError> {
        self.validate()?;

        let mut categories = HashSet::new();
        let mut subcategories = HashSet::new();
        let mut products = HashSet::new();
        for category in &self.categories {
            unique(&mut categories, &category.slug)?;
            for subcategory in &category.subcategories {
                unique(&mut subcategories, &subcategory.slug)?;
                for product in &subcategory.products {
                    unique(&mut products, &product.slug)?;
                }
            }
        }
        Ok(())
    }
}

fn unique<'a>(seen: &mut HashSet<&'a str>, slug: &'a str) -> Result<(), FixtureError> {
    if seen.insert(slug) {
        Ok(())
    } else {
        Err(FixtureError::DuplicateSlug(slug.to_owned()))
    }
}

/// Inserts the fixture in one transaction. Entities whose slug is already
/// stored are reused, so loading the same file twice is a no-op.
pub async fn load_catalog(
    db: &DatabaseConnection,
    fixture: &CatalogFixture,
) -> Result<LoadSummary, FixtureError> {
    fixture.check()?;

    let txn = db.begin().await?;
    let mut summary = LoadSummary::default();

    for category_fixture in &fixture.categories {
        let category_id = match category::Entity::find()
            .filter(category::Column::Slug.eq(category_fixture.slug.as_str()))
            .one(&txn)
            .await?
        {
            Some(existing) => existing.id,
            None => {
                summary.categories += 1;
                category::ActiveModel {
                    name: Set(category_fixture.name.clone()),
                    slug: Set(category_fixture.slug.clone()),
                    picture: Set(category_fixture.picture.clone()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?
                .id
            }
        };

        for subcategory_fixture in &category_fixture.subcategories {
            let subcategory_id = match subcategory::Entity::find()
                .filter(subcategory::Column::Slug.eq(subcategory_fixture.slug.as_str()))
                .one(&txn)
                .await?
            {
                Some(existing) => existing.id,
                None => {
                    summary.subcategories += 1;
                    subcategory::ActiveModel {
                        category_id: Set(category_id),
                        name: Set(subcategory_fixture.name.clone()),
                        slug: Set(subcategory_fixture.slug.clone()),
                        picture: Set(subcategory_fixture.picture.clone()),
                        ..Default::default()
                    }
                    .insert(&txn)
                    .await?
                    .id
                }
            };

            for product_fixture in &subcategory_fixture.products {
                if let Some(images) = insert_product(&txn, subcategory_id, product_fixture).await? {
                    summary.products += 1;
                    summary.images += images;
                }
            }
        }
    }

    txn.commit().await?;
    info!(
        categories = summary.categories,
        subcategories = summary.subcategories,
        products = summary.products,
        images = summary.images,
        "Loaded catalog fixture"
    );
    Ok(summary)
}

async fn insert_product<C: ConnectionTrait>(
    conn: &C,
    subcategory_id: i32,
    fixture: &ProductFixture,
) -> Result<Option<usize>, DbErr> {
    let exists = product::Entity::find()
        .filter(product::Column::Slug.eq(fixture.slug.as_str()))
        .one(conn)
        .await?
        .is_some();
    if exists {
        return Ok(None);
    }

    let product = product::ActiveModel {
        subcategory_id: Set(subcategory_id),
        name: Set(fixture.name.clone()),
        slug: Set(fixture.slug.clone()),
        price: Set(fixture.price),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    for image in &fixture.images {
        product_image::ActiveModel {
            product_id: Set(product.id),
            image: Set(image.clone()),
            ..Default::default()
        }
        .insert(conn)
        .await?;
    }

    Ok(Some(fixture.images.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BAKERY: &str = r#"{
        "categories": [{
            "name": "Bakery",
            "slug": "bakery",
            "picture": "categories/bakery.png",
            "subcategories": [{
                "name": "Bread",
                "slug": "bread",
                "picture": "categories/bread.png",
                "products": [
                    {"name": "Rye loaf", "slug": "rye-loaf", "price": 100, "images": ["products/rye.jpg"]},
                    {"name": "Baguette", "slug": "baguette", "price": 80}
                ]
            }]
        }]
    }"#;

    #[test]
    fn parses_nested_catalog() {
        let fixture = CatalogFixture::parse(BAKERY).unwrap();
        let bread = &fixture.categories[0].subcategories[0];

        assert_eq!(bread.products.len(), 2);
        assert!(bread.products[1].images.is_empty());
    }

    #[test]
    fn rejects_bad_slug_and_price() {
        let bad_slug = BAKERY.replace("\"rye-loaf\"", "\"rye loaf\"");
        assert!(matches!(
            CatalogFixture::parse(&bad_slug),
            Err(FixtureError::Validation(_))
        ));

        let free = BAKERY.replace("\"price\": 80", "\"price\": 0");
        assert!(matches!(
            CatalogFixture::parse(&free),
            Err(FixtureError::Validation(_))
        ));
    }

    #[test]
    fn rejects_more_than_three_images() {
        let crowded = BAKERY.replace(
            "[\"products/rye.jpg\"]",
            "[\"a.jpg\", \"b.jpg\", \"c.jpg\", \"d.jpg\"]",
        );
        assert!(matches!(
            CatalogFixture::parse(&crowded),
            Err(FixtureError::Validation(_))
        ));
    }

    #[test]
    fn rejects_duplicate_product_slugs() {
        let twice = BAKERY.replace("\"slug\": \"baguette\"", "\"slug\": \"rye-loaf\"");
        match CatalogFixture::parse(&twice) {
            Err(FixtureError::DuplicateSlug(slug)) => assert_eq!(slug, "rye-loaf"),
            other => panic!("expected duplicate slug, got {other:?}"),
        }
    }
}
