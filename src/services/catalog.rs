//! Read side of the catalog. Every response body is assembled here from
//! batched queries into plain serializable structs.

use sea_orm::{
    ConnectionTrait, DbErr, EntityTrait, LoaderTrait, PaginatorTrait, QueryOrder, QuerySelect,
};
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::entities::{category, product, product_image, subcategory};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("No {0} with {1} id was found.")]
    NotFound(&'static str, i32),
    #[error("Invalid page.")]
    InvalidPage,
    #[error(transparent)]
    Db(#[from] DbErr),
}

// SQLite binds offsets as i64.
const MAX_OFFSET: u64 = i64::MAX as u64;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CategoryRead {
    pub id: i32,
    pub name: String,
    pub picture: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SubcategoryRead {
    pub id: i32,
    pub category: i32,
    pub name: String,
    pub picture: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CategoryWithSubcategories {
    pub id: i32,
    pub name: String,
    pub picture: String,
    pub subcategory: Vec<SubcategoryRead>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ImageRead {
    pub image: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProductRead {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub subcategory: SubcategoryRead,
    pub category: CategoryRead,
    pub price: u32,
    pub picture: Vec<ImageRead>,
}

pub struct Catalog<'a, C> {
    conn: &'a C,
    config: &'a Config,
}

impl<'a, C: ConnectionTrait> Catalog<'a, C> {
    pub fn new(conn: &'a C, config: &'a Config) -> Self {
        Self { conn, config }
    }

    /// Limit/offset pagination; `path` is the request path the page links
    /// point back to.
    pub async fn list_categories(
        &self,
        path: &str,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Page<CategoryWithSubcategories>, CatalogError> {
        let limit = self.page_size(limit);
        let offset = offset.unwrap_or(0);
        let count = category::Entity::find().count(self.conn).await?;

        // Past the end, including offsets the database can not bind.
        let categories = if offset >= count {
            Vec::new()
        } else {
            category::Entity::find()
                .order_by_asc(category::Column::Id)
                .limit(limit)
                .offset(offset)
                .all(self.conn)
                .await?
        };

        Ok(Page {
            count,
            next: offset_links::next(path, limit, offset, count),
            previous: offset_links::previous(path, limit, offset),
            results: self.assemble_categories(categories).await?,
        })
    }

    pub async fn category(&self, id: i32) -> Result<CategoryWithSubcategories, CatalogError> {
        let category = category::Entity::find_by_id(id)
            .one(self.conn)
            .await?
            .ok_or(CatalogError::NotFound("category", id))?;

        let mut assembled = self.assemble_categories(vec![category]).await?;
        assembled.pop().ok_or(CatalogError::NotFound("category", id))
    }

    /// Page-number pagination starting at 1.
    pub async fn list_products(
        &self,
        path: &str,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> Result<Page<ProductRead>, CatalogError> {
        let requested_size = page_size;
        let page = page.unwrap_or(1);
        let page_size = self.page_size(page_size);
        let count = product::Entity::find().count(self.conn).await?;

        let offset = page
            .checked_sub(1)
            .and_then(|skipped| skipped.checked_mul(page_size))
            .filter(|offset| *offset <= MAX_OFFSET)
            .ok_or(CatalogError::InvalidPage)?;
        if page > 1 && offset >= count {
            return Err(CatalogError::InvalidPage);
        }

        let products = product::Entity::find()
            .order_by_asc(product::Column::Id)
            .limit(page_size)
            .offset(offset)
            .all(self.conn)
            .await?;

        let has_next = offset.saturating_add(page_size) < count;
        Ok(Page {
            count,
            next: has_next.then(|| page_link(path, Some(page + 1), requested_size)),
            previous: (page > 1)
                .then(|| page_link(path, Some(page - 1).filter(|p| *p > 1), requested_size)),
            results: self.assemble_products(products).await?,
        })
    }

    pub async fn product(&self, id: i32) -> Result<ProductRead, CatalogError> {
        let product = product::Entity::find_by_id(id)
            .one(self.conn)
            .await?
            .ok_or(CatalogError::NotFound("product", id))?;

        let mut assembled = self.assemble_products(vec![product]).await?;
        assembled.pop().ok_or(CatalogError::NotFound("product", id))
    }

    pub async fn assemble_categories(
        &self,
        categories: Vec<category::Model>,
    ) -> Result<Vec<CategoryWithSubcategories>, DbErr> {
        let subcategories = categories
            .load_many(subcategory::Entity, self.conn)
            .await?;

        Ok(categories
            .into_iter()
            .zip(subcategories)
            .map(|(category, mut subcategories)| {
                subcategories.sort_by_key(|s| s.id);
                category_read(self.config, category, subcategories)
            })
            .collect())
    }

    /// Attaches subcategory, category and images to each product, keeping
    /// the input order.
    pub async fn assemble_products(
        &self,
        products: Vec<product::Model>,
    ) -> Result<Vec<ProductRead>, DbErr> {
        let subcategories = products
            .load_one(subcategory::Entity, self.conn)
            .await?
            .into_iter()
            .zip(&products)
            .map(|(subcategory, product)| {
                subcategory.ok_or_else(|| {
                    DbErr::RecordNotFound(format!(
                        "subcategory {} of product {}",
                        product.subcategory_id, product.id
                    ))
                })
            })
            .collect::<Result<Vec<_>, DbErr>>()?;

        let categories = subcategories
            .load_one(category::Entity, self.conn)
            .await?;
        let images = products
            .load_many(product_image::Entity, self.conn)
            .await?;

        products
            .into_iter()
            .zip(subcategories)
            .zip(categories)
            .zip(images)
            .map(|(((product, subcategory), category), mut images)| -> Result<_, DbErr> {
                let category = category.ok_or_else(|| {
                    DbErr::RecordNotFound(format!(
                        "category {} of subcategory {}",
                        subcategory.category_id, subcategory.id
                    ))
                })?;
                images.sort_by_key(|i| i.id);
                Ok(product_read(self.config, product, subcategory, category, images))
            })
            .collect()
    }

    fn page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .filter(|size| *size > 0)
            .unwrap_or(self.config.page_size)
            .min(self.config.max_page_size)
    }
}

mod offset_links {
    pub fn next(path: &str, limit: u64, offset: u64, count: u64) -> Option<String> {
        let next = offset.checked_add(limit)?;
        (next < count).then(|| format!("{path}?limit={limit}&offset={next}"))
    }

    pub fn previous(path: &str, limit: u64, offset: u64) -> Option<String> {
        match offset {
            0 => None,
            offset if offset <= limit => Some(format!("{path}?limit={limit}")),
            offset => Some(format!("{path}?limit={limit}&offset={}", offset - limit)),
        }
    }
}

/// The first page is linked without a `page` parameter.
fn page_link(path: &str, page: Option<u64>, page_size: Option<u64>) -> String {
    let query: Vec<String> = page
        .map(|page| format!("page={page}"))
        .into_iter()
        .chain(page_size.map(|size| format!("page_size={size}")))
        .collect();
    if query.is_empty() {
        path.to_owned()
    } else {
        format!("{path}?{}", query.join("&"))
    }
}

fn subcategory_read(config: &Config, subcategory: subcategory::Model) -> SubcategoryRead {
    SubcategoryRead {
        id: subcategory.id,
        category: subcategory.category_id,
        name: subcategory.name,
        picture: config.media(&subcategory.picture),
    }
}

pub fn category_read(
    config: &Config,
    category: category::Model,
    subcategories: Vec<subcategory::Model>,
) -> CategoryWithSubcategories {
    CategoryWithSubcategories {
        id: category.id,
        name: category.name,
        picture: config.media(&category.picture),
        subcategory: subcategories
            .into_iter()
            .map(|s| subcategory_read(config, s))
            .collect(),
    }
}

pub fn product_read(
    config: &Config,
    product: product::Model,
    subcategory: subcategory::Model,
    category: category::Model,
    images: Vec<product_image::Model>,
) -> ProductRead {
    ProductRead {
        id: product.id,
        name: product.name,
        slug: product.slug,
        subcategory: subcategory_read(config, subcategory),
        category: CategoryRead {
            id: category.id,
            name: category.name,
            picture: config.media(&category.picture),
        },
        price: product.price,
        picture: images
            .into_iter()
            .map(|i| ImageRead {
                image: config.media(&i.image),
            })
            .collect(),
    }
}
