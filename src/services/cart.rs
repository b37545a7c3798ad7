//! Cart mutations for one user. A `CartService` is built per request from
//! the caller's claims.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, LoaderTrait,
    ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::entities::{cart, product};
use crate::services::amount::{initial_amount, Amount, AmountError, Outcome};
use crate::services::catalog::{Catalog, ProductRead};

#[derive(Error, Debug)]
pub enum CartError {
    #[error(transparent)]
    Validation(#[from] AmountError),
    #[error("Duplicate product in cart.")]
    Duplicate,
    #[error("No product with {0} id was found.")]
    ProductNotFound(i32),
    #[error("No cart entry for product {0} was found.")]
    LineNotFound(i32),
    #[error("Product is not in cart.")]
    NotInCart,
    #[error("Cart is already empty.")]
    EmptyCart,
    #[error(transparent)]
    Db(#[from] DbErr),
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CartLineRead {
    pub product: ProductRead,
    pub amount: u32,
    pub price: u64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CartRead {
    pub products: Vec<CartLineRead>,
    pub count: usize,
    pub total_price: u64,
}

#[derive(Debug)]
pub enum Updated {
    Line(CartLineRead),
    Removed,
}

pub struct CartService<'a> {
    db: &'a DatabaseConnection,
    config: &'a Config,
    user_id: i32,
}

impl<'a> CartService<'a> {
    pub fn new(db: &'a DatabaseConnection, config: &'a Config, user_id: i32) -> Self {
        Self {
            db,
            config,
            user_id,
        }
    }

    /// Creates the (user, product) line. A second add for the same product
    /// hits the unique index and comes back as [`CartError::Duplicate`].
    pub async fn add(
        &self,
        product_id: i32,
        amount: Option<u32>,
    ) -> Result<CartLineRead, CartError> {
        let product = self.find_product(product_id).await?;
        let amount = initial_amount(amount)?;

        let line = cart::ActiveModel {
            user_id: Set(self.user_id),
            product_id: Set(product.id),
            quantity: Set(amount),
            ..Default::default()
        };

        let line = match line.insert(self.db).await {
            Ok(line) => line,
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(CartError::Duplicate);
            }
            Err(err) => return Err(err.into()),
        };

        debug!(user_id = self.user_id, product_id, amount, "Added cart line");
        self.read_line(product, line.quantity).await
    }

    pub async fn update(&self, product_id: i32, raw_amount: &str) -> Result<Updated, CartError> {
        let amount: Amount = raw_amount.parse()?;
        let product = self.find_product(product_id).await?;

        let txn = self.db.begin().await?;

        let line = cart::Entity::find()
            .filter(cart::Column::UserId.eq(self.user_id))
            .filter(cart::Column::ProductId.eq(product_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(CartError::LineNotFound(product_id))?;

        match amount.apply(line.quantity)? {
            Outcome::Remove => {
                line.delete(&txn).await?;
                txn.commit().await?;
                debug!(user_id = self.user_id, product_id, "Removed cart line by amount");
                Ok(Updated::Removed)
            }
            Outcome::Keep(quantity) => {
                let mut line: cart::ActiveModel = line.into();
                line.quantity = Set(quantity);
                let line = line.update(&txn).await?;
                txn.commit().await?;
                debug!(user_id = self.user_id, product_id, quantity, "Updated cart line");
                Ok(Updated::Line(self.read_line(product, line.quantity).await?))
            }
        }
    }

    pub async fn remove(&self, product_id: i32) -> Result<(), CartError> {
        self.find_product(product_id).await?;

        let result = cart::Entity::delete_many()
            .filter(cart::Column::UserId.eq(self.user_id))
            .filter(cart::Column::ProductId.eq(product_id))
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(CartError::NotInCart);
        }
        Ok(())
    }

    pub async fn clear(&self) -> Result<u64, CartError> {
        let result = cart::Entity::delete_many()
            .filter(cart::Column::UserId.eq(self.user_id))
            .exec(self.db)
            .await?;

        match result.rows_affected {
            0 => Err(CartError::EmptyCart),
            removed => Ok(removed),
        }
    }

    pub async fn list(&self) -> Result<CartRead, CartError> {
        let lines = cart::Entity::find()
            .filter(cart::Column::UserId.eq(self.user_id))
            .order_by_asc(cart::Column::Id)
            .all(self.db)
            .await?;

        let products = lines
            .load_one(product::Entity, self.db)
            .await?
            .into_iter()
            .zip(&lines)
            .map(|(product, line)| {
                product.ok_or_else(|| {
                    DbErr::RecordNotFound(format!(
                        "product {} of cart line {}",
                        line.product_id, line.id
                    ))
                })
            })
            .collect::<Result<Vec<_>, DbErr>>()?;

        let products = Catalog::new(self.db, self.config)
            .assemble_products(products)
            .await?;

        Ok(cart_read(
            products
                .into_iter()
                .zip(lines)
                .map(|(product, line)| line_read(product, line.quantity))
                .collect(),
        ))
    }

    async fn find_product(&self, product_id: i32) -> Result<product::Model, CartError> {
        product::Entity::find_by_id(product_id)
            .one(self.db)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))
    }

    async fn read_line(
        &self,
        product: product::Model,
        amount: u32,
    ) -> Result<CartLineRead, CartError> {
        let product_id = product.id;
        let product = Catalog::new(self.db, self.config)
            .assemble_products(vec![product])
            .await?
            .pop()
            .ok_or(CartError::ProductNotFound(product_id))?;

        Ok(line_read(product, amount))
    }
}

pub fn line_read(product: ProductRead, amount: u32) -> CartLineRead {
    let price = u64::from(product.price) * u64::from(amount);
    CartLineRead {
        product,
        amount,
        price,
    }
}

pub fn cart_read(products: Vec<CartLineRead>) -> CartRead {
    CartRead {
        count: products.len(),
        total_price: products.iter().map(|line| line.price).sum(),
        products,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::{CategoryRead, SubcategoryRead};

    fn product(id: i32, price: u32) -> ProductRead {
        ProductRead {
            id,
            name: format!("product {id}"),
            slug: format!("product-{id}"),
            subcategory: SubcategoryRead {
                id: 1,
                category: 1,
                name: "Bread".into(),
                picture: "/media/bread.png".into(),
            },
            category: CategoryRead {
                id: 1,
                name: "Bakery".into(),
                picture: "/media/bakery.png".into(),
            },
            price,
            picture: Vec::new(),
        }
    }

    #[test]
    fn line_price_is_unit_times_amount() {
        assert_eq!(line_read(product(1, 100), 1).price, 100);
        assert_eq!(line_read(product(1, 100), 3).price, 300);
    }

    #[test]
    fn line_price_does_not_overflow_u32() {
        let line = line_read(product(1, 1_000_000), 1_000);
        assert_eq!(line.price, 1_000_000_000);
        let line = line_read(product(1, u32::MAX), 2);
        assert_eq!(line.price, u64::from(u32::MAX) * 2);
    }

    #[test]
    fn cart_totals_sum_every_line() {
        let cart = cart_read(vec![line_read(product(1, 100), 2), line_read(product(2, 35), 3)]);

        assert_eq!(cart.count, 2);
        assert_eq!(cart.total_price, 200 + 105);
    }

    #[test]
    fn empty_cart_totals_zero() {
        let cart = cart_read(Vec::new());

        assert_eq!(cart.count, 0);
        assert_eq!(cart.total_price, 0);
        assert_eq!(serde_json::to_value(&cart).unwrap()["products"], serde_json::json!([]));
    }
}
