pub mod cart;
pub mod category;
pub mod product;
pub mod product_image;
pub mod subcategory;
pub mod user;

use sea_orm::{
    sea_query::{Index, IndexCreateStatement},
    ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema,
};

pub const CART_UNIQUE_INDEX: &str = "idx-cart-user-product";

/// Creates every table in foreign key order. Safe to run against an existing
/// database.
pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, user::Entity).await?;
    create_table(db, &schema, category::Entity).await?;
    create_table(db, &schema, subcategory::Entity).await?;
    create_table(db, &schema, product::Entity).await?;
    create_table(db, &schema, product_image::Entity).await?;
    create_table(db, &schema, cart::Entity).await?;

    db.execute(db.get_database_backend().build(&cart_unique_index()))
        .await?;

    tracing::debug!("Database schema is ready");
    Ok(())
}

/// Storage-level guard for one line per (user, product).
pub fn cart_unique_index() -> IndexCreateStatement {
    Index::create()
        .name(CART_UNIQUE_INDEX)
        .table(cart::Entity)
        .col(cart::Column::UserId)
        .col(cart::Column::ProductId)
        .unique()
        .if_not_exists()
        .to_owned()
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();

    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(backend.build(&table)).await?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }

    Ok(())
}
