// src/db/product_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, FromRow, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::catalog::{Category, Product},
    services::availability::AvailabilityWindow,
};

const PRODUCT_COLUMNS: &str = "id, owner_id, name, description, hourly_price, image_path, \
     available_from, available_until, legacy_availability, created_at, updated_at";

// Linha do JOIN produto <-> categoria
#[derive(Debug, FromRow)]
pub struct ProductCategoryRow {
    pub product_id: Uuid,
    #[sqlx(flatten)]
    pub category: Category,
}

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(product)
    }

    pub async fn find_many<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(executor)
        .await?;
        Ok(products)
    }

    /// Categorias de vários produtos de uma vez.
    pub async fn categories_for<'e, E>(
        &self,
        executor: E,
        product_ids: &[Uuid],
    ) -> Result<Vec<ProductCategoryRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ProductCategoryRow>(
            r#"
            SELECT pc.product_id, c.id, c.name, c.slug, c.created_at, c.updated_at
            FROM product_categories pc
            JOIN categories c ON c.id = pc.category_id
            WHERE pc.product_id = ANY($1)
            ORDER BY c.name
            "#,
        )
        .bind(product_ids)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create<'e, E>(
        &self,
        executor: E,
        owner_id: Uuid,
        name: &str,
        description: &str,
        hourly_price: Decimal,
        image_path: Option<&str>,
        window: AvailabilityWindow,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (owner_id, name, description, hourly_price, image_path, available_from, available_until)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(name)
        .bind(description)
        .bind(hourly_price)
        .bind(image_path)
        .bind(window.start())
        .bind(window.end())
        .fetch_one(executor)
        .await?;
        Ok(product)
    }

    /// Atualização parcial. A janela só é trocada quando `window` vem preenchida.
    #[allow(clippy::too_many_arguments)]
    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        hourly_price: Option<Decimal>,
        image_path: Option<&str>,
        window: Option<AvailabilityWindow>,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                hourly_price = COALESCE($4, hourly_price),
                image_path = COALESCE($5, image_path),
                available_from = COALESCE($6, available_from),
                available_until = COALESCE($7, available_until),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(hourly_price)
        .bind(image_path)
        .bind(window.map(|w| w.start()))
        .bind(window.map(|w| w.end()))
        .fetch_optional(executor)
        .await?;
        Ok(product)
    }

    /// Substitui o conjunto de categorias do produto.
    pub async fn set_categories(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
        category_ids: &[Uuid],
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM product_categories WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO product_categories (product_id, category_id)
            SELECT $1, category_id FROM UNNEST($2::uuid[]) AS t(category_id)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(product_id)
        .bind(category_ids)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---
    // Backfill da disponibilidade herdada
    // ---

    /// Produtos com string herdada e sem janela estruturada.
    pub async fn find_pending_legacy(&self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE legacy_availability IS NOT NULL AND available_from IS NULL
            "#
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn set_window(&self, id: Uuid, window: AvailabilityWindow) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE products SET available_from = $2, available_until = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(window.start())
        .bind(window.end())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
