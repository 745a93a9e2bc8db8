use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{RepoError, StockTable};
use crate::domain::location::LocationId;
use crate::domain::stock::{ProductId, Quantity, StockLevels, StockRecord};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct StockRow {
    product_id: i64,
    location_id: i64,
    stock: i64,
    reserved_stock: i64,
    min_stock: i64,
    updated_at: OffsetDateTime,
}

impl From<StockRow> for StockRecord {
    fn from(row: StockRow) -> Self {
        Self {
            product_id: row.product_id,
            location_id: row.location_id,
            stock: row.stock,
            reserved: row.reserved_stock,
            minimum: row.min_stock,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl StockTable for PostgresRepositories {
    async fn get(
        &self,
        product_id: ProductId,
        location_id: LocationId,
    ) -> Result<Option<StockRecord>, RepoError> {
        let row = sqlx::query_as::<_, StockRow>(
            r#"
            SELECT product_id, location_id, stock, reserved_stock, min_stock, updated_at
            FROM location_stock
            WHERE product_id = $1 AND location_id = $2
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(StockRecord::from))
    }

    async fn upsert_levels(
        &self,
        product_id: ProductId,
        location_id: LocationId,
        levels: StockLevels,
    ) -> Result<StockRecord, RepoError> {
        let row = sqlx::query_as::<_, StockRow>(
            r#"
            INSERT INTO location_stock (product_id, location_id, stock, reserved_stock, min_stock)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (product_id, location_id) DO UPDATE
            SET stock = EXCLUDED.stock,
                reserved_stock = EXCLUDED.reserved_stock,
                min_stock = EXCLUDED.min_stock,
                updated_at = now()
            RETURNING product_id, location_id, stock, reserved_stock, min_stock, updated_at
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .bind(levels.stock)
        .bind(levels.reserved)
        .bind(levels.minimum)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn upsert_quantity(
        &self,
        product_id: ProductId,
        location_id: LocationId,
        quantity: Quantity,
    ) -> Result<StockRecord, RepoError> {
        let row = sqlx::query_as::<_, StockRow>(
            r#"
            INSERT INTO location_stock (product_id, location_id, stock)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, location_id) DO UPDATE
            SET stock = EXCLUDED.stock,
                updated_at = now()
            RETURNING product_id, location_id, stock, reserved_stock, min_stock, updated_at
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .bind(quantity)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn sum_by_product(&self, product_id: ProductId) -> Result<Quantity, RepoError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(stock), 0)::BIGINT FROM location_stock WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_by_product(&self, product_id: ProductId) -> Result<Vec<StockRecord>, RepoError> {
        let rows = sqlx::query_as::<_, StockRow>(
            r#"
            SELECT product_id, location_id, stock, reserved_stock, min_stock, updated_at
            FROM location_stock
            WHERE product_id = $1
            ORDER BY location_id
            "#,
        )
        .bind(product_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(StockRecord::from).collect())
    }
}
