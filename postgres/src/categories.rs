//! `car_categories` table.

use crate::error::{delete_error, query_error, write_error};
use crate::{limit_offset, total, PgDatabase};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rentcar_core::pagination::{Page, PageRequest};
use rentcar_core::repository::{conflicts, CategoryRepository, RepositoryError, Result};
use rentcar_core::types::{BrandTypes, CarCategory, CategoryId, NewCategory};

const COLUMNS: &str = "id, car_brand, car_type, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    car_brand: String,
    car_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for CarCategory {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            car_brand: row.car_brand,
            car_type: row.car_type,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl CategoryRepository for PgDatabase {
    async fn create(&self, category: NewCategory) -> Result<CarCategory> {
        let row: CategoryRow = sqlx::query_as(&format!(
            "INSERT INTO car_categories (car_brand, car_type) VALUES ($1, $2) RETURNING {COLUMNS}"
        ))
        .bind(&category.car_brand)
        .bind(&category.car_type)
        .fetch_one(self.pool())
        .await
        .map_err(write_error)?;
        Ok(row.into())
    }

    async fn find(&self, id: CategoryId) -> Result<Option<CarCategory>> {
        let row: Option<CategoryRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM car_categories WHERE id = $1"))
                .bind(id.get())
                .fetch_optional(self.pool())
                .await
                .map_err(query_error)?;
        Ok(row.map(Into::into))
    }

    async fn find_by_brand_type(&self, brand: &str, car_type: &str) -> Result<Option<CarCategory>> {
        let row: Option<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM car_categories WHERE car_brand = $1 AND car_type = $2"
        ))
        .bind(brand)
        .bind(car_type)
        .fetch_optional(self.pool())
        .await
        .map_err(query_error)?;
        Ok(row.map(Into::into))
    }

    async fn update(&self, category: &CarCategory) -> Result<CarCategory> {
        let row: CategoryRow = sqlx::query_as(&format!(
            r"
            UPDATE car_categories
            SET car_brand = $2, car_type = $3, updated_at = now()
            WHERE id = $1
            RETURNING {COLUMNS}
            "
        ))
        .bind(category.id.get())
        .bind(&category.car_brand)
        .bind(&category.car_type)
        .fetch_one(self.pool())
        .await
        .map_err(write_error)?;
        Ok(row.into())
    }

    async fn delete(&self, id: CategoryId) -> Result<()> {
        let result = sqlx::query("DELETE FROM car_categories WHERE id = $1")
            .bind(id.get())
            .execute(self.pool())
            .await
            .map_err(|e| delete_error(e, conflicts::CATEGORY_IN_USE))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, page: PageRequest) -> Result<Page<CarCategory>> {
        let (limit, offset) = limit_offset(page);
        let rows: Vec<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM car_categories ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await
        .map_err(query_error)?;

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM car_categories")
            .fetch_one(self.pool())
            .await
            .map_err(query_error)?;

        Ok(Page::new(rows.into_iter().map(Into::into).collect(), total(count), page))
    }

    async fn brands(&self) -> Result<Vec<BrandTypes>> {
        let rows: Vec<(String, Vec<String>)> = sqlx::query_as(
            r"
            SELECT car_brand, array_agg(DISTINCT car_type ORDER BY car_type)
            FROM car_categories
            GROUP BY car_brand
            ORDER BY car_brand
            ",
        )
        .fetch_all(self.pool())
        .await
        .map_err(query_error)?;

        Ok(rows
            .into_iter()
            .map(|(car_brand, types)| BrandTypes { car_brand, types })
            .collect())
    }
}
