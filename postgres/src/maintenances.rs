//! `car_maintenances` table, read joined with the car's name.

use crate::error::{query_error, write_error};
use crate::{limit_offset, total, PgDatabase};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rentcar_core::money::Money;
use rentcar_core::pagination::{Page, PageRequest};
use rentcar_core::repository::{MaintenanceRepository, RepositoryError, Result};
use rentcar_core::types::{CarId, CarMaintenance, MaintenanceId, MaintenanceView, NewMaintenance};

const VIEW_COLUMNS: &str =
    "m.id, m.car_id, m.maintenance_date, m.description, m.cost, m.created_at, m.updated_at, c.name AS car_name";

const JOIN_CAR: &str = "JOIN cars c ON c.id = m.car_id";

#[derive(sqlx::FromRow)]
struct MaintenanceViewRow {
    id: i64,
    car_id: i64,
    maintenance_date: NaiveDate,
    description: String,
    cost: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    car_name: String,
}

impl From<MaintenanceViewRow> for MaintenanceView {
    fn from(row: MaintenanceViewRow) -> Self {
        Self {
            maintenance: CarMaintenance {
                id: MaintenanceId::new(row.id),
                car_id: CarId::new(row.car_id),
                maintenance_date: row.maintenance_date,
                description: row.description,
                cost: Money::from_minor(row.cost),
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            car_name: row.car_name,
        }
    }
}

#[async_trait]
impl MaintenanceRepository for PgDatabase {
    async fn create(&self, record: NewMaintenance) -> Result<MaintenanceView> {
        let row: MaintenanceViewRow = sqlx::query_as(&format!(
            r"
            WITH m AS (
                INSERT INTO car_maintenances (car_id, maintenance_date, description, cost)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            )
            SELECT {VIEW_COLUMNS} FROM m {JOIN_CAR}
            "
        ))
        .bind(record.car_id.get())
        .bind(record.maintenance_date)
        .bind(&record.description)
        .bind(record.cost.minor())
        .fetch_one(self.pool())
        .await
        .map_err(write_error)?;
        Ok(row.into())
    }

    async fn find(&self, id: MaintenanceId) -> Result<Option<MaintenanceView>> {
        let row: Option<MaintenanceViewRow> = sqlx::query_as(&format!(
            "SELECT {VIEW_COLUMNS} FROM car_maintenances m {JOIN_CAR} WHERE m.id = $1"
        ))
        .bind(id.get())
        .fetch_optional(self.pool())
        .await
        .map_err(query_error)?;
        Ok(row.map(Into::into))
    }

    async fn list(&self, page: PageRequest) -> Result<Page<MaintenanceView>> {
        let (limit, offset) = limit_offset(page);
        let rows: Vec<MaintenanceViewRow> = sqlx::query_as(&format!(
            r"
            SELECT {VIEW_COLUMNS} FROM car_maintenances m {JOIN_CAR}
            ORDER BY m.maintenance_date DESC, m.id DESC
            LIMIT $1 OFFSET $2
            "
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await
        .map_err(query_error)?;

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM car_maintenances")
            .fetch_one(self.pool())
            .await
            .map_err(query_error)?;

        Ok(Page::new(rows.into_iter().map(Into::into).collect(), total(count), page))
    }

    async fn update(&self, record: &CarMaintenance) -> Result<MaintenanceView> {
        let row: MaintenanceViewRow = sqlx::query_as(&format!(
            r"
            WITH m AS (
                UPDATE car_maintenances
                SET car_id = $2,
                    maintenance_date = $3,
                    description = $4,
                    cost = $5,
                    updated_at = now()
                WHERE id = $1
                RETURNING *
            )
            SELECT {VIEW_COLUMNS} FROM m {JOIN_CAR}
            "
        ))
        .bind(record.id.get())
        .bind(record.car_id.get())
        .bind(record.maintenance_date)
        .bind(&record.description)
        .bind(record.cost.minor())
        .fetch_one(self.pool())
        .await
        .map_err(write_error)?;
        Ok(row.into())
    }

    async fn delete(&self, id: MaintenanceId) -> Result<()> {
        let result = sqlx::query("DELETE FROM car_maintenances WHERE id = $1")
            .bind(id.get())
            .execute(self.pool())
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
