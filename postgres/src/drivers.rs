//! `drivers` table.

use crate::error::{corrupt, delete_error, query_error, write_error};
use crate::{limit_offset, total, PgDatabase};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rentcar_core::pagination::{Page, PageRequest};
use rentcar_core::repository::{conflicts, DriverRepository, RepositoryError, Result};
use rentcar_core::types::{Driver, DriverId, DriverStatus, NewDriver};

const COLUMNS: &str =
    "id, name, gender, dob, address, phone_number, license_number, status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct DriverRow {
    id: i64,
    name: String,
    gender: String,
    dob: NaiveDate,
    address: String,
    phone_number: String,
    license_number: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DriverRow> for Driver {
    type Error = RepositoryError;

    fn try_from(row: DriverRow) -> Result<Self> {
        Ok(Self {
            id: DriverId::new(row.id),
            gender: row.gender.parse().map_err(|_| corrupt("gender", &row.gender))?,
            status: row.status.parse().map_err(|_| corrupt("status", &row.status))?,
            name: row.name,
            dob: row.dob,
            address: row.address,
            phone_number: row.phone_number,
            license_number: row.license_number,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn collect(rows: Vec<DriverRow>) -> Result<Vec<Driver>> {
    rows.into_iter().map(Driver::try_from).collect()
}

#[async_trait]
impl DriverRepository for PgDatabase {
    async fn create(&self, driver: NewDriver) -> Result<Driver> {
        let row: DriverRow = sqlx::query_as(&format!(
            r"
            INSERT INTO drivers (name, gender, dob, address, phone_number, license_number, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "
        ))
        .bind(&driver.name)
        .bind(driver.gender.as_str())
        .bind(driver.dob)
        .bind(&driver.address)
        .bind(&driver.phone_number)
        .bind(&driver.license_number)
        .bind(driver.status.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(write_error)?;
        Driver::try_from(row)
    }

    async fn find(&self, id: DriverId) -> Result<Option<Driver>> {
        let row: Option<DriverRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM drivers WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(self.pool())
            .await
            .map_err(query_error)?;
        row.map(Driver::try_from).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Driver>> {
        let row: Option<DriverRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM drivers WHERE name = $1 ORDER BY id LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(self.pool())
        .await
        .map_err(query_error)?;
        row.map(Driver::try_from).transpose()
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Driver>> {
        let (limit, offset) = limit_offset(page);
        let rows: Vec<DriverRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM drivers ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await
        .map_err(query_error)?;

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM drivers")
            .fetch_one(self.pool())
            .await
            .map_err(query_error)?;

        Ok(Page::new(collect(rows)?, total(count), page))
    }

    async fn list_available(&self) -> Result<Vec<Driver>> {
        let rows: Vec<DriverRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM drivers WHERE status = $1 ORDER BY id"
        ))
        .bind(DriverStatus::Available.as_str())
        .fetch_all(self.pool())
        .await
        .map_err(query_error)?;
        collect(rows)
    }

    async fn update(&self, driver: &Driver) -> Result<Driver> {
        let row: DriverRow = sqlx::query_as(&format!(
            r"
            UPDATE drivers
            SET name = $2,
                gender = $3,
                dob = $4,
                address = $5,
                phone_number = $6,
                license_number = $7,
                status = $8,
                updated_at = now()
            WHERE id = $1
            RETURNING {COLUMNS}
            "
        ))
        .bind(driver.id.get())
        .bind(&driver.name)
        .bind(driver.gender.as_str())
        .bind(driver.dob)
        .bind(&driver.address)
        .bind(&driver.phone_number)
        .bind(&driver.license_number)
        .bind(driver.status.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(write_error)?;
        Driver::try_from(row)
    }

    async fn delete(&self, id: DriverId) -> Result<()> {
        let result = sqlx::query("DELETE FROM drivers WHERE id = $1")
            .bind(id.get())
            .execute(self.pool())
            .await
            .map_err(|e| delete_error(e, conflicts::DRIVER_IN_USE))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
