//! `cars` table, always read joined with its category.

use crate::error::{corrupt, delete_error, query_error, write_error};
use crate::{limit_offset, total, PgDatabase};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rentcar_core::money::Money;
use rentcar_core::pagination::{Page, PageRequest};
use rentcar_core::repository::{conflicts, CarFilter, CarRepository, RepositoryError, Result};
use rentcar_core::types::{Car, CarId, CarView, CategoryId, NewCar};
use sqlx::{Postgres, QueryBuilder};

const VIEW_COLUMNS: &str = "c.id, c.category_id, c.slug, c.name, c.transmission, c.fuel, c.color, \
     c.plate_number, c.capacity, c.registration_number, c.price, c.image, c.status, \
     c.created_at, c.updated_at, cat.car_brand, cat.car_type";

const JOIN_CATEGORY: &str = "JOIN car_categories cat ON cat.id = c.category_id";

#[derive(sqlx::FromRow)]
struct CarViewRow {
    id: i64,
    category_id: i64,
    slug: String,
    name: String,
    transmission: String,
    fuel: String,
    color: String,
    plate_number: String,
    capacity: i32,
    registration_number: i64,
    price: i64,
    image: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    car_brand: String,
    car_type: String,
}

impl TryFrom<CarViewRow> for CarView {
    type Error = RepositoryError;

    fn try_from(row: CarViewRow) -> Result<Self> {
        let car = Car {
            id: CarId::new(row.id),
            category_id: CategoryId::new(row.category_id),
            transmission: row
                .transmission
                .parse()
                .map_err(|_| corrupt("transmission", &row.transmission))?,
            fuel: row.fuel.parse().map_err(|_| corrupt("fuel", &row.fuel))?,
            status: row.status.parse().map_err(|_| corrupt("status", &row.status))?,
            slug: row.slug,
            name: row.name,
            color: row.color,
            plate_number: row.plate_number,
            capacity: row.capacity,
            registration_number: row.registration_number,
            price: Money::from_minor(row.price),
            image: row.image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        };
        Ok(Self {
            car,
            car_brand: row.car_brand,
            car_type: row.car_type,
        })
    }
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &CarFilter) {
    let mut clauses = 0;
    let mut keyword = |query: &mut QueryBuilder<'_, Postgres>| {
        query.push(if clauses == 0 { " WHERE " } else { " AND " });
        clauses += 1;
    };

    if let Some(brand) = &filter.car_brand {
        keyword(query);
        query.push("cat.car_brand = ").push_bind(brand.clone());
    }
    if let Some(car_type) = &filter.car_type {
        keyword(query);
        query.push("cat.car_type = ").push_bind(car_type.clone());
    }
    if let Some(status) = filter.status {
        keyword(query);
        query.push("c.status = ").push_bind(status.as_str());
    }
}

impl PgDatabase {
    /// One car by a unique text column.
    async fn car_by(&self, column: &str, value: &str) -> Result<Option<CarView>> {
        let sql = format!("SELECT {VIEW_COLUMNS} FROM cars c {JOIN_CATEGORY} WHERE c.{column} = $1 ORDER BY c.id LIMIT 1");
        let row: Option<CarViewRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(self.pool())
            .await
            .map_err(query_error)?;
        row.map(CarView::try_from).transpose()
    }
}

#[async_trait]
impl CarRepository for PgDatabase {
    async fn create(&self, car: NewCar) -> Result<CarView> {
        let row: CarViewRow = sqlx::query_as(&format!(
            r"
            WITH c AS (
                INSERT INTO cars (
                    category_id, slug, name, transmission, fuel, color, plate_number,
                    capacity, registration_number, price, image, status
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                RETURNING *
            )
            SELECT {VIEW_COLUMNS} FROM c {JOIN_CATEGORY}
            "
        ))
        .bind(car.category_id.get())
        .bind(&car.slug)
        .bind(&car.name)
        .bind(car.transmission.as_str())
        .bind(car.fuel.as_str())
        .bind(&car.color)
        .bind(&car.plate_number)
        .bind(car.capacity)
        .bind(car.registration_number)
        .bind(car.price.minor())
        .bind(&car.image)
        .bind(car.status.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(write_error)?;

        tracing::debug!(car_id = row.id, slug = %row.slug, "Car inserted");
        CarView::try_from(row)
    }

    async fn find(&self, id: CarId) -> Result<Option<CarView>> {
        let row: Option<CarViewRow> = sqlx::query_as(&format!(
            "SELECT {VIEW_COLUMNS} FROM cars c {JOIN_CATEGORY} WHERE c.id = $1"
        ))
        .bind(id.get())
        .fetch_optional(self.pool())
        .await
        .map_err(query_error)?;
        row.map(CarView::try_from).transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CarView>> {
        self.car_by("slug", slug).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CarView>> {
        self.car_by("name", name).await
    }

    async fn list(&self, filter: &CarFilter, page: PageRequest) -> Result<Page<CarView>> {
        let (limit, offset) = limit_offset(page);

        let mut query = QueryBuilder::new(format!("SELECT {VIEW_COLUMNS} FROM cars c {JOIN_CATEGORY}"));
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY c.created_at DESC, c.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows: Vec<CarViewRow> = query
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(query_error)?;

        let mut count = QueryBuilder::new(format!("SELECT COUNT(*) FROM cars c {JOIN_CATEGORY}"));
        push_filter(&mut count, filter);
        let (count,): (i64,) = count
            .build_query_as()
            .fetch_one(self.pool())
            .await
            .map_err(query_error)?;

        let cars = rows.into_iter().map(CarView::try_from).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(cars, total(count), page))
    }

    async fn update(&self, car: &Car) -> Result<CarView> {
        let row: CarViewRow = sqlx::query_as(&format!(
            r"
            WITH c AS (
                UPDATE cars
                SET category_id = $2,
                    slug = $3,
                    name = $4,
                    transmission = $5,
                    fuel = $6,
                    color = $7,
                    plate_number = $8,
                    capacity = $9,
                    registration_number = $10,
                    price = $11,
                    image = $12,
                    status = $13,
                    updated_at = now()
                WHERE id = $1
                RETURNING *
            )
            SELECT {VIEW_COLUMNS} FROM c {JOIN_CATEGORY}
            "
        ))
        .bind(car.id.get())
        .bind(car.category_id.get())
        .bind(&car.slug)
        .bind(&car.name)
        .bind(car.transmission.as_str())
        .bind(car.fuel.as_str())
        .bind(&car.color)
        .bind(&car.plate_number)
        .bind(car.capacity)
        .bind(car.registration_number)
        .bind(car.price.minor())
        .bind(&car.image)
        .bind(car.status.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(write_error)?;

        CarView::try_from(row)
    }

    async fn delete(&self, id: CarId) -> Result<()> {
        let result = sqlx::query("DELETE FROM cars WHERE id = $1")
            .bind(id.get())
            .execute(self.pool())
            .await
            .map_err(|e| delete_error(e, conflicts::CAR_IN_USE))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
