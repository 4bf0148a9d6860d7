//! `transactions` table and the guarded rental commit.

use crate::error::{corrupt, query_error, write_error};
use crate::{limit_offset, total, PgDatabase};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rentcar_core::money::Money;
use rentcar_core::pagination::{Page, PageRequest};
use rentcar_core::repository::{
    conflicts, RentalChange, RepositoryError, Result, StatusTransition, TransactionFilter,
    TransactionRepository, TransactionWrite,
};
use rentcar_core::types::{
    CarData, CarId, CarStatus, DriverData, DriverId, DriverStatus, Transaction, TransactionId,
    TransactionView, UserId,
};
use sqlx::{PgConnection, Postgres, QueryBuilder};

const COLUMNS: &str = "id, user_id, car_id, driver_id, invoice, start_date, end_date, return_date, \
     rental_status, payment_status, payment_proof, late_fee, total_cost, created_at, updated_at";

const VIEW_SELECT: &str = r"
    SELECT t.id, t.user_id, t.car_id, t.driver_id, t.invoice, t.start_date, t.end_date,
           t.return_date, t.rental_status, t.payment_status, t.payment_proof, t.late_fee,
           t.total_cost, t.created_at, t.updated_at,
           u.name AS customer_name,
           cat.car_brand, c.name AS car_name, c.price AS car_price, cat.car_type,
           c.image AS car_image, c.slug AS car_slug,
           d.name AS driver_name, d.phone_number AS driver_phone_number
    FROM transactions t
    JOIN users u ON u.id = t.user_id
    JOIN cars c ON c.id = t.car_id
    JOIN car_categories cat ON cat.id = c.category_id
    LEFT JOIN drivers d ON d.id = t.driver_id";

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    user_id: i64,
    car_id: i64,
    driver_id: Option<i64>,
    invoice: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    return_date: Option<NaiveDate>,
    rental_status: String,
    payment_status: String,
    payment_proof: Option<String>,
    late_fee: Option<i64>,
    total_cost: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = RepositoryError;

    fn try_from(row: TransactionRow) -> Result<Self> {
        Ok(Self {
            id: TransactionId::new(row.id),
            user_id: UserId::new(row.user_id),
            car_id: CarId::new(row.car_id),
            driver_id: row.driver_id.map(DriverId::new),
            rental_status: row
                .rental_status
                .parse()
                .map_err(|_| corrupt("rental_status", &row.rental_status))?,
            payment_status: row
                .payment_status
                .parse()
                .map_err(|_| corrupt("payment_status", &row.payment_status))?,
            invoice: row.invoice,
            start_date: row.start_date,
            end_date: row.end_date,
            return_date: row.return_date,
            payment_proof: row.payment_proof,
            late_fee: row.late_fee.map(Money::from_minor),
            total_cost: Money::from_minor(row.total_cost),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TransactionViewRow {
    #[sqlx(flatten)]
    transaction: TransactionRow,
    customer_name: String,
    car_brand: String,
    car_name: String,
    car_price: i64,
    car_type: String,
    car_image: String,
    car_slug: String,
    driver_name: Option<String>,
    driver_phone_number: Option<String>,
}

impl TryFrom<TransactionViewRow> for TransactionView {
    type Error = RepositoryError;

    fn try_from(row: TransactionViewRow) -> Result<Self> {
        let transaction = Transaction::try_from(row.transaction)?;
        let driver_data = match (row.driver_name, row.driver_phone_number) {
            (Some(driver_name), Some(driver_phone_number)) => Some(DriverData {
                driver_name,
                driver_phone_number,
            }),
            _ => None,
        };
        Ok(Self {
            customer_name: row.customer_name,
            rent_duration: transaction.rent_duration(),
            car_data: CarData {
                car_brand: row.car_brand,
                car_name: row.car_name,
                car_price: Money::from_minor(row.car_price),
                car_type: row.car_type,
                car_image: row.car_image,
                car_slug: row.car_slug,
            },
            driver_data,
            transaction,
        })
    }
}

fn collect(rows: Vec<TransactionViewRow>) -> Result<Vec<TransactionView>> {
    rows.into_iter().map(TransactionView::try_from).collect()
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &TransactionFilter) {
    query.push(" WHERE TRUE");
    if let Some(user_id) = filter.user_id {
        query.push(" AND t.user_id = ").push_bind(user_id.get());
    }
    if let Some(status) = filter.rental_status {
        query.push(" AND t.rental_status = ").push_bind(status.as_str());
    }
    if let Some(status) = filter.payment_status {
        query.push(" AND t.payment_status = ").push_bind(status.as_str());
    }
}

/// Compare-and-set a status column, telling "gone" apart from "changed".
async fn transition(
    conn: &mut PgConnection,
    table: &str,
    id: i64,
    from: &str,
    to: &str,
    changed: &str,
) -> Result<()> {
    let updated = sqlx::query(&format!(
        "UPDATE {table} SET status = $3, updated_at = now() WHERE id = $1 AND status = $2"
    ))
    .bind(id)
    .bind(from)
    .bind(to)
    .execute(&mut *conn)
    .await
    .map_err(query_error)?;

    if updated.rows_affected() == 1 {
        return Ok(());
    }

    let (exists,): (bool,) = sqlx::query_as(&format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1)"))
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(query_error)?;
    if exists {
        Err(RepositoryError::Conflict(changed.to_string()))
    } else {
        Err(RepositoryError::NotFound)
    }
}

async fn transition_car(conn: &mut PgConnection, t: StatusTransition<CarId, CarStatus>) -> Result<()> {
    transition(
        conn,
        "cars",
        t.id.get(),
        t.from.as_str(),
        t.to.as_str(),
        conflicts::CAR_STATUS_CHANGED,
    )
    .await
}

async fn transition_driver(
    conn: &mut PgConnection,
    t: StatusTransition<DriverId, DriverStatus>,
) -> Result<()> {
    transition(
        conn,
        "drivers",
        t.id.get(),
        t.from.as_str(),
        t.to.as_str(),
        conflicts::DRIVER_STATUS_CHANGED,
    )
    .await
}

async fn write_transaction(conn: &mut PgConnection, write: TransactionWrite) -> Result<TransactionRow> {
    match write {
        TransactionWrite::Insert(new) => sqlx::query_as(&format!(
            r"
            INSERT INTO transactions (user_id, car_id, driver_id, invoice, start_date, end_date, total_cost)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "
        ))
        .bind(new.user_id.get())
        .bind(new.car_id.get())
        .bind(new.driver_id.map(DriverId::get))
        .bind(&new.invoice)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.total_cost.minor())
        .fetch_one(&mut *conn)
        .await
        .map_err(write_error),

        TransactionWrite::Update {
            record,
            expected_rental,
            expected_payment,
        } => {
            let row: Option<TransactionRow> = sqlx::query_as(&format!(
                r"
                UPDATE transactions
                SET return_date = $4,
                    rental_status = $5,
                    payment_status = $6,
                    payment_proof = $7,
                    late_fee = $8,
                    total_cost = $9,
                    updated_at = now()
                WHERE id = $1 AND rental_status = $2 AND payment_status = $3
                RETURNING {COLUMNS}
                "
            ))
            .bind(record.id.get())
            .bind(expected_rental.as_str())
            .bind(expected_payment.as_str())
            .bind(record.return_date)
            .bind(record.rental_status.as_str())
            .bind(record.payment_status.as_str())
            .bind(&record.payment_proof)
            .bind(record.late_fee.map(Money::minor))
            .bind(record.total_cost.minor())
            .fetch_optional(&mut *conn)
            .await
            .map_err(write_error)?;

            if let Some(row) = row {
                return Ok(row);
            }
            let (exists,): (bool,) =
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM transactions WHERE id = $1)")
                    .bind(record.id.get())
                    .fetch_one(&mut *conn)
                    .await
                    .map_err(query_error)?;
            if exists {
                Err(RepositoryError::Conflict(
                    conflicts::TRANSACTION_STATUS_CHANGED.to_string(),
                ))
            } else {
                Err(RepositoryError::NotFound)
            }
        },
    }
}

#[async_trait]
impl TransactionRepository for PgDatabase {
    async fn commit(&self, change: RentalChange) -> Result<Transaction> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to start transaction: {e}")))?;

        // Any early return drops `tx`, which rolls back.
        let result = async {
            if let Some(car) = change.car {
                transition_car(&mut *tx, car).await?;
            }
            if let Some(driver) = change.driver {
                transition_driver(&mut *tx, driver).await?;
            }
            write_transaction(&mut *tx, change.transaction).await
        }
        .await;

        let row = match result {
            Ok(row) => row,
            Err(error) => {
                if matches!(error, RepositoryError::Conflict(_)) {
                    metrics::counter!("db.commit.conflicts").increment(1);
                }
                tracing::debug!(%error, "Rental commit rejected");
                return Err(error);
            },
        };

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to commit transaction: {e}")))?;

        tracing::debug!(transaction_id = row.id, invoice = %row.invoice, "Rental committed");
        Transaction::try_from(row)
    }

    async fn find(&self, id: TransactionId) -> Result<Option<TransactionView>> {
        let row: Option<TransactionViewRow> = sqlx::query_as(&format!("{VIEW_SELECT} WHERE t.id = $1"))
            .bind(id.get())
            .fetch_optional(self.pool())
            .await
            .map_err(query_error)?;
        row.map(TransactionView::try_from).transpose()
    }

    async fn list(&self, filter: &TransactionFilter, page: PageRequest) -> Result<Page<TransactionView>> {
        let (limit, offset) = limit_offset(page);

        let mut query = QueryBuilder::new(VIEW_SELECT);
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY t.created_at DESC, t.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows: Vec<TransactionViewRow> = query
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(query_error)?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM transactions t");
        push_filter(&mut count, filter);
        let (count,): (i64,) = count
            .build_query_as()
            .fetch_one(self.pool())
            .await
            .map_err(query_error)?;

        Ok(Page::new(collect(rows)?, total(count), page))
    }

    async fn in_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<TransactionView>> {
        let rows: Vec<TransactionViewRow> = sqlx::query_as(&format!(
            "{VIEW_SELECT} WHERE t.created_at >= $1 AND t.created_at < $2 ORDER BY t.created_at, t.id"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(self.pool())
        .await
        .map_err(query_error)?;
        collect(rows)
    }
}
