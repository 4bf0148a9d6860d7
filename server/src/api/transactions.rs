//! Rental transactions.
//!
//! Lifecycle commands run through [`RentalReducer`]: every request seeds a
//! fresh store with the records it loaded, sends one command and waits for
//! the action that ends it (`Persisted`, `PersistFailed` or
//! `ValidationFailed`).

use super::{discard_image, store_upload, text_field, MultipartForm, PageQuery};
use crate::auth::{AuthUser, RequireAdmin};
use crate::rental::{RentalAction, RentalEnvironment, RentalError, RentalReducer, RentalState};
use crate::report::{self, ReportRequest};
use crate::server::state::AppState;
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use rentcar_core::invoice::random_invoice;
use rentcar_core::pagination::NamedPage;
use rentcar_core::repository::{conflicts, RepositoryError, TransactionFilter};
use rentcar_core::types::{PaymentStatus, RentalStatus, Transaction, TransactionId, TransactionView};
use rentcar_core::validation::Validator;
use rentcar_runtime::Store;
use rentcar_web::{ApiResponse, AppError, JsonBody, PathParam, QueryParams, WebResult};
use serde::Deserialize;

const NOT_FOUND: &str = "Transaction not found!";
const INVOICE_ATTEMPTS: usize = 5;

/// `POST /transactions` body.
#[derive(Debug, Default, Deserialize)]
pub struct BookingRequest {
    /// Name of the car to rent
    pub car_name: Option<String>,
    /// Name of the driver to hire, if any
    pub driver_name: Option<String>,
    /// First rental day, `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// Agreed return day, `YYYY-MM-DD`
    pub end_date: Option<String>,
}

#[derive(Debug)]
struct Booking {
    car_name: String,
    driver_name: Option<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl BookingRequest {
    fn validate(&self) -> WebResult<Booking> {
        let mut v = Validator::new();
        let car_name = v.required("car_name", self.car_name.as_deref());
        let driver_name = text_field(&mut v, false, "driver_name", self.driver_name.as_deref());
        let start = v.required("start_date", self.start_date.as_deref());
        let end = v.required("end_date", self.end_date.as_deref());

        v.max_len("car_name", car_name, 100);
        v.max_len("driver_name", driver_name, 100);
        let start_date = v.date("start_date", start);
        let end_date = v.date("end_date", end);
        v.finish()?;

        match (car_name, start_date, end_date) {
            (Some(car_name), Some(start_date), Some(end_date)) => Ok(Booking {
                car_name: car_name.to_string(),
                driver_name: driver_name.map(str::to_string),
                start_date,
                end_date,
            }),
            _ => Err(AppError::bad_request(rentcar_web::error::INVALID_DATA)),
        }
    }
}

/// `GET /transactions/admin` filters.
#[derive(Debug, Default, Deserialize)]
pub struct AdminQuery {
    /// 1-based page number
    pub page: Option<u32>,
    /// Items per page
    pub per_page: Option<u32>,
    /// `Pending`, `Success` or `Failed`
    pub payment_status: Option<String>,
    /// `Pending`, `In Progress`, `Returned` or `Canceled`
    pub rental_status: Option<String>,
}

/// `PUT /transactions/verify-payment/:id` body.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Whether the payment was received
    pub approved: bool,
}

/// `PUT /transactions/return-car/:id` body.
#[derive(Debug, Default, Deserialize)]
pub struct ReturnRequest {
    /// Day the car came back, `YYYY-MM-DD`
    pub return_date: Option<String>,
}

impl ReturnRequest {
    fn validate(&self) -> WebResult<NaiveDate> {
        let mut v = Validator::new();
        let raw = v.required("return_date", self.return_date.as_deref());
        let date = v.date("return_date", raw);
        v.finish()?;
        date.ok_or_else(|| AppError::bad_request(rentcar_web::error::INVALID_DATA))
    }
}

/// Run one command against a store seeded with `seed`.
///
/// The inner error means the command was refused or its write rolled
/// back, so nothing changed. The outer error means no outcome arrived,
/// and the write may still land.
async fn run(
    state: &AppState,
    seed: RentalState,
    command: RentalAction,
) -> Result<Result<Transaction, RentalError>, AppError> {
    let env = RentalEnvironment::new(state.transactions.clone(), state.clock.clone());
    let store = Store::new(seed, RentalReducer::new(), env);

    match store
        .send_and_wait_for(command, RentalAction::is_terminal, state.command_timeout)
        .await?
    {
        RentalAction::Persisted { transaction } => Ok(Ok(transaction)),
        RentalAction::PersistFailed { error } | RentalAction::ValidationFailed { error } => Ok(Err(error)),
        other => Err(AppError::internal("Unexpected rental outcome")
            .with_source(anyhow::anyhow!("non-terminal action {other:?}"))),
    }
}

fn is_invoice_taken(err: &RentalError) -> bool {
    matches!(err, RentalError::Persist(RepositoryError::Conflict(msg)) if msg == conflicts::INVOICE_TAKEN)
}

async fn execute(state: &AppState, seed: RentalState, command: RentalAction) -> WebResult<Transaction> {
    run(state, seed, command).await?.map_err(AppError::from)
}

/// The stored view of a transaction that was just written.
async fn view_of(state: &AppState, transaction: &Transaction) -> WebResult<TransactionView> {
    state
        .transactions
        .find(transaction.id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))
}

/// Load a transaction with its car and driver, ready for a command.
async fn load(state: &AppState, id: i64) -> WebResult<RentalState> {
    let view = state
        .transactions
        .find(TransactionId::new(id))
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    let transaction = view.transaction;

    let car = state.cars.find(transaction.car_id).await?.map(|view| view.car);
    let driver = match transaction.driver_id {
        Some(driver_id) => state.drivers.find(driver_id).await?,
        None => None,
    };
    Ok(RentalState::for_transaction(transaction, car, driver))
}

/// `POST /transactions`
///
/// # Errors
///
/// 400 on invalid fields or period, 404 when the car or driver is unknown
/// or not available.
pub async fn book(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(body): JsonBody<BookingRequest>,
) -> WebResult<ApiResponse<TransactionView>> {
    let booking = body.validate()?;

    let car = state
        .cars
        .find_by_name(&booking.car_name)
        .await?
        .ok_or_else(|| AppError::not_found("Car not found!"))?;
    let driver = match booking.driver_name.as_deref() {
        Some(name) => Some(
            state
                .drivers
                .find_by_name(name)
                .await?
                .ok_or_else(|| AppError::not_found("Driver not found!"))?,
        ),
        None => None,
    };

    let mut attempt = 1;
    let transaction = loop {
        let command = RentalAction::Book {
            actor: auth.actor(),
            start_date: booking.start_date,
            end_date: booking.end_date,
            invoice: random_invoice(state.clock.today(), &mut rand::thread_rng()),
        };
        let seed = RentalState::for_booking(car.car.clone(), driver.clone());
        match run(&state, seed, command).await? {
            Ok(transaction) => break transaction,
            Err(err) if is_invoice_taken(&err) && attempt < INVOICE_ATTEMPTS => {
                tracing::debug!(attempt, "Invoice number taken, retrying");
                attempt += 1;
            },
            Err(err) => return Err(err.into()),
        }
    };

    tracing::info!(
        transaction_id = %transaction.id,
        invoice = %transaction.invoice,
        user_id = %auth.id(),
        "Rental booked"
    );
    let view = view_of(&state, &transaction).await?;
    Ok(ApiResponse::created_with_message("Transaction added successfully", view))
}

/// `GET /transactions/customer`: the caller's own rentals, newest first.
pub async fn customer_list(
    auth: AuthUser,
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PageQuery>,
) -> WebResult<ApiResponse<NamedPage<TransactionView>>> {
    let filter = TransactionFilter {
        user_id: Some(auth.id()),
        ..TransactionFilter::default()
    };
    let page = state.transactions.list(&filter, query.page_request()).await?;
    Ok(ApiResponse::ok(page.named("transactions")))
}

/// `GET /transactions/admin`
pub async fn admin_list(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    QueryParams(query): QueryParams<AdminQuery>,
) -> WebResult<ApiResponse<NamedPage<TransactionView>>> {
    let mut v = Validator::new();
    let payment_status = v.one_of::<PaymentStatus>("payment_status", query.payment_status.as_deref());
    let rental_status = v.one_of::<RentalStatus>("rental_status", query.rental_status.as_deref());
    v.finish()?;

    let filter = TransactionFilter {
        user_id: None,
        rental_status,
        payment_status,
    };
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    };
    let page = state.transactions.list(&filter, page.page_request()).await?;
    Ok(ApiResponse::ok(page.named("transactions")))
}

/// `GET /transactions/:id`: visible to its owner and to admins.
pub async fn show(
    auth: AuthUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> WebResult<ApiResponse<TransactionView>> {
    let view = state
        .transactions
        .find(TransactionId::new(id))
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    if view.transaction.user_id != auth.id() && !auth.user.role.is_admin() {
        return Err(AppError::forbidden("You are not allowed to view this transaction"));
    }
    Ok(ApiResponse::ok(view))
}

/// `PUT /transactions/upload-payment-proof/:id`
///
/// The image is stored before the command runs and removed again if the
/// command is refused. When the outcome is unknown the image stays, since
/// the row may yet point at it.
pub async fn upload_payment_proof(
    auth: AuthUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
    multipart: Multipart,
) -> WebResult<ApiResponse<TransactionView>> {
    let form = MultipartForm::read(multipart).await?;
    let Some(upload) = form.first_file("payment_proof_image") else {
        return Err(AppError::bad_request("Payment proof image is required"));
    };

    let seed = load(&state, id).await?;
    let proof_url = store_upload(state.images.as_ref(), upload).await?;
    let command = RentalAction::UploadPaymentProof {
        actor: auth.actor(),
        proof_url: proof_url.clone(),
    };

    let transaction = match run(&state, seed, command).await {
        Ok(Ok(transaction)) => transaction,
        Ok(Err(refused)) => {
            discard_image(state.images.as_ref(), &proof_url).await;
            return Err(refused.into());
        },
        Err(err) => {
            tracing::warn!(transaction_id = id, %proof_url, "Payment proof outcome unknown, keeping image");
            return Err(err);
        },
    };

    tracing::info!(transaction_id = %transaction.id, user_id = %auth.id(), "Payment proof uploaded");
    let view = view_of(&state, &transaction).await?;
    Ok(ApiResponse::with_message("Payment proof uploaded successfully", view))
}

/// `PUT /transactions/verify-payment/:id`
pub async fn verify_payment(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<VerifyRequest>,
) -> WebResult<ApiResponse<TransactionView>> {
    let seed = load(&state, id).await?;
    let command = RentalAction::VerifyPayment {
        actor: admin.actor(),
        approved: body.approved,
    };
    let transaction = execute(&state, seed, command).await?;

    tracing::info!(
        transaction_id = %transaction.id,
        approved = body.approved,
        admin_id = %admin.id(),
        "Payment verified"
    );
    let view = view_of(&state, &transaction).await?;
    let message = if body.approved {
        "Payment approved"
    } else {
        "Payment rejected"
    };
    Ok(ApiResponse::with_message(message, view))
}

/// `PUT /transactions/cancel/:id`
pub async fn cancel(
    auth: AuthUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> WebResult<ApiResponse<TransactionView>> {
    let seed = load(&state, id).await?;
    let transaction = execute(&state, seed, RentalAction::Cancel { actor: auth.actor() }).await?;

    tracing::info!(transaction_id = %transaction.id, user_id = %auth.id(), "Rental canceled");
    let view = view_of(&state, &transaction).await?;
    Ok(ApiResponse::with_message("Transaction canceled successfully", view))
}

/// `PUT /transactions/return-car/:id`
pub async fn return_car(
    auth: AuthUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<ReturnRequest>,
) -> WebResult<ApiResponse<TransactionView>> {
    let return_date = body.validate()?;
    let seed = load(&state, id).await?;
    let command = RentalAction::ReturnCar {
        actor: auth.actor(),
        return_date,
    };
    let transaction = execute(&state, seed, command).await?;

    tracing::info!(
        transaction_id = %transaction.id,
        late_fee = ?transaction.late_fee,
        "Car returned"
    );
    let view = view_of(&state, &transaction).await?;
    Ok(ApiResponse::with_message("Car returned successfully", view))
}

/// `POST /transactions/generate_report`: CSV attachment.
pub async fn generate_report(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ReportRequest>,
) -> WebResult<Response> {
    let range = body.range()?;
    let rows = state.transactions.in_range(range.start(), range.end()).await?;
    let csv = report::render_csv(&rows)?;

    tracing::info!(rows = rows.len(), from = %range.start(), to = %range.end(), "Report generated");
    let disposition = format!("attachment; filename=\"{}\"", report::REPORT_FILE_NAME);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn booking_needs_car_and_dates() {
        let body = BookingRequest {
            car_name: Some("Toyota Avanza".to_string()),
            driver_name: None,
            start_date: Some("2025-01-02".to_string()),
            end_date: Some("2025-01-04".to_string()),
        };
        let booking = body.validate().unwrap();
        assert_eq!(booking.car_name, "Toyota Avanza");
        assert!(booking.driver_name.is_none());

        let err = BookingRequest::default().validate().unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn blank_driver_name_is_rejected() {
        let body = BookingRequest {
            car_name: Some("Toyota Avanza".to_string()),
            driver_name: Some("  ".to_string()),
            start_date: Some("2025-01-02".to_string()),
            end_date: Some("2025-01-04".to_string()),
        };
        assert!(body.validate().is_err());
    }

    #[test]
    fn return_date_must_be_a_date() {
        let ok = ReturnRequest {
            return_date: Some("2025-01-05".to_string()),
        };
        assert_eq!(ok.validate().unwrap(), NaiveDate::from_ymd_opt(2025, 1, 5).unwrap());

        let bad = ReturnRequest {
            return_date: Some("05/01/2025".to_string()),
        };
        assert!(bad.validate().is_err());
        assert!(ReturnRequest::default().validate().is_err());
    }
}
