//! Car maintenance records.

use super::{text_field, PageQuery};
use crate::auth::{AuthUser, RequireAdmin};
use crate::server::state::AppState;
use axum::extract::State;
use rentcar_core::money::Money;
use rentcar_core::pagination::NamedPage;
use rentcar_core::repository::{conflicts, RepositoryError};
use rentcar_core::types::{CarId, MaintenanceId, MaintenanceView, NewMaintenance};
use rentcar_core::validation::Validator;
use rentcar_core::NaiveDate;
use rentcar_web::{ApiResponse, AppError, JsonBody, PathParam, QueryParams, WebResult};
use serde::Deserialize;

const NOT_FOUND: &str = "Car maintenance not found!";
const UNKNOWN_CAR: &str = "Car name doesn't exist in database!";
const DUPLICATE: &str = "A car maintenance record with the same date and description already exists!";

/// Create or update payload.
#[derive(Debug, Default, Deserialize)]
pub struct MaintenanceRequest {
    /// Name of the serviced car
    pub car_name: Option<String>,
    /// Service date, `YYYY-MM-DD`
    pub maintenance_date: Option<String>,
    /// What was done
    pub description: Option<String>,
    /// Cost, number or decimal string
    pub cost: Option<Money>,
}

#[derive(Debug)]
struct MaintenanceFields {
    car_name: Option<String>,
    maintenance_date: Option<NaiveDate>,
    description: Option<String>,
    cost: Option<Money>,
}

impl MaintenanceRequest {
    fn fields(&self, required: bool) -> WebResult<MaintenanceFields> {
        let mut v = Validator::new();
        let car_name = text_field(&mut v, required, "car_name", self.car_name.as_deref());
        let date = text_field(&mut v, required, "maintenance_date", self.maintenance_date.as_deref());
        let description = text_field(&mut v, required, "description", self.description.as_deref());
        let cost = if required {
            v.present("cost", self.cost)
        } else {
            self.cost
        };

        v.max_len("car_name", car_name, 100);
        v.max_len("description", description, 50);

        let fields = MaintenanceFields {
            car_name: car_name.map(str::to_string),
            maintenance_date: v.date("maintenance_date", date),
            description: description.map(str::to_string),
            cost: v.non_negative("cost", cost),
        };
        v.finish()?;
        Ok(fields)
    }
}

/// The repository reports duplicates as conflicts; this endpoint answers 400.
fn duplicate_is_bad_request(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::Conflict(msg) if msg == conflicts::MAINTENANCE_EXISTS => AppError::bad_request(DUPLICATE),
        other => other.into(),
    }
}

async fn car_named(state: &AppState, name: &str) -> WebResult<CarId> {
    state
        .cars
        .find_by_name(name)
        .await?
        .map(|view| view.car.id)
        .ok_or_else(|| AppError::not_found(UNKNOWN_CAR))
}

async fn load(state: &AppState, id: i64) -> WebResult<MaintenanceView> {
    state
        .maintenances
        .find(MaintenanceId::new(id))
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))
}

/// `POST /car-maintenances`
///
/// # Errors
///
/// 400 on invalid fields or a duplicate record, 404 for an unknown car name.
pub async fn create(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    JsonBody(body): JsonBody<MaintenanceRequest>,
) -> WebResult<ApiResponse<MaintenanceView>> {
    let fields = body.fields(true)?;
    let (Some(car_name), Some(maintenance_date), Some(description), Some(cost)) =
        (fields.car_name, fields.maintenance_date, fields.description, fields.cost)
    else {
        return Err(AppError::bad_request(rentcar_web::error::INVALID_DATA));
    };

    let car_id = car_named(&state, &car_name).await?;
    let record = state
        .maintenances
        .create(NewMaintenance {
            car_id,
            maintenance_date,
            description,
            cost,
        })
        .await
        .map_err(duplicate_is_bad_request)?;

    tracing::info!(maintenance_id = %record.maintenance.id, car_id = %car_id, "Maintenance recorded");
    Ok(ApiResponse::created_with_message("Car Maintenance added successfully", record))
}

/// `GET /car-maintenances`
pub async fn list(
    _auth: AuthUser,
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PageQuery>,
) -> WebResult<ApiResponse<NamedPage<MaintenanceView>>> {
    let page = state.maintenances.list(query.page_request()).await?;
    Ok(ApiResponse::ok(page.named("car_maintenances")))
}

/// `GET /car-maintenances/:id`
pub async fn show(
    _auth: AuthUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> WebResult<ApiResponse<MaintenanceView>> {
    Ok(ApiResponse::ok(load(&state, id).await?))
}

/// `PUT /car-maintenances/:id`
///
/// The duplicate check runs against the record as it would be stored.
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<MaintenanceRequest>,
) -> WebResult<ApiResponse<MaintenanceView>> {
    let fields = body.fields(false)?;
    let mut record = load(&state, id).await?.maintenance;

    if let Some(car_name) = fields.car_name {
        record.car_id = car_named(&state, &car_name).await?;
    }
    if let Some(date) = fields.maintenance_date {
        record.maintenance_date = date;
    }
    if let Some(description) = fields.description {
        record.description = description;
    }
    if let Some(cost) = fields.cost {
        record.cost = cost;
    }

    let record = state
        .maintenances
        .update(&record)
        .await
        .map_err(duplicate_is_bad_request)?;
    tracing::info!(maintenance_id = %record.maintenance.id, "Maintenance updated");
    Ok(ApiResponse::with_message("Car Maintenance updated successfully", record))
}

/// `DELETE /car-maintenances/:id`
pub async fn delete(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> WebResult<ApiResponse<MaintenanceView>> {
    let record = load(&state, id).await?;
    state.maintenances.delete(record.maintenance.id).await?;
    tracing::info!(maintenance_id = %record.maintenance.id, "Maintenance deleted");
    Ok(ApiResponse::with_message("Car Maintenance deleted successfully", record))
}
