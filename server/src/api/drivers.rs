//! Driver endpoints.

use super::{text_field, PageQuery};
use crate::auth::{AuthUser, RequireAdmin};
use crate::server::state::AppState;
use axum::extract::State;
use chrono::NaiveDate;
use rentcar_core::pagination::NamedPage;
use rentcar_core::types::{Driver, DriverId, DriverStatus, Gender, NewDriver};
use rentcar_core::validation::Validator;
use rentcar_web::{ApiResponse, AppError, JsonBody, PathParam, QueryParams, WebResult};
use serde::Deserialize;

const NOT_FOUND: &str = "Driver not found!";

/// Create or update payload.
#[derive(Debug, Default, Deserialize)]
pub struct DriverRequest {
    /// Full name
    pub name: Option<String>,
    /// `Male` or `Female`
    pub gender: Option<String>,
    /// Date of birth, `YYYY-MM-DD`
    pub dob: Option<String>,
    /// Postal address
    pub address: Option<String>,
    /// Phone number
    pub phone_number: Option<String>,
    /// Driving licence number
    pub license_number: Option<String>,
    /// `Available` or `Unavailable`
    pub status: Option<String>,
}

#[derive(Debug, Default)]
struct DriverFields {
    name: Option<String>,
    gender: Option<Gender>,
    dob: Option<NaiveDate>,
    address: Option<String>,
    phone_number: Option<String>,
    license_number: Option<String>,
    status: Option<DriverStatus>,
}

impl DriverRequest {
    fn fields(&self, required: bool) -> WebResult<DriverFields> {
        let mut v = Validator::new();
        let text = |v: &mut Validator, name, value| text_field(v, required, name, value);

        let name = text(&mut v, "name", self.name.as_deref());
        let gender = text(&mut v, "gender", self.gender.as_deref());
        let dob = text(&mut v, "dob", self.dob.as_deref());
        let address = text(&mut v, "address", self.address.as_deref());
        let phone = text(&mut v, "phone_number", self.phone_number.as_deref());
        let license = text(&mut v, "license_number", self.license_number.as_deref());
        let status = self.status.as_deref().and_then(|s| v.required("status", Some(s)));

        v.max_len("name", name, 100);
        v.max_len("address", address, 100);
        v.max_len("phone_number", phone, 100);
        v.max_len("license_number", license, 100);

        // Booked is set by the rental flow only.
        let status = v.one_of::<DriverStatus>("status", status);
        if status == Some(DriverStatus::Booked) {
            v.fail("status", "unallowed value Booked");
        }

        let fields = DriverFields {
            name: name.map(str::to_string),
            gender: v.one_of("gender", gender),
            dob: v.date("dob", dob),
            address: address.map(str::to_string),
            phone_number: phone.map(str::to_string),
            license_number: license.map(str::to_string),
            status,
        };
        v.finish()?;
        Ok(fields)
    }
}

async fn load(state: &AppState, id: i64) -> WebResult<Driver> {
    state
        .drivers
        .find(DriverId::new(id))
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))
}

/// `POST /drivers`
///
/// # Errors
///
/// 400 on invalid fields, 409 on a duplicate phone or licence number.
pub async fn create(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    JsonBody(body): JsonBody<DriverRequest>,
) -> WebResult<ApiResponse<Driver>> {
    let fields = body.fields(true)?;
    let (Some(name), Some(gender), Some(dob), Some(address), Some(phone_number), Some(license_number)) = (
        fields.name,
        fields.gender,
        fields.dob,
        fields.address,
        fields.phone_number,
        fields.license_number,
    ) else {
        return Err(AppError::bad_request(rentcar_web::error::INVALID_DATA));
    };

    let driver = state
        .drivers
        .create(NewDriver {
            name,
            gender,
            dob,
            address,
            phone_number,
            license_number,
            status: fields.status.unwrap_or(DriverStatus::Available),
        })
        .await?;

    tracing::info!(driver_id = %driver.id, "Driver created");
    Ok(ApiResponse::created_with_message("Driver added successfully", driver))
}

/// `GET /drivers`
pub async fn list(
    _auth: AuthUser,
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PageQuery>,
) -> WebResult<ApiResponse<NamedPage<Driver>>> {
    let page = state.drivers.list(query.page_request()).await?;
    Ok(ApiResponse::ok(page.named("drivers")))
}

/// `GET /drivers-available`
pub async fn available(_auth: AuthUser, State(state): State<AppState>) -> WebResult<ApiResponse<Vec<Driver>>> {
    Ok(ApiResponse::ok(state.drivers.list_available().await?))
}

/// `GET /drivers/:id`
pub async fn show(
    _auth: AuthUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> WebResult<ApiResponse<Driver>> {
    Ok(ApiResponse::ok(load(&state, id).await?))
}

/// `PUT /drivers/:id`
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<DriverRequest>,
) -> WebResult<ApiResponse<Driver>> {
    let fields = body.fields(false)?;
    let mut driver = load(&state, id).await?;

    if let Some(name) = fields.name {
        driver.name = name;
    }
    if let Some(gender) = fields.gender {
        driver.gender = gender;
    }
    if let Some(dob) = fields.dob {
        driver.dob = dob;
    }
    if let Some(address) = fields.address {
        driver.address = address;
    }
    if let Some(phone_number) = fields.phone_number {
        driver.phone_number = phone_number;
    }
    if let Some(license_number) = fields.license_number {
        driver.license_number = license_number;
    }
    if let Some(status) = fields.status {
        if driver.status == DriverStatus::Booked && status != DriverStatus::Booked {
            tracing::warn!(driver_id = %driver.id, "Booked driver status overridden by admin");
        }
        driver.status = status;
    }

    let driver = state.drivers.update(&driver).await?;
    tracing::info!(driver_id = %driver.id, "Driver updated");
    Ok(ApiResponse::with_message("Driver updated successfully", driver))
}

/// `DELETE /drivers/:id`
///
/// # Errors
///
/// 404 for an unknown driver, 409 while transactions reference it.
pub async fn delete(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> WebResult<ApiResponse<Driver>> {
    let driver = load(&state, id).await?;
    state.drivers.delete(driver.id).await?;
    tracing::info!(driver_id = %driver.id, "Driver deleted");
    Ok(ApiResponse::with_message("Driver deleted successfully", driver))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request() -> DriverRequest {
        DriverRequest {
            name: Some("Budi Santoso".to_string()),
            gender: Some("Male".to_string()),
            dob: Some("1988-02-29".to_string()),
            address: Some("Jl. Asia Afrika 8".to_string()),
            phone_number: Some("081298765432".to_string()),
            license_number: Some("SIM-0001".to_string()),
            status: None,
        }
    }

    #[test]
    fn create_needs_every_field_but_status() {
        let fields = request().fields(true).unwrap();
        assert_eq!(fields.gender, Some(Gender::Male));
        assert!(fields.status.is_none());

        let missing = DriverRequest {
            dob: None,
            ..request()
        };
        assert!(missing.fields(true).is_err());
    }

    #[test]
    fn update_accepts_partial_payload() {
        let body = DriverRequest {
            status: Some("Unavailable".to_string()),
            ..DriverRequest::default()
        };
        let fields = body.fields(false).unwrap();
        assert_eq!(fields.status, Some(DriverStatus::Unavailable));
        assert!(fields.name.is_none());
    }

    #[test]
    fn booked_status_is_reserved() {
        let body = DriverRequest {
            status: Some("Booked".to_string()),
            ..request()
        };
        assert!(body.fields(true).is_err());
    }

    #[test]
    fn bad_dates_and_genders_are_reported() {
        let body = DriverRequest {
            gender: Some("Other".to_string()),
            dob: Some("29-02-1988".to_string()),
            ..request()
        };
        assert!(body.fields(true).is_err());
    }
}
