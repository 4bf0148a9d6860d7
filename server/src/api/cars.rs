//! Fleet endpoints.
//!
//! Cars are created and edited with `multipart/form-data` so the photo
//! travels with the fields. A car is addressed by numeric id or by slug.

use super::{discard_image, store_upload, text_field, MultipartForm, PageQuery, Upload};
use crate::auth::RequireAdmin;
use crate::server::state::AppState;
use axum::extract::{Multipart, State};
use rentcar_core::money::Money;
use rentcar_core::pagination::NamedPage;
use rentcar_core::repository::{conflicts, CarFilter, RepositoryError};
use rentcar_core::slug::{car_slug, random_suffix, rename_slug};
use rentcar_core::types::{Car, CarId, CarStatus, CarView, CategoryId, Fuel, NewCar, Transmission};
use rentcar_core::validation::Validator;
use rentcar_web::{ApiResponse, AppError, PathParam, QueryParams, WebResult};
use serde::Deserialize;

const NOT_FOUND: &str = "Car not found!";
const UNKNOWN_CATEGORY: &str = "Car brand or type doesn't exist in database";
const IMAGE_REQUIRED: &str = "Image is required";

/// Attempts at finding a free slug before giving up.
const SLUG_ATTEMPTS: usize = 5;

/// `GET /cars` query.
#[derive(Debug, Default, Deserialize)]
pub struct CarQuery {
    /// 1-based page number
    pub page: Option<u32>,
    /// Items per page
    pub per_page: Option<u32>,
    /// Brand filter
    pub car_brand: Option<String>,
    /// Body type filter
    #[serde(rename = "type")]
    pub car_type: Option<String>,
    /// Status filter
    pub status: Option<String>,
}

/// Car fields read from a form, each validated when present.
#[derive(Debug, Default)]
struct CarFields {
    car_brand: Option<String>,
    car_type: Option<String>,
    name: Option<String>,
    transmission: Option<Transmission>,
    fuel: Option<Fuel>,
    color: Option<String>,
    plate_number: Option<String>,
    capacity: Option<i32>,
    registration_number: Option<i64>,
    price: Option<Money>,
    status: Option<CarStatus>,
}

impl CarFields {
    /// Validate the text fields of `form`. With `required`, every field but
    /// `status` must be present.
    fn parse(form: &MultipartForm, required: bool) -> WebResult<Self> {
        let mut v = Validator::new();
        let text = |v: &mut Validator, name| text_field(v, required, name, form.text(name));

        let car_brand = text(&mut v, "car_brand");
        let car_type = text(&mut v, "type");
        let name = text(&mut v, "name");
        let transmission = text(&mut v, "transmission");
        let fuel = text(&mut v, "fuel");
        let color = text(&mut v, "color");
        let plate_number = text(&mut v, "plate_number");
        let capacity = text(&mut v, "capacity");
        let registration_number = text(&mut v, "registration_number");
        let price = text(&mut v, "price");
        let status = form.text("status").and_then(|s| v.required("status", Some(s)));

        v.max_len("car_brand", car_brand, 50);
        v.max_len("type", car_type, 50);
        v.max_len("name", name, 100);
        v.max_len("color", color, 50);
        v.max_len("plate_number", plate_number, 50);

        let fields = Self {
            car_brand: car_brand.map(str::to_string),
            car_type: car_type.map(str::to_string),
            name: name.map(str::to_string),
            transmission: v.one_of("transmission", transmission),
            fuel: v.one_of("fuel", fuel),
            color: color.map(str::to_string),
            plate_number: plate_number.map(str::to_string),
            capacity: v.number("capacity", capacity),
            registration_number: v.integer("registration_number", registration_number),
            price: v.number::<Money>("price", price).and_then(|p| v.non_negative("price", Some(p))),
            status: v.one_of("status", status),
        };
        v.finish()?;
        Ok(fields)
    }
}

async fn category_for(state: &AppState, brand: &str, car_type: &str) -> WebResult<CategoryId> {
    state
        .categories
        .find_by_brand_type(brand, car_type)
        .await?
        .map(|c| c.id)
        .ok_or_else(|| AppError::not_found(UNKNOWN_CATEGORY))
}

/// Look a car up by numeric id, falling back to its slug.
async fn car_by(state: &AppState, key: &str) -> WebResult<CarView> {
    let found = match key.parse::<i64>() {
        Ok(id) => state.cars.find(CarId::new(id)).await?,
        Err(_) => state.cars.find_by_slug(key).await?,
    };
    found.ok_or_else(|| AppError::not_found(NOT_FOUND))
}

fn is_slug_taken(err: &RepositoryError) -> bool {
    matches!(err, RepositoryError::Conflict(msg) if msg == conflicts::SLUG_TAKEN)
}

fn fresh_slug(name: &str) -> String {
    car_slug(name, random_suffix(&mut rand::thread_rng()))
}

/// `POST /cars`
///
/// # Errors
///
/// 400 on invalid fields or a missing image, 404 when the (brand, type)
/// category does not exist, 409 on a duplicate plate or registration number.
pub async fn create(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    multipart: Multipart,
) -> WebResult<ApiResponse<CarView>> {
    let form = MultipartForm::read(multipart).await?;
    let fields = CarFields::parse(&form, true)?;
    let Some(upload) = form.first_file("image") else {
        return Err(AppError::bad_request(IMAGE_REQUIRED));
    };
    let (
        Some(car_brand),
        Some(car_type),
        Some(name),
        Some(transmission),
        Some(fuel),
        Some(color),
        Some(plate_number),
        Some(capacity),
        Some(registration_number),
        Some(price),
    ) = (
        fields.car_brand,
        fields.car_type,
        fields.name,
        fields.transmission,
        fields.fuel,
        fields.color,
        fields.plate_number,
        fields.capacity,
        fields.registration_number,
        fields.price,
    )
    else {
        return Err(AppError::bad_request(rentcar_web::error::INVALID_DATA));
    };

    let category_id = category_for(&state, &car_brand, &car_type).await?;
    let image = store_upload(state.images.as_ref(), upload).await?;

    let mut new = NewCar {
        category_id,
        slug: fresh_slug(&name),
        name,
        transmission,
        fuel,
        color,
        plate_number,
        capacity,
        registration_number,
        price,
        image,
        status: fields.status.unwrap_or(CarStatus::Available),
    };

    let mut attempt = 1;
    let car = loop {
        match state.cars.create(new.clone()).await {
            Ok(car) => break car,
            Err(err) if is_slug_taken(&err) && attempt < SLUG_ATTEMPTS => {
                tracing::debug!(slug = %new.slug, attempt, "Slug taken, retrying");
                new.slug = fresh_slug(&new.name);
                attempt += 1;
            },
            Err(err) => {
                discard_image(state.images.as_ref(), &new.image).await;
                return Err(err.into());
            },
        }
    };

    tracing::info!(car_id = %car.car.id, slug = %car.car.slug, "Car created");
    Ok(ApiResponse::created_with_message("Car added successfully", car))
}

/// `GET /cars`
pub async fn list(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<CarQuery>,
) -> WebResult<ApiResponse<NamedPage<CarView>>> {
    let mut v = Validator::new();
    let status = v.one_of::<CarStatus>("status", query.status.as_deref().filter(|s| !s.is_empty()));
    v.finish()?;

    let filter = CarFilter {
        car_brand: query.car_brand.filter(|s| !s.is_empty()),
        car_type: query.car_type.filter(|s| !s.is_empty()),
        status,
    };
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    };
    let cars = state.cars.list(&filter, page.page_request()).await?;
    Ok(ApiResponse::ok(cars.named("cars")))
}

/// `GET /cars/:id_or_slug`
pub async fn show(
    State(state): State<AppState>,
    PathParam(key): PathParam<String>,
) -> WebResult<ApiResponse<CarView>> {
    Ok(ApiResponse::ok(car_by(&state, &key).await?))
}

/// `PUT /cars/:id_or_slug`
///
/// Every field is optional. A rename keeps the slug suffix; a new image
/// replaces the old one, which is then deleted.
///
/// # Errors
///
/// As for [`create`], plus 404 for an unknown car.
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    PathParam(key): PathParam<String>,
    multipart: Multipart,
) -> WebResult<ApiResponse<CarView>> {
    let form = MultipartForm::read(multipart).await?;
    let fields = CarFields::parse(&form, false)?;
    let current = car_by(&state, &key).await?;
    let mut car = current.car.clone();

    if fields.car_brand.is_some() || fields.car_type.is_some() {
        let brand = fields.car_brand.as_deref().unwrap_or(&current.car_brand);
        let car_type = fields.car_type.as_deref().unwrap_or(&current.car_type);
        car.category_id = category_for(&state, brand, car_type).await?;
    }
    if let Some(name) = fields.name {
        if name != car.name {
            car.slug = rename_slug(&car.slug, &name, &mut rand::thread_rng());
        }
        car.name = name;
    }
    if let Some(transmission) = fields.transmission {
        car.transmission = transmission;
    }
    if let Some(fuel) = fields.fuel {
        car.fuel = fuel;
    }
    if let Some(color) = fields.color {
        car.color = color;
    }
    if let Some(plate_number) = fields.plate_number {
        car.plate_number = plate_number;
    }
    if let Some(capacity) = fields.capacity {
        car.capacity = capacity;
    }
    if let Some(registration_number) = fields.registration_number {
        car.registration_number = registration_number;
    }
    if let Some(price) = fields.price {
        car.price = price;
    }
    if let Some(status) = fields.status {
        car.status = status;
    }

    let updated = replace_image(&state, car, &current.car.image, form.first_file("image")).await?;
    tracing::info!(car_id = %updated.car.id, slug = %updated.car.slug, "Car updated");
    Ok(ApiResponse::with_message("Car updated successfully", updated))
}

/// `PUT /cars/upload-image/:id`: replace the photo only.
pub async fn upload_image(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    PathParam(key): PathParam<String>,
    multipart: Multipart,
) -> WebResult<ApiResponse<CarView>> {
    let form = MultipartForm::read(multipart).await?;
    let Some(upload) = form.first_file("image") else {
        return Err(AppError::bad_request(IMAGE_REQUIRED));
    };
    let current = car_by(&state, &key).await?;

    let updated = replace_image(&state, current.car.clone(), &current.car.image, Some(upload)).await?;
    tracing::info!(car_id = %updated.car.id, "Car image replaced");
    Ok(ApiResponse::with_message("Car image updated successfully", updated))
}

/// Store `car`, swapping in `upload` as its image when given.
///
/// The new image is stored before the write and removed if the write fails;
/// the old one is removed only after the write succeeded.
async fn replace_image(
    state: &AppState,
    mut car: Car,
    old_image: &str,
    upload: Option<&Upload>,
) -> WebResult<CarView> {
    let new_image = match upload {
        Some(upload) => Some(store_upload(state.images.as_ref(), upload).await?),
        None => None,
    };
    if let Some(url) = &new_image {
        car.image.clone_from(url);
    }

    let mut attempt = 1;
    let result = loop {
        match state.cars.update(&car).await {
            Err(err) if is_slug_taken(&err) && attempt < SLUG_ATTEMPTS => {
                car.slug = fresh_slug(&car.name);
                attempt += 1;
            },
            other => break other,
        }
    };

    match (result, new_image) {
        (Ok(view), Some(_)) => {
            discard_image(state.images.as_ref(), old_image).await;
            Ok(view)
        },
        (Ok(view), None) => Ok(view),
        (Err(err), Some(url)) => {
            discard_image(state.images.as_ref(), &url).await;
            Err(err.into())
        },
        (Err(err), None) => Err(err.into()),
    }
}

/// `DELETE /cars/:id`
///
/// # Errors
///
/// 404 for an unknown car, 409 while transactions reference it.
pub async fn delete(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    PathParam(key): PathParam<String>,
) -> WebResult<ApiResponse<CarView>> {
    let car = car_by(&state, &key).await?;
    state.cars.delete(car.car.id).await?;
    discard_image(state.images.as_ref(), &car.car.image).await;

    tracing::info!(car_id = %car.car.id, "Car deleted");
    Ok(ApiResponse::with_message("Car deleted successfully", car))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn slug_conflicts_are_recognised() {
        assert!(is_slug_taken(&RepositoryError::Conflict(conflicts::SLUG_TAKEN.to_string())));
        assert!(!is_slug_taken(&RepositoryError::Conflict(conflicts::PLATE_TAKEN.to_string())));
        assert!(!is_slug_taken(&RepositoryError::NotFound));
    }

    #[test]
    fn fresh_slug_has_suffix() {
        let slug = fresh_slug("Honda HR-V");
        let (base, suffix) = rentcar_core::slug::split_suffix(&slug).unwrap();
        assert_eq!(base, "honda-hr-v");
        assert!((100..=999).contains(&suffix));
    }
}
