//! Car categories and the brand catalogue.

use super::PageQuery;
use crate::auth::{AuthUser, RequireAdmin};
use crate::server::state::AppState;
use axum::extract::State;
use rentcar_core::pagination::NamedPage;
use rentcar_core::types::{BrandTypes, CarCategory, CategoryId, NewCategory};
use rentcar_core::validation::Validator;
use rentcar_web::{ApiResponse, AppError, JsonBody, PathParam, QueryParams, WebResult};
use serde::Deserialize;

const NOT_FOUND: &str = "Car category not found!";

/// Create or update payload.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryRequest {
    /// Brand
    pub car_brand: Option<String>,
    /// Body type
    #[serde(rename = "type")]
    pub car_type: Option<String>,
}

impl CategoryRequest {
    fn check_lengths(&self, v: &mut Validator) {
        v.max_len("car_brand", self.car_brand.as_deref(), 50);
        v.max_len("type", self.car_type.as_deref(), 50);
    }

    fn validate_new(&self) -> WebResult<NewCategory> {
        let mut v = Validator::new();
        let brand = v.required("car_brand", self.car_brand.as_deref());
        let car_type = v.required("type", self.car_type.as_deref());
        self.check_lengths(&mut v);

        let (Some(brand), Some(car_type)) = (brand, car_type) else {
            return Err(v.finish().err().unwrap_or_default().into());
        };
        v.finish()?;
        Ok(NewCategory {
            car_brand: brand.to_string(),
            car_type: car_type.to_string(),
        })
    }
}

async fn load(state: &AppState, id: i64) -> WebResult<CarCategory> {
    state
        .categories
        .find(CategoryId::new(id))
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))
}

/// `POST /car-categories`
pub async fn create(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CategoryRequest>,
) -> WebResult<ApiResponse<CarCategory>> {
    let category = state.categories.create(body.validate_new()?).await?;
    tracing::info!(category_id = %category.id, brand = %category.car_brand, "Car category created");
    Ok(ApiResponse::created_with_message("Car category added successfully", category))
}

/// `GET /car-categories`
pub async fn list(
    _auth: AuthUser,
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PageQuery>,
) -> WebResult<ApiResponse<NamedPage<CarCategory>>> {
    let page = state.categories.list(query.page_request()).await?;
    Ok(ApiResponse::ok(page.named("car_categories")))
}

/// `GET /car-categories/:id`
pub async fn show(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> WebResult<ApiResponse<CarCategory>> {
    Ok(ApiResponse::ok(load(&state, id).await?))
}

/// `PUT /car-categories/:id`
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<CategoryRequest>,
) -> WebResult<ApiResponse<CarCategory>> {
    let mut v = Validator::new();
    let brand = body.car_brand.as_deref().and_then(|s| v.required("car_brand", Some(s)));
    let car_type = body.car_type.as_deref().and_then(|s| v.required("type", Some(s)));
    body.check_lengths(&mut v);
    v.finish()?;

    let mut category = load(&state, id).await?;
    if let Some(brand) = brand {
        category.car_brand = brand.to_string();
    }
    if let Some(car_type) = car_type {
        category.car_type = car_type.to_string();
    }

    let category = state.categories.update(&category).await?;
    tracing::info!(category_id = %category.id, "Car category updated");
    Ok(ApiResponse::with_message("Car category updated successfully", category))
}

/// `DELETE /car-categories/:id`
pub async fn delete(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> WebResult<ApiResponse<CarCategory>> {
    let category = load(&state, id).await?;
    state.categories.delete(category.id).await?;
    tracing::info!(category_id = %category.id, "Car category deleted");
    Ok(ApiResponse::with_message("Car category deleted successfully", category))
}

/// `GET /car-brands`: every brand with its body types.
pub async fn brands(State(state): State<AppState>) -> WebResult<ApiResponse<Vec<BrandTypes>>> {
    Ok(ApiResponse::ok(state.categories.brands().await?))
}
