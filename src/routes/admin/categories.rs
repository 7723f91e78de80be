use anyhow::Context;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::app_error::{AppError, StdResponse};
use crate::app_state::AppState;
use crate::models::{CategoryEntity, CreateCategoryEntity, UpdateCategoryEntity};
use crate::schema::{categories, menu_items};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/categories",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(list_categories))
            .routes(utoipa_axum::routes!(create_category))
            .routes(utoipa_axum::routes!(bulk_availability))
            .routes(utoipa_axum::routes!(update_category))
            .routes(utoipa_axum::routes!(delete_category)),
    )
}

/// List categories in display order.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin"],
    responses(
        (status = 200, description = "All categories", body = StdResponse<Vec<CategoryEntity>, String>)
    )
)]
async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let all: Vec<CategoryEntity> = categories::table
        .order_by(categories::display_order.asc())
        .get_results(conn)
        .await
        .context("Failed to get categories")?;

    Ok(StdResponse {
        data: Some(all),
        message: Some("Get categories successfully"),
    })
}

/// Add a category.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Admin"],
    request_body = CreateCategoryEntity,
    responses(
        (status = 200, description = "Create category successfully", body = StdResponse<CategoryEntity, String>)
    )
)]
async fn create_category(
    State(state): State<AppState>,
    Json(body): Json<CreateCategoryEntity>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let category: CategoryEntity = diesel::insert_into(categories::table)
        .values(&body)
        .returning(CategoryEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create category")?;

    Ok(StdResponse {
        data: Some(category),
        message: Some("Create category successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct BulkAvailabilityReq {
    category_ids: Vec<String>,
    is_available: bool,
}

/// Flip availability for every menu item in the given categories. One
/// statement, so a category is never left half toggled.
#[utoipa::path(
    patch,
    path = "/bulk-availability",
    tags = ["Admin"],
    request_body = BulkAvailabilityReq,
    responses(
        (status = 200, description = "Updated item count", body = StdResponse<usize, String>)
    )
)]
async fn bulk_availability(
    State(state): State<AppState>,
    Json(body): Json<BulkAvailabilityReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.category_ids.is_empty() {
        return Err(AppError::BadRequest("category_ids must not be empty".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let updated = diesel::update(
        menu_items::table.filter(menu_items::category_id.eq_any(&body.category_ids)),
    )
    .set((
        menu_items::is_available.eq(body.is_available),
        menu_items::updated_at.eq(diesel::dsl::now),
    ))
    .execute(conn)
    .await
    .context("Failed to update availability")?;

    Ok(StdResponse {
        data: Some(updated),
        message: Some("Update availability successfully"),
    })
}

/// Update a category. Only the provided fields change.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Admin"],
    params(
        ("id" = String, Path, description = "Category ID to update")
    ),
    request_body = UpdateCategoryEntity,
    responses(
        (status = 200, description = "Update category successfully", body = StdResponse<CategoryEntity, String>),
        (status = 404, description = "Category not found")
    )
)]
async fn update_category(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<UpdateCategoryEntity>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let category: CategoryEntity = diesel::update(categories::table.find(&id))
        .set((&body, categories::updated_at.eq(diesel::dsl::now)))
        .returning(CategoryEntity::as_returning())
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(category),
        message: Some("Update category successfully"),
    })
}

/// Remove an empty category. Categories that still hold menu items are
/// protected by the foreign key and come back as 400.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Admin"],
    params(
        ("id" = String, Path, description = "Category ID to delete")
    ),
    responses(
        (status = 200, description = "Delete category successfully", body = StdResponse<String, String>),
        (status = 400, description = "Category still has menu items"),
        (status = 404, description = "Category not found")
    )
)]
async fn delete_category(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let deleted = diesel::delete(categories::table.find(&id))
        .execute(conn)
        .await
        .map_err(|err| match err {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::ForeignKeyViolation,
                _,
            ) => AppError::BadRequest("Category still has menu items".into()),
            other => other.into(),
        })?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }

    Ok(StdResponse {
        data: Some(id),
        message: Some("Delete category successfully"),
    })
}
