use anyhow::Context;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use utoipa_axum::router::OpenApiRouter;

use crate::app_error::{AppError, StdResponse};
use crate::app_state::AppState;
use crate::models::{CreateCustomizationEntity, CustomizationEntity, UpdateCustomizationEntity};
use crate::schema::customizations;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/customizations",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(list_customizations))
            .routes(utoipa_axum::routes!(create_customization))
            .routes(utoipa_axum::routes!(update_customization))
            .routes(utoipa_axum::routes!(delete_customization)),
    )
}

const CUSTOMIZATION_KINDS: [&str; 3] = ["extra", "removal", "choice"];

fn check_kind(kind: &str) -> Result<(), AppError> {
    if !CUSTOMIZATION_KINDS.contains(&kind) {
        return Err(AppError::BadRequest(format!(
            "kind must be one of: {}",
            CUSTOMIZATION_KINDS.join(", ")
        )));
    }
    Ok(())
}

/// List every customization option, global ones included.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin"],
    responses(
        (status = 200, description = "All customizations", body = StdResponse<Vec<CustomizationEntity>, String>)
    )
)]
async fn list_customizations(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let all: Vec<CustomizationEntity> = customizations::table
        .order_by(customizations::name.asc())
        .get_results(conn)
        .await
        .context("Failed to get customizations")?;

    Ok(StdResponse {
        data: Some(all),
        message: Some("Get customizations successfully"),
    })
}

/// Add a customization option. A null `category_id` makes it global.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Admin"],
    request_body = CreateCustomizationEntity,
    responses(
        (status = 200, description = "Create customization successfully", body = StdResponse<CustomizationEntity, String>),
        (status = 400, description = "Invalid kind")
    )
)]
async fn create_customization(
    State(state): State<AppState>,
    Json(body): Json<CreateCustomizationEntity>,
) -> Result<impl IntoResponse, AppError> {
    check_kind(&body.kind)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let option: CustomizationEntity = diesel::insert_into(customizations::table)
        .values(&body)
        .returning(CustomizationEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create customization")?;

    Ok(StdResponse {
        data: Some(option),
        message: Some("Create customization successfully"),
    })
}

/// Update a customization option. Only the provided fields change.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Admin"],
    params(
        ("id" = String, Path, description = "Customization ID to update")
    ),
    request_body = UpdateCustomizationEntity,
    responses(
        (status = 200, description = "Update customization successfully", body = StdResponse<CustomizationEntity, String>),
        (status = 404, description = "Customization not found")
    )
)]
async fn update_customization(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<UpdateCustomizationEntity>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(kind) = &body.kind {
        check_kind(kind)?;
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let option: CustomizationEntity = diesel::update(customizations::table.find(&id))
        .set((&body, customizations::updated_at.eq(diesel::dsl::now)))
        .returning(CustomizationEntity::as_returning())
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(option),
        message: Some("Update customization successfully"),
    })
}

/// Remove a customization option. Order snapshots keep their frozen copy.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Admin"],
    params(
        ("id" = String, Path, description = "Customization ID to delete")
    ),
    responses(
        (status = 200, description = "Delete customization successfully", body = StdResponse<String, String>),
        (status = 404, description = "Customization not found")
    )
)]
async fn delete_customization(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let deleted = diesel::delete(customizations::table.find(&id))
        .execute(conn)
        .await
        .context("Failed to delete customization")?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }

    Ok(StdResponse {
        data: Some(id),
        message: Some("Delete customization successfully"),
    })
}
