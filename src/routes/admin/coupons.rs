use anyhow::Context;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::app_error::{AppError, StdResponse};
use crate::app_state::AppState;
use crate::coupons::{DISCOUNT_KIND_FIXED, DISCOUNT_KIND_PERCENTAGE};
use crate::models::{CouponEntity, CreateCouponEntity, UpdateCouponEntity};
use crate::schema::coupons;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/coupons",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(list_coupons))
            .routes(utoipa_axum::routes!(create_coupon))
            .routes(utoipa_axum::routes!(update_coupon))
            .routes(utoipa_axum::routes!(delete_coupon)),
    )
}

fn check_discount_kind(kind: &str) -> Result<(), AppError> {
    if kind != DISCOUNT_KIND_PERCENTAGE && kind != DISCOUNT_KIND_FIXED {
        return Err(AppError::BadRequest(format!(
            "discount_kind must be {DISCOUNT_KIND_PERCENTAGE} or {DISCOUNT_KIND_FIXED}"
        )));
    }
    Ok(())
}

/// List all coupons with their usage counters.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin"],
    responses(
        (status = 200, description = "All coupons", body = StdResponse<Vec<CouponEntity>, String>)
    )
)]
async fn list_coupons(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let all: Vec<CouponEntity> = coupons::table
        .order_by(coupons::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get coupons")?;

    Ok(StdResponse {
        data: Some(all),
        message: Some("Get coupons successfully"),
    })
}

/// Add a coupon. Codes are stored uppercase so lookups are case-insensitive.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Admin"],
    request_body = CreateCouponEntity,
    responses(
        (status = 200, description = "Create coupon successfully", body = StdResponse<CouponEntity, String>),
        (status = 400, description = "Invalid discount kind or value")
    )
)]
async fn create_coupon(
    State(state): State<AppState>,
    Json(mut body): Json<CreateCouponEntity>,
) -> Result<impl IntoResponse, AppError> {
    body.code = body.code.trim().to_uppercase();
    if body.code.is_empty() {
        return Err(AppError::BadRequest("code must not be empty".into()));
    }
    check_discount_kind(&body.discount_kind)?;
    if body.discount_value <= 0.0 {
        return Err(AppError::BadRequest("discount_value must be positive".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let coupon: CouponEntity = diesel::insert_into(coupons::table)
        .values(&body)
        .returning(CouponEntity::as_returning())
        .get_result(conn)
        .await
        .map_err(|err| match err {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => AppError::BadRequest("Coupon code already exists".into()),
            other => other.into(),
        })?;

    Ok(StdResponse {
        data: Some(coupon),
        message: Some("Create coupon successfully"),
    })
}

/// Update a coupon. Only the provided fields change; `usage_count` is not
/// editable here, it only moves when payments are confirmed.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Admin"],
    params(
        ("id" = Uuid, Path, description = "Coupon ID to update")
    ),
    request_body = UpdateCouponEntity,
    responses(
        (status = 200, description = "Update coupon successfully", body = StdResponse<CouponEntity, String>),
        (status = 404, description = "Coupon not found")
    )
)]
async fn update_coupon(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(mut body): Json<UpdateCouponEntity>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(code) = &body.code {
        let code = code.trim().to_uppercase();
        if code.is_empty() {
            return Err(AppError::BadRequest("code must not be empty".into()));
        }
        body.code = Some(code);
    }
    if let Some(kind) = &body.discount_kind {
        check_discount_kind(kind)?;
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let coupon: CouponEntity = diesel::update(coupons::table.find(id))
        .set((&body, coupons::updated_at.eq(diesel::dsl::now)))
        .returning(CouponEntity::as_returning())
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(coupon),
        message: Some("Update coupon successfully"),
    })
}

/// Remove a coupon. Orders that already used it keep their stored code and
/// discount amount.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Admin"],
    params(
        ("id" = Uuid, Path, description = "Coupon ID to delete")
    ),
    responses(
        (status = 200, description = "Delete coupon successfully", body = StdResponse<Uuid, String>),
        (status = 404, description = "Coupon not found")
    )
)]
async fn delete_coupon(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let deleted = diesel::delete(coupons::table.find(id))
        .execute(conn)
        .await
        .context("Failed to delete coupon")?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }

    Ok(StdResponse {
        data: Some(id),
        message: Some("Delete coupon successfully"),
    })
}
