use anyhow::Context;
use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use chrono::Utc;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::app_error::AppError;
use crate::app_state::AppState;
use crate::coupons::evaluate_amount;
use crate::models::CouponEntity;
use crate::schema::coupons;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/coupons",
        OpenApiRouter::new().routes(utoipa_axum::routes!(validate_coupon)),
    )
}

#[derive(Deserialize, ToSchema)]
struct ValidateCouponReq {
    code: String,
    cart_total: f64,
}

#[derive(Serialize, ToSchema)]
struct ValidateCouponRes {
    valid: bool,
    discount_amount: f64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    coupon: Option<CouponEntity>,
}

/// Validate a coupon against the current cart subtotal.
///
/// Read-only: usage counts are not consumed here. Business-rule rejections
/// come back as 200 with `valid: false` since the caller is a storefront form.
#[utoipa::path(
    post,
    path = "/validate",
    tags = ["Coupons"],
    request_body = ValidateCouponReq,
    responses(
        (status = 200, description = "Validation outcome", body = ValidateCouponRes)
    )
)]
async fn validate_coupon(
    State(state): State<AppState>,
    Json(body): Json<ValidateCouponReq>,
) -> Result<impl IntoResponse, AppError> {
    let code = body.code.trim().to_uppercase();
    if code.is_empty() {
        return Ok(Json(ValidateCouponRes {
            valid: false,
            discount_amount: 0.0,
            message: "Coupon code is required".into(),
            coupon: None,
        }));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let coupon: Option<CouponEntity> = coupons::table
        .filter(coupons::code.eq(&code))
        .first(conn)
        .await
        .optional()
        .context("Failed to look up coupon")?;

    match evaluate_amount(coupon.as_ref(), body.cart_total, Utc::now()) {
        Ok(discount_amount) => Ok(Json(ValidateCouponRes {
            valid: true,
            discount_amount,
            message: "Coupon applied successfully!".into(),
            coupon,
        })),
        Err(rejection) => Ok(Json(ValidateCouponRes {
            valid: false,
            discount_amount: 0.0,
            message: rejection.message(),
            coupon: None,
        })),
    }
}
