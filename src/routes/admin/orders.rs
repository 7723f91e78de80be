use std::collections::HashMap;

use anyhow::Context;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use diesel::dsl::sum;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::app_error::{AppError, StdResponse};
use crate::app_state::AppState;
use crate::lifecycle::{OrderStatus, PaymentStatus};
use crate::models::{OrderEntity, OrderItemEntity};
use crate::routes::admin::AdminIdentity;
use crate::routes::orders::GetOrderRes;
use crate::schema::{menu_items, order_items, orders};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest(
            "/orders",
            OpenApiRouter::new().routes(utoipa_axum::routes!(list_orders)),
        )
        .nest(
            "/dashboard",
            OpenApiRouter::new().routes(utoipa_axum::routes!(dashboard)),
        )
}

/// The status transition endpoint lives outside the `/admin` prefix but
/// behind the same session guard.
pub fn status_routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new().routes(utoipa_axum::routes!(update_order_status)),
    )
}

/// List every order, newest first, with line items attached.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin"],
    responses(
        (status = 200, description = "All orders", body = StdResponse<Vec<GetOrderRes>, String>)
    )
)]
async fn list_orders(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order_list: Vec<OrderEntity> = orders::table
        .order_by(orders::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get orders")?;

    let order_ids: Vec<Uuid> = order_list.iter().map(|order| order.id).collect();
    let items: Vec<OrderItemEntity> = order_items::table
        .filter(order_items::order_id.eq_any(&order_ids))
        .get_results(conn)
        .await
        .context("Failed to get order items")?;

    let mut group: HashMap<Uuid, Vec<OrderItemEntity>> = HashMap::new();
    for item in items {
        group.entry(item.order_id).or_default().push(item);
    }

    let orders_with_items: Vec<GetOrderRes> = order_list
        .into_iter()
        .map(|order| GetOrderRes {
            order_items: group.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect();

    Ok(StdResponse {
        data: Some(orders_with_items),
        message: Some("Get orders successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateStatusReq {
    status: OrderStatus,
}

/// Move an order through the delivery pipeline.
///
/// Transitions outside the lifecycle table are rejected with 409. Marking
/// an order DELIVERED also settles its payment status, which covers
/// cash-on-delivery.
#[utoipa::path(
    patch,
    path = "/{id}/status",
    tags = ["Admin"],
    params(
        ("id" = Uuid, Path, description = "Order ID to update")
    ),
    request_body = UpdateStatusReq,
    responses(
        (status = 200, description = "Update order status successfully", body = StdResponse<OrderEntity, String>),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition not allowed")
    )
)]
async fn update_order_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(admin): Extension<AdminIdentity>,
    Json(body): Json<UpdateStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let next = body.status;
    let updated = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let order: OrderEntity = orders::table
                    .find(id)
                    .for_update()
                    .first(conn)
                    .await
                    .optional()
                    .context("Failed to get order")?
                    .ok_or(AppError::NotFound)?;

                let current = OrderStatus::parse(&order.status).ok_or_else(|| {
                    AppError::InvalidTransition(format!(
                        "unknown order status: {}",
                        order.status
                    ))
                })?;
                if !current.can_transition(next) {
                    return Err(AppError::InvalidTransition(format!(
                        "cannot move order {} from {} to {}",
                        order.order_number,
                        current.as_str(),
                        next.as_str()
                    )));
                }

                let updated: OrderEntity = if next.forces_paid() {
                    diesel::update(orders::table.find(order.id))
                        .set((
                            orders::status.eq(next.as_str()),
                            orders::payment_status.eq(PaymentStatus::Paid.as_str()),
                            orders::updated_at.eq(diesel::dsl::now),
                        ))
                        .returning(OrderEntity::as_returning())
                        .get_result(conn)
                        .await
                        .context("Failed to update order status")?
                } else {
                    diesel::update(orders::table.find(order.id))
                        .set((
                            orders::status.eq(next.as_str()),
                            orders::updated_at.eq(diesel::dsl::now),
                        ))
                        .returning(OrderEntity::as_returning())
                        .get_result(conn)
                        .await
                        .context("Failed to update order status")?
                };

                Ok::<OrderEntity, AppError>(updated)
            })
        })
        .await?;

    tracing::info!(
        order = %updated.order_number,
        status = %updated.status,
        admin = %admin.email,
        "Order status updated"
    );

    Ok(StdResponse {
        data: Some(updated),
        message: Some("Update order status successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct DashboardRes {
    total_orders: i64,
    pending_orders: i64,
    delivered_orders: i64,
    total_menu_items: i64,
    total_revenue: f64,
    recent_orders: Vec<OrderEntity>,
}

/// Back-office dashboard: order counts, paid revenue and the five most
/// recent orders.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin"],
    responses(
        (status = 200, description = "Dashboard stats", body = StdResponse<DashboardRes, String>)
    )
)]
async fn dashboard(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let total_orders: i64 = orders::table
        .count()
        .get_result(conn)
        .await
        .context("Failed to count orders")?;

    let pending_orders: i64 = orders::table
        .filter(orders::status.eq(OrderStatus::Pending.as_str()))
        .count()
        .get_result(conn)
        .await
        .context("Failed to count pending orders")?;

    let delivered_orders: i64 = orders::table
        .filter(orders::status.eq(OrderStatus::Delivered.as_str()))
        .count()
        .get_result(conn)
        .await
        .context("Failed to count delivered orders")?;

    let total_menu_items: i64 = menu_items::table
        .count()
        .get_result(conn)
        .await
        .context("Failed to count menu items")?;

    let total_revenue: Option<f64> = orders::table
        .filter(orders::payment_status.eq(PaymentStatus::Paid.as_str()))
        .select(sum(orders::total))
        .get_result(conn)
        .await
        .context("Failed to sum revenue")?;

    let recent_orders: Vec<OrderEntity> = orders::table
        .order_by(orders::created_at.desc())
        .limit(5)
        .get_results(conn)
        .await
        .context("Failed to get recent orders")?;

    Ok(StdResponse {
        data: Some(DashboardRes {
            total_orders,
            pending_orders,
            delivered_orders,
            total_menu_items,
            total_revenue: total_revenue.unwrap_or(0.0),
            recent_orders,
        }),
        message: Some("Get dashboard successfully"),
    })
}
