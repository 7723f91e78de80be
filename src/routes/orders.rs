use std::collections::HashMap;

use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, QueryResult, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::app_error::{AppError, StdResponse};
use crate::app_state::AppState;
use crate::db::DieselError;
use crate::lifecycle::{OrderStatus, PaymentStatus};
use crate::models::{
    CouponEntity, CreateCustomerEntity, CreateOrderEntity, CreateOrderItemEntity, CustomerEntity,
    CustomizationSelection, MenuItemEntity, OrderEntity, OrderItemEntity,
};
use crate::pricing::{self, PricedLine, Totals};
use crate::schema::{coupons, customers, menu_items, order_items, orders};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_order))
            .routes(utoipa_axum::routes!(get_orders_by_phone))
            .routes(utoipa_axum::routes!(get_order)),
    )
}

#[derive(Deserialize, Debug, ToSchema)]
struct CreateOrderLine {
    item_id: String,
    quantity: i32,
    #[serde(default)]
    customizations: Vec<CustomizationSelection>,
}

#[derive(Deserialize, Debug, ToSchema)]
struct DeliveryDetails {
    full_name: String,
    phone: String,
    email: Option<String>,
    address_line1: String,
    address_line2: Option<String>,
    landmark: Option<String>,
    pincode: String,
    city: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
struct CreateOrderReq {
    items: Vec<CreateOrderLine>,
    delivery_details: DeliveryDetails,
    coupon_code: Option<String>,
    /// Client-side grand total, cross-checked against the server computation.
    total: f64,
}

#[derive(Serialize, ToSchema)]
struct CreateOrderRes {
    order_id: Uuid,
    order_number: String,
    totals: Totals,
}

/// Millisecond timestamp plus a short random nonce, so two checkouts in the
/// same millisecond still get distinct numbers.
fn next_order_number(prefix: &str) -> String {
    let nonce = Uuid::new_v4().simple().to_string();
    format!(
        "{prefix}{}{}",
        Utc::now().timestamp_millis(),
        &nonce[..4].to_uppercase()
    )
}

/// Price snapshot for one cart line, frozen at order time.
struct LineSnapshot {
    item_id: String,
    item_name: String,
    unit_price: f64,
    quantity: i32,
    customizations: serde_json::Value,
}

/// Create a new order from the submitted cart.
///
/// Unit prices are recomputed server-side from the menu plus customization
/// deltas. The customer upsert, the order row and its line items are written
/// in one transaction; the order starts as (PENDING, PENDING).
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    request_body = CreateOrderReq,
    responses(
        (status = 200, description = "Create order successfully", body = StdResponse<CreateOrderRes, String>),
        (status = 400, description = "Invalid cart, delivery details, coupon or total")
    )
)]
async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<CreateOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.items.is_empty() {
        return Err(AppError::BadRequest("items must not be empty".into()));
    }
    let details = &body.delivery_details;
    for (field, value) in [
        ("full_name", &details.full_name),
        ("phone", &details.phone),
        ("address_line1", &details.address_line1),
        ("pincode", &details.pincode),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("{field} is required")));
        }
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let item_ids: Vec<&str> = body.items.iter().map(|line| line.item_id.as_str()).collect();
    let referenced: Vec<MenuItemEntity> = menu_items::table
        .filter(menu_items::id.eq_any(&item_ids))
        .get_results(conn)
        .await
        .context("Failed to get menu items")?;
    let by_id: HashMap<&str, &MenuItemEntity> =
        referenced.iter().map(|item| (item.id.as_str(), item)).collect();

    let mut priced: Vec<PricedLine> = Vec::with_capacity(body.items.len());
    let mut snapshots: Vec<LineSnapshot> = Vec::with_capacity(body.items.len());
    for line in &body.items {
        let Some(menu_item) = by_id.get(line.item_id.as_str()) else {
            return Err(AppError::BadRequest(format!(
                "Unknown menu item: {}",
                line.item_id
            )));
        };
        if !menu_item.is_available {
            return Err(AppError::BadRequest(format!(
                "Menu item is unavailable: {}",
                menu_item.name
            )));
        }

        let delta: f64 = line.customizations.iter().map(|c| c.price_delta).sum();
        let unit_price =
            pricing::to_f64(pricing::to_decimal(menu_item.price) + pricing::to_decimal(delta));
        let priced_line = PricedLine {
            unit_price,
            quantity: line.quantity,
        };
        pricing::validate_line(&priced_line).map_err(|err| AppError::BadRequest(err.to_string()))?;

        snapshots.push(LineSnapshot {
            item_id: menu_item.id.clone(),
            item_name: menu_item.name.clone(),
            unit_price,
            quantity: line.quantity,
            customizations: serde_json::to_value(&line.customizations)
                .context("Failed to serialize customizations")?,
        });
        priced.push(priced_line);
    }

    let cart_subtotal = pricing::subtotal(&priced);

    let coupon_code = body
        .coupon_code
        .as_deref()
        .map(|code| code.trim().to_uppercase())
        .filter(|code| !code.is_empty());
    let discount = match &coupon_code {
        Some(code) => {
            let coupon: Option<CouponEntity> = coupons::table
                .filter(coupons::code.eq(code))
                .first(conn)
                .await
                .optional()
                .context("Failed to look up coupon")?;
            crate::coupons::evaluate(coupon.as_ref(), cart_subtotal, Utc::now())
                .map_err(|rejection| AppError::BadRequest(rejection.message()))?
        }
        None => Decimal::ZERO,
    };

    let totals = pricing::compute_totals(&priced, discount, &state.config.pricing);
    if !pricing::amounts_match(totals.grand_total, body.total) {
        return Err(AppError::BadRequest(format!(
            "total mismatch: expected {}, got {}",
            totals.grand_total, body.total
        )));
    }

    let new_customer = CreateCustomerEntity {
        name: details.full_name.trim().to_string(),
        phone: details.phone.trim().to_string(),
        email: details.email.clone().filter(|email| !email.is_empty()),
    };
    let order_number = next_order_number(&state.config.order_number_prefix);
    let new_order_template = CreateOrderEntity {
        order_number: order_number.clone(),
        customer_id: 0, // filled in after the customer upsert
        status: OrderStatus::Pending.as_str().into(),
        payment_status: PaymentStatus::Pending.as_str().into(),
        subtotal: totals.subtotal,
        delivery_fee: totals.delivery_fee,
        tax: totals.tax,
        discount_amount: totals.discount,
        total: totals.grand_total,
        coupon_code: coupon_code.clone(),
        delivery_name: details.full_name.trim().to_string(),
        delivery_phone: details.phone.trim().to_string(),
        delivery_email: new_customer.email.clone(),
        address_line1: details.address_line1.trim().to_string(),
        address_line2: details.address_line2.clone(),
        landmark: details.landmark.clone(),
        city: details.city.clone().unwrap_or_else(|| "Ahmedabad".into()),
        pincode: details.pincode.trim().to_string(),
        estimated_delivery: Utc::now() + chrono::Duration::minutes(40),
    };

    let order = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let customer: CustomerEntity = diesel::insert_into(customers::table)
                    .values(&new_customer)
                    .on_conflict(customers::phone)
                    .do_update()
                    .set((
                        customers::name.eq(new_customer.name.clone()),
                        customers::email.eq(new_customer.email.clone()),
                        customers::updated_at.eq(diesel::dsl::now),
                    ))
                    .returning(CustomerEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to upsert customer")?;

                let new_order = CreateOrderEntity {
                    customer_id: customer.id,
                    ..new_order_template
                };
                let order: OrderEntity = diesel::insert_into(orders::table)
                    .values(&new_order)
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create order")?;

                let new_items: Vec<CreateOrderItemEntity> = snapshots
                    .into_iter()
                    .map(|snapshot| CreateOrderItemEntity {
                        order_id: order.id,
                        line_subtotal: pricing::to_f64(
                            pricing::to_decimal(snapshot.unit_price)
                                * Decimal::from(snapshot.quantity),
                        ),
                        item_id: snapshot.item_id,
                        item_name: snapshot.item_name,
                        unit_price: snapshot.unit_price,
                        quantity: snapshot.quantity,
                        customizations: snapshot.customizations,
                    })
                    .collect();
                diesel::insert_into(order_items::table)
                    .values(new_items)
                    .execute(conn)
                    .await
                    .context("Failed to create order items")?;

                Ok::<OrderEntity, anyhow::Error>(order)
            })
        })
        .await
        .context("Transaction failed")?;

    Ok(StdResponse {
        data: Some(CreateOrderRes {
            order_id: order.id,
            order_number,
            totals,
        }),
        message: Some("Create order successfully"),
    })
}

#[derive(Serialize, ToSchema)]
pub struct GetOrderRes {
    pub order: OrderEntity,
    pub order_items: Vec<OrderItemEntity>,
}

#[derive(Deserialize, IntoParams)]
struct ListOrdersQuery {
    /// Customer phone number the orders were placed with
    phone: String,
}

/// Fetch order history for a phone number, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Orders"],
    params(ListOrdersQuery),
    responses(
        (status = 200, description = "Get orders successfully", body = StdResponse<Vec<GetOrderRes>, String>)
    )
)]
async fn get_orders_by_phone(
    Query(query): Query<ListOrdersQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    if query.phone.trim().is_empty() {
        return Err(AppError::BadRequest("phone is required".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let customer: Option<CustomerEntity> = customers::table
        .filter(customers::phone.eq(query.phone.trim()))
        .first(conn)
        .await
        .optional()
        .context("Failed to look up customer")?;
    let Some(customer) = customer else {
        return Ok(StdResponse {
            data: Some(Vec::<GetOrderRes>::new()),
            message: Some("Get orders successfully"),
        });
    };

    let order_list: Vec<OrderEntity> = orders::table
        .filter(orders::customer_id.eq(customer.id))
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

/// Fetch a single order with its line items.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    params(
        ("id" = Uuid, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<GetOrderRes, String>),
        (status = 404, description = "Order not found")
    )
)]
async fn get_order(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: QueryResult<OrderEntity> = orders::table.find(id).get_result(conn).await;
    let order = match order {
        Ok(order) => order,
        Err(DieselError::NotFound) => return Err(AppError::NotFound),
        Err(err) => return Err(AppError::Other(err.into())),
    };

    let items: Vec<OrderItemEntity> = order_items::table
        .filter(order_items::order_id.eq(order.id))
        .get_results(conn)
        .await
        .context("Failed to get order items")?;

    Ok(StdResponse {
        data: Some(GetOrderRes {
            order,
            order_items: items,
        }),
        message: Some("Get order successfully"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_are_distinct_within_a_millisecond() {
        let first = next_order_number("TKH");
        let second = next_order_number("TKH");
        assert!(first.starts_with("TKH"));
        assert!(second.starts_with("TKH"));
        assert_ne!(first, second);
    }
}
