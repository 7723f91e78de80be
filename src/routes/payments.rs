use anyhow::Context;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::app_error::{AppError, StdResponse};
use crate::app_state::AppState;
use crate::gateway;
use crate::lifecycle::{decide_payment, OrderStatus, PaymentDecision, PaymentStatus};
use crate::mailer::spawn_order_confirmation;
use crate::models::{OrderEntity, OrderItemEntity};
use crate::schema::{coupons, order_items, orders};
use crate::signature::{verify_payment_signature, verify_webhook_signature};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest(
            "/payments",
            OpenApiRouter::new().routes(utoipa_axum::routes!(create_payment_order)),
        )
        .routes(utoipa_axum::routes!(verify_payment))
        .nest(
            "/webhooks",
            OpenApiRouter::new().routes(utoipa_axum::routes!(payment_gateway_webhook)),
        )
}

#[derive(Deserialize, ToSchema)]
struct CreatePaymentOrderReq {
    order_id: Uuid,
}

#[derive(Serialize, ToSchema)]
struct CreatePaymentOrderRes {
    gateway_order_ref: String,
    amount: f64,
    currency: String,
}

/// Register the order with the payment gateway and return the gateway's
/// order reference for the client checkout widget.
///
/// Re-entrant: a second call for the same order returns the stored reference
/// without creating another gateway order.
#[utoipa::path(
    post,
    path = "/gateway-order",
    tags = ["Payments"],
    request_body = CreatePaymentOrderReq,
    responses(
        (status = 200, description = "Gateway order created", body = StdResponse<CreatePaymentOrderRes, String>),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not awaiting payment")
    )
)]
async fn create_payment_order(
    State(state): State<AppState>,
    Json(body): Json<CreatePaymentOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = orders::table
        .find(body.order_id)
        .first(conn)
        .await
        .optional()
        .context("Failed to get order")?
        .ok_or(AppError::NotFound)?;

    if order.status != OrderStatus::Pending.as_str()
        || order.payment_status != PaymentStatus::Pending.as_str()
    {
        return Err(AppError::InvalidTransition(format!(
            "order {} is not awaiting payment",
            order.order_number
        )));
    }

    if let Some(existing) = order.gateway_order_ref {
        return Ok(StdResponse {
            data: Some(CreatePaymentOrderRes {
                gateway_order_ref: existing,
                amount: order.total,
                currency: "INR".into(),
            }),
            message: Some("Gateway order already exists"),
        });
    }

    let gateway_ref = gateway::create_gateway_order(
        &state.http_client,
        &state.config,
        order.total,
        &order.order_number,
    )
    .await?;

    diesel::update(orders::table.find(order.id))
        .set((
            orders::gateway_order_ref.eq(&gateway_ref),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .await
        .context("Failed to store gateway order ref")?;

    Ok(StdResponse {
        data: Some(CreatePaymentOrderRes {
            gateway_order_ref: gateway_ref,
            amount: order.total,
            currency: "INR".into(),
        }),
        message: Some("Gateway order created successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct VerifyPaymentReq {
    order_id: Uuid,
    gateway_order_ref: String,
    gateway_payment_ref: String,
    signature: String,
}

#[derive(Serialize, ToSchema)]
struct VerifyPaymentRes {
    verified: bool,
}

/// Verify the checkout callback signature and confirm the order.
///
/// The signature covers `"{gateway_order_ref}|{gateway_payment_ref}"` under
/// the gateway key secret. A mismatch marks the payment FAILED and leaves the
/// order PENDING so the customer can retry.
#[utoipa::path(
    post,
    path = "/verify-payment",
    tags = ["Payments"],
    request_body = VerifyPaymentReq,
    responses(
        (status = 200, description = "Payment verified and order confirmed", body = VerifyPaymentRes),
        (status = 400, description = "Signature mismatch", body = VerifyPaymentRes),
        (status = 404, description = "Order not found")
    )
)]
async fn verify_payment(
    State(state): State<AppState>,
    Json(body): Json<VerifyPaymentReq>,
) -> Result<impl IntoResponse, AppError> {
    let genuine = verify_payment_signature(
        &body.gateway_order_ref,
        &body.gateway_payment_ref,
        &body.signature,
        &state.config.gateway_key_secret,
    );

    if !genuine {
        let conn = &mut state
            .db_pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        diesel::update(
            orders::table
                .find(body.order_id)
                .filter(orders::status.eq(OrderStatus::Pending.as_str())),
        )
        .set((
            orders::payment_status.eq(PaymentStatus::Failed.as_str()),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .await
        .context("Failed to mark payment failed")?;

        tracing::warn!(order_id = %body.order_id, "Rejected payment callback with bad signature");
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(VerifyPaymentRes { verified: false }),
        )
            .into_response());
    }

    confirm_paid_order(
        &state,
        PaidOrderLookup::ById {
            id: body.order_id,
            gateway_order_ref: body.gateway_order_ref.clone(),
        },
        &body.gateway_payment_ref,
        &body.signature,
    )
    .await?;

    Ok(Json(VerifyPaymentRes { verified: true }).into_response())
}

#[derive(Deserialize)]
struct WebhookPaymentEntity {
    id: String,
    order_id: String,
}

#[derive(Deserialize)]
struct WebhookPayment {
    entity: WebhookPaymentEntity,
}

#[derive(Deserialize)]
struct WebhookPayload {
    payment: WebhookPayment,
}

#[derive(Deserialize)]
struct WebhookEvent {
    event: String,
    payload: WebhookPayload,
}

#[derive(Serialize, ToSchema)]
struct WebhookRes {
    received: bool,
}

/// Payment gateway webhook.
///
/// The signature header is verified against the raw request body before the
/// payload is parsed or any state is touched. Redelivery of an already
/// processed payment reference is acknowledged without side effects.
#[utoipa::path(
    post,
    path = "/payment-gateway",
    tags = ["Payments"],
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Event received", body = WebhookRes),
        (status = 401, description = "Missing or invalid signature")
    )
)]
async fn payment_gateway_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get("x-gateway-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    if !verify_webhook_signature(&body, signature, &state.config.gateway_webhook_secret) {
        tracing::warn!("Rejected webhook with bad signature");
        return Err(AppError::Unauthorized);
    }

    let event: WebhookEvent =
        serde_json::from_slice(&body).map_err(|err| AppError::BadRequest(err.to_string()))?;
    let payment = &event.payload.payment.entity;

    match event.event.as_str() {
        "payment.captured" | "order.paid" => {
            confirm_paid_order(
                &state,
                PaidOrderLookup::ByGatewayRef(payment.order_id.clone()),
                &payment.id,
                signature,
            )
            .await?;
        }
        "payment.failed" => {
            let conn = &mut state
                .db_pool
                .get()
                .await
                .context("Failed to obtain a DB connection pool")?;

            diesel::update(
                orders::table
                    .filter(orders::gateway_order_ref.eq(&payment.order_id))
                    .filter(orders::status.eq(OrderStatus::Pending.as_str())),
            )
            .set((
                orders::status.eq(OrderStatus::Cancelled.as_str()),
                orders::payment_status.eq(PaymentStatus::Failed.as_str()),
                orders::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await
            .context("Failed to mark order failed")?;
        }
        other => {
            tracing::debug!(event = other, "Ignoring unhandled webhook event");
        }
    }

    Ok(Json(WebhookRes { received: true }))
}

enum PaidOrderLookup {
    /// Checkout callback: the caller names the order, so the stored gateway
    /// reference must match the one the signature was computed over.
    ById { id: Uuid, gateway_order_ref: String },
    ByGatewayRef(String),
}

/// Confirm an order after a verified payment.
///
/// Runs in one transaction with the order row locked: the transition to
/// (CONFIRMED, PAID) is applied once, the coupon usage counter is bumped
/// atomically, and a repeat delivery of the same payment reference is a
/// no-op, as is a late delivery for an order already settled (DELIVERED or
/// CANCELLED). The confirmation email is dispatched after commit.
async fn confirm_paid_order(
    state: &AppState,
    lookup: PaidOrderLookup,
    payment_ref: &str,
    signature: &str,
) -> Result<(), AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let payment_ref = payment_ref.to_string();
    let signature = signature.to_string();
    let confirmed = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let order: Option<OrderEntity> = match &lookup {
                    PaidOrderLookup::ById { id, .. } => {
                        orders::table
                            .find(*id)
                            .for_update()
                            .first(conn)
                            .await
                            .optional()
                            .context("Failed to get order")?
                    }
                    PaidOrderLookup::ByGatewayRef(gateway_ref) => {
                        orders::table
                            .filter(orders::gateway_order_ref.eq(gateway_ref))
                            .for_update()
                            .first(conn)
                            .await
                            .optional()
                            .context("Failed to get order")?
                    }
                };
                let Some(order) = order else {
                    return Err(AppError::NotFound);
                };

                // A genuine signature for order A must not confirm order B.
                if let PaidOrderLookup::ById { gateway_order_ref, .. } = &lookup {
                    if order.gateway_order_ref.as_deref() != Some(gateway_order_ref.as_str()) {
                        return Err(AppError::BadRequest(
                            "gateway order reference does not match this order".into(),
                        ));
                    }
                }

                let current = OrderStatus::parse(&order.status).ok_or_else(|| {
                    AppError::InvalidTransition(format!("unknown order status: {}", order.status))
                })?;
                let payment = PaymentStatus::parse(&order.payment_status).ok_or_else(|| {
                    AppError::InvalidTransition(format!(
                        "unknown payment status: {}",
                        order.payment_status
                    ))
                })?;

                match decide_payment(
                    current,
                    payment,
                    order.gateway_payment_ref.as_deref(),
                    &payment_ref,
                ) {
                    PaymentDecision::AlreadyApplied => {
                        return Ok::<Option<(OrderEntity, Vec<OrderItemEntity>)>, AppError>(None);
                    }
                    PaymentDecision::Settled => {
                        tracing::warn!(
                            order = %order.order_number,
                            status = %order.status,
                            "Ignoring payment delivery for settled order"
                        );
                        return Ok(None);
                    }
                    PaymentDecision::Rejected => {
                        return Err(AppError::InvalidTransition(format!(
                            "cannot confirm order {} from {}",
                            order.order_number, order.status
                        )));
                    }
                    PaymentDecision::Confirm => {}
                }

                let updated: OrderEntity = diesel::update(orders::table.find(order.id))
                    .set((
                        orders::status.eq(OrderStatus::Confirmed.as_str()),
                        orders::payment_status.eq(PaymentStatus::Paid.as_str()),
                        orders::gateway_payment_ref.eq(&payment_ref),
                        orders::gateway_signature.eq(&signature),
                        orders::updated_at.eq(diesel::dsl::now),
                    ))
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to confirm order")?;

                if let Some(code) = &updated.coupon_code {
                    diesel::update(coupons::table.filter(coupons::code.eq(code)))
                        .set((
                            coupons::usage_count.eq(coupons::usage_count + 1),
                            coupons::updated_at.eq(diesel::dsl::now),
                        ))
                        .execute(conn)
                        .await
                        .context("Failed to increment coupon usage")?;
                }

                let items: Vec<OrderItemEntity> = order_items::table
                    .filter(order_items::order_id.eq(updated.id))
                    .get_results(conn)
                    .await
                    .context("Failed to get order items")?;

                Ok(Some((updated, items)))
            })
        })
        .await?;

    if let Some((order, items)) = confirmed {
        tracing::info!(order = %order.order_number, "Order confirmed after payment");
        spawn_order_confirmation(state.mailer.clone(), order, items);
    }

    Ok(())
}
