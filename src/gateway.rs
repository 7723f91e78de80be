//! Payment gateway REST client. Only the order-creation API is consumed;
//! payment capture happens in the gateway's hosted checkout and comes back
//! to us through the signed callback and webhook.

use anyhow::Context;

use crate::app_error::AppError;
use crate::config::Config;

/// Create an order at the payment gateway and return its reference id.
/// `amount` is in currency major units; the gateway expects minor units.
pub async fn create_gateway_order(
    client: &reqwest::Client,
    config: &Config,
    amount: f64,
    receipt: &str,
) -> Result<String, AppError> {
    let amount_minor = (amount * 100.0).round() as i64;

    let resp: serde_json::Value = client
        .post(format!("{}/orders", config.gateway_api_url))
        .basic_auth(&config.gateway_key_id, Some(&config.gateway_key_secret))
        .json(&serde_json::json!({
            "amount": amount_minor,
            "currency": "INR",
            "receipt": receipt,
        }))
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("PaymentGateway".into()))?
        .json()
        .await
        .context("Failed to parse gateway response")?;

    resp["id"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| anyhow::anyhow!("Gateway order creation failed: {resp}").into())
}
