use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;

use crate::pricing::PricingConfig;

/// Service configuration, loaded once at startup and injected through
/// `AppState`. Handlers never read the environment directly.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Payment gateway REST API base URL
    pub gateway_api_url: String,
    /// Payment gateway API key id (basic auth user)
    pub gateway_key_id: String,
    /// Payment gateway API key secret; also signs checkout callbacks
    pub gateway_key_secret: String,
    /// Payment gateway webhook signing secret
    pub gateway_webhook_secret: String,
    /// JWT secret for admin sessions
    pub jwt_secret: String,
    /// Prefix for generated order numbers
    pub order_number_prefix: String,
    /// Public base URL of the storefront (used in confirmation emails)
    pub public_base_url: String,
    /// Display name of the store (email subjects and bodies)
    pub store_name: String,
    /// SMTP relay; email is disabled when unset
    pub smtp_host: Option<String>,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub smtp_from: Option<String>,
    /// S3 bucket for menu images; upload is disabled when unset
    pub images_bucket: Option<String>,
    /// Public base URL the bucket is served from
    pub images_public_base_url: Option<String>,
    /// Delivery fee threshold, flat fee and tax rate
    pub pricing: PricingConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            http_port: parse_or("HTTP_PORT", 3000)?,
            gateway_api_url: std::env::var("GATEWAY_API_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com/v1".into()),
            gateway_key_id: std::env::var("GATEWAY_KEY_ID")
                .context("GATEWAY_KEY_ID must be set")?,
            gateway_key_secret: std::env::var("GATEWAY_KEY_SECRET")
                .context("GATEWAY_KEY_SECRET must be set")?,
            gateway_webhook_secret: std::env::var("GATEWAY_WEBHOOK_SECRET")
                .context("GATEWAY_WEBHOOK_SECRET must be set")?,
            jwt_secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            order_number_prefix: std::env::var("ORDER_NUMBER_PREFIX")
                .unwrap_or_else(|_| "TKH".into()),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            store_name: std::env::var("STORE_NAME").unwrap_or_else(|_| "Tikki House".into()),
            smtp_host: optional("SMTP_HOST"),
            smtp_user: optional("SMTP_USER"),
            smtp_pass: optional("SMTP_PASS"),
            smtp_from: optional("SMTP_FROM"),
            images_bucket: optional("IMAGES_BUCKET"),
            images_public_base_url: optional("IMAGES_PUBLIC_BASE_URL"),
            pricing: PricingConfig {
                free_delivery_threshold: parse_decimal_or("FREE_DELIVERY_THRESHOLD", "200")?,
                delivery_fee: parse_decimal_or("DELIVERY_FEE", "30")?,
                tax_rate: parse_decimal_or("TAX_RATE", "0.05")?,
            },
        })
    }
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid value for {key}: {raw}")),
        Err(_) => Ok(default),
    }
}

fn parse_decimal_or(key: &str, default: &str) -> Result<Decimal> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    Decimal::from_str(&raw).map_err(|_| anyhow::anyhow!("Invalid decimal for {key}: {raw}"))
}
