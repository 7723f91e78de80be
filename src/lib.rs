pub mod app_error;
pub mod app_state;
pub mod bootstrap;
pub mod config;
pub mod coupons;
pub mod db;
pub mod gateway;
pub mod lifecycle;
pub mod mailer;
pub mod models;
pub mod pricing;
pub mod routes;
pub mod schema;
pub mod signature;
pub mod storage;
