use chrono::{DateTime, Utc};
use diesel::prelude::{AsChangeset, Identifiable, Insertable, Queryable};
use diesel::Selectable;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

// Admins

#[derive(Queryable, Selectable, Identifiable, Debug)]
#[diesel(table_name = crate::schema::admins)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AdminEntity {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::admins)]
pub struct CreateAdminEntity {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

// Customers

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::customers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CustomerEntity {
    pub id: i32,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::customers)]
pub struct CreateCustomerEntity {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

// Categories

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CategoryEntity {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::categories)]
pub struct CreateCategoryEntity {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub display_order: i32,
}

#[derive(AsChangeset, Deserialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::categories)]
pub struct UpdateCategoryEntity {
    pub slug: Option<String>,
    pub name: Option<String>,
    pub display_order: Option<i32>,
}

// Menu items

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::menu_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MenuItemEntity {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub image: Option<String>,
    pub is_veg: bool,
    pub is_available: bool,
    pub category_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::menu_items)]
pub struct CreateMenuItemEntity {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub image: Option<String>,
    pub is_veg: bool,
    pub is_available: bool,
    pub category_id: String,
}

#[derive(AsChangeset, Deserialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::menu_items)]
pub struct UpdateMenuItemEntity {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
    pub is_veg: Option<bool>,
    pub is_available: Option<bool>,
    pub category_id: Option<String>,
}

// Customizations

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::customizations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CustomizationEntity {
    pub id: String,
    pub name: String,
    pub price_delta: f64,
    pub kind: String,
    pub category_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::customizations)]
pub struct CreateCustomizationEntity {
    pub id: String,
    pub name: String,
    pub price_delta: f64,
    pub kind: String,
    pub category_id: Option<String>,
}

#[derive(AsChangeset, Deserialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::customizations)]
pub struct UpdateCustomizationEntity {
    pub name: Option<String>,
    pub price_delta: Option<f64>,
    pub kind: Option<String>,
    pub category_id: Option<String>,
}

// Coupons

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::coupons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CouponEntity {
    pub id: Uuid,
    pub code: String,
    pub discount_kind: String,
    pub discount_value: f64,
    pub min_order_amount: f64,
    pub max_discount: Option<f64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::coupons)]
pub struct CreateCouponEntity {
    pub code: String,
    pub discount_kind: String,
    pub discount_value: f64,
    pub min_order_amount: f64,
    pub max_discount: Option<f64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub is_active: bool,
}

#[derive(AsChangeset, Deserialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::coupons)]
pub struct UpdateCouponEntity {
    pub code: Option<String>,
    pub discount_kind: Option<String>,
    pub discount_value: Option<f64>,
    pub min_order_amount: Option<f64>,
    pub max_discount: Option<f64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub is_active: Option<bool>,
}

// Orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: i32,
    pub status: String,
    pub payment_status: String,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub tax: f64,
    pub discount_amount: f64,
    pub coupon_code: Option<String>,
    pub total: f64,
    pub gateway_order_ref: Option<String>,
    pub gateway_payment_ref: Option<String>,
    pub gateway_signature: Option<String>,
    pub delivery_name: String,
    pub delivery_phone: String,
    pub delivery_email: Option<String>,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub landmark: Option<String>,
    pub city: String,
    pub pincode: String,
    pub estimated_delivery: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::orders)]
pub struct CreateOrderEntity {
    pub order_number: String,
    pub customer_id: i32,
    pub status: String,
    pub payment_status: String,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub tax: f64,
    pub discount_amount: f64,
    pub coupon_code: Option<String>,
    pub total: f64,
    pub delivery_name: String,
    pub delivery_phone: String,
    pub delivery_email: Option<String>,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub landmark: Option<String>,
    pub city: String,
    pub pincode: String,
    pub estimated_delivery: DateTime<Utc>,
}

// Order items (immutable snapshot of a cart line)

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemEntity {
    pub id: i32,
    pub order_id: Uuid,
    pub item_id: String,
    pub item_name: String,
    pub unit_price: f64,
    pub quantity: i32,
    pub line_subtotal: f64,
    pub customizations: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::order_items)]
pub struct CreateOrderItemEntity {
    pub order_id: Uuid,
    pub item_id: String,
    pub item_name: String,
    pub unit_price: f64,
    pub quantity: i32,
    pub line_subtotal: f64,
    pub customizations: Value,
}

/// One selected modifier on a cart line, frozen into the order item snapshot.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct CustomizationSelection {
    pub id: String,
    pub name: String,
    pub price_delta: f64,
    pub kind: CustomizationKind,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CustomizationKind {
    Extra,
    Removal,
    Choice,
}
