pub mod admin;
pub mod coupons;
pub mod menu;
pub mod orders;
pub mod payments;
