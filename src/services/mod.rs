//! Business operations, one module per area. Every function takes the
//! shared [`AppState`](crate::state::AppState) and returns domain values
//! or serializable views for the HTTP layer.

pub mod checkout;
pub mod configurations;
pub mod coupons;
pub mod customers;
pub mod orders;
pub mod support;
