//! Case Storefront
//!
//! Backend for a custom phone case shop.
//!
//! ## Features
//! - Case configuration and pricing
//! - Percentage coupons with expiry, usage and minimum-amount gates
//! - Pending orders and hosted checkout
//! - Payment webhooks and fulfillment status emails
//! - Admin dashboard: orders, customers, coupons, support

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod email;
pub mod error;
pub mod extract;
pub mod pagination;
pub mod payments;
pub mod publisher;
pub mod services;
pub mod state;
pub mod store;

pub use api::router;
pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
