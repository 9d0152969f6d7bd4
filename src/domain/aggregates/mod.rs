//! Aggregates module
pub mod configuration;
pub mod coupon;
pub mod order;
pub mod support;
pub mod user;

pub use configuration::{CaseColor, CaseFinish, CaseMaterial, Configuration, ConfigurationError, Design, PhoneModel};
pub use coupon::{AppliedCoupon, Coupon, CouponChanges, CouponError, CouponRejection, NewCoupon};
pub use order::{Address, Order, OrderError, OrderStatus};
pub use support::{SupportError, SupportMessage, SupportTicket, SupportTicketStatus};
pub use user::User;
