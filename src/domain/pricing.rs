//! Case pricing. All amounts are US cents.

use serde::Serialize;

use crate::domain::aggregates::{CaseFinish, CaseMaterial, Configuration};
use crate::domain::value_objects::{DiscountPercent, Money};

pub const BASE_PRICE: Money = Money::from_cents(1400);
pub const TEXTURED_FINISH_PRICE: Money = Money::from_cents(300);
pub const POLYCARBONATE_MATERIAL_PRICE: Money = Money::from_cents(500);

pub fn material_price(material: CaseMaterial) -> Money {
    match material {
        CaseMaterial::Silicone => Money::ZERO,
        CaseMaterial::Polycarbonate => POLYCARBONATE_MATERIAL_PRICE,
    }
}

pub fn finish_price(finish: CaseFinish) -> Money {
    match finish {
        CaseFinish::Smooth => Money::ZERO,
        CaseFinish::Textured => TEXTURED_FINISH_PRICE,
    }
}

/// Price breakdown shown on the preview step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub base: Money,
    pub material: Money,
    pub finish: Money,
    pub subtotal: Money,
}

pub fn quote(configuration: &Configuration) -> PriceQuote {
    let material = material_price(configuration.material());
    let finish = finish_price(configuration.finish());
    PriceQuote { base: BASE_PRICE, material, finish, subtotal: BASE_PRICE.add(material).add(finish) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountedPrice {
    pub subtotal: Money,
    pub percent: DiscountPercent,
    pub discount: Money,
    pub total: Money,
}

/// Applies a single percentage discount. The total never drops below zero.
pub fn apply_discount(subtotal: Money, percent: DiscountPercent) -> DiscountedPrice {
    let discount = subtotal.percentage(percent);
    DiscountedPrice { subtotal, percent, discount, total: subtotal.saturating_sub(discount) }
}
