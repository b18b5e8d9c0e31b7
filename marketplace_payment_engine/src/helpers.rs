//! Fee split arithmetic.
//!
//! The platform keeps a flat percentage of each seller's share of a checkout. Everything is integer cents, so
//! `seller_amount + platform_fee == seller_total` always holds exactly.
use std::collections::BTreeMap;

use mpg_common::Cents;

use crate::db_types::{CartItem, OrderItem};

/// The platform's commission on marketplace sales, in percent.
pub const PLATFORM_FEE_PERCENT: i64 = 5;

/// A line item that may be attributed to a seller.
pub trait SellerLine {
    fn seller_id(&self) -> Option<&str>;
    /// `None` if `price * quantity` overflows.
    fn line_total(&self) -> Option<Cents>;
}

impl SellerLine for CartItem {
    fn seller_id(&self) -> Option<&str> {
        self.seller_id.as_deref()
    }

    fn line_total(&self) -> Option<Cents> {
        self.price.checked_mul(self.quantity)
    }
}

impl SellerLine for OrderItem {
    fn seller_id(&self) -> Option<&str> {
        self.seller_id.as_deref()
    }

    fn line_total(&self) -> Option<Cents> {
        self.price.checked_mul(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SellerPayout {
    pub seller_total: Cents,
    pub platform_fee: Cents,
    pub seller_amount: Cents,
}

impl SellerPayout {
    pub fn new(seller_total: Cents, fee_percent: i64) -> Self {
        let platform_fee = seller_total.percentage(fee_percent);
        Self { seller_total, platform_fee, seller_amount: seller_total - platform_fee }
    }
}

/// Sums line totals per seller. Items without a seller are left out. Returns `None` if any total overflows.
pub fn seller_totals<T: SellerLine>(items: &[T]) -> Option<BTreeMap<String, Cents>> {
    items.iter().try_fold(BTreeMap::new(), |mut totals, item| {
        if let Some(seller) = item.seller_id() {
            let total = totals.entry(seller.to_string()).or_insert_with(Cents::default);
            *total = total.checked_add(item.line_total()?)?;
        }
        Some(totals)
    })
}
