//! Purchase context and recommendation ranking.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::caps::CapStatus;
use crate::card::{CardId, RewardCurrency};
use crate::category::{Category, resolve_category};
use crate::rules::ResolvedPurchase;
use crate::valuation::ValueSource;

/// A hypothetical or real purchase as the caller describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseContext {
    pub amount: f64,
    pub date: NaiveDate,
    pub merchant: Option<String>,
    pub portal: Option<String>,
    pub category: Option<Category>,
}

impl PurchaseContext {
    pub fn new(amount: f64, date: NaiveDate) -> Self {
        Self {
            amount,
            date,
            merchant: None,
            portal: None,
            category: None,
        }
    }

    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant = Some(merchant.into());
        self
    }

    pub fn with_portal(mut self, portal: impl Into<String>) -> Self {
        self.portal = Some(portal.into());
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Run category resolution, producing the matcher's input.
    pub fn resolve(&self) -> ResolvedPurchase {
        let resolution = resolve_category(
            self.merchant.as_deref(),
            self.portal.as_deref(),
            self.category,
        );
        ResolvedPurchase {
            amount: self.amount,
            date: self.date,
            category: resolution.category,
            merchant: self.merchant.clone(),
            portal: self.portal.clone(),
        }
    }
}

/// One ranked row of a recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// 1-based position after ranking.
    pub rank: usize,
    pub card_id: CardId,
    pub card_name: String,
    pub reward: f64,
    pub currency: RewardCurrency,
    pub value: f64,
    pub value_source: ValueSource,
    pub rule_summary: String,
    /// Tightest bucket on the matched rule, when capped.
    pub cap_status: Option<CapStatus>,
    pub excluded: bool,
    pub annual_fee: f64,
}

/// Rank rows in place and number them.
///
/// Non-excluded cards first, best value first. Ties prefer more cap headroom
/// (uncapped counts as unlimited), then the cheaper annual fee, then the
/// lower card id for a stable order.
pub fn rank_recommendations(rows: &mut [Recommendation]) {
    rows.sort_by(|a, b| {
        a.excluded
            .cmp(&b.excluded)
            .then_with(|| b.value.total_cmp(&a.value))
            .then_with(|| headroom(b).total_cmp(&headroom(a)))
            .then_with(|| a.annual_fee.total_cmp(&b.annual_fee))
            .then_with(|| a.card_id.cmp(&b.card_id))
    });
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }
}

fn headroom(row: &Recommendation) -> f64 {
    row.cap_status
        .as_ref()
        .map(|c| c.remaining)
        .unwrap_or(f64::INFINITY)
}
