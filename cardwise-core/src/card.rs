//! Card, tier, and redemption-partner models.

use serde::{Deserialize, Serialize};

pub type CardId = u64;
pub type PartnerId = u64;

/// Loyalty tier. Ordering matters: rule gates compare against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TierLevel {
    #[serde(rename = "base")]
    Base,
    #[serde(rename = "silver")]
    Silver,
    #[serde(rename = "gold")]
    Gold,
    #[serde(rename = "platinum")]
    Platinum,
}

/// What the card pays out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardCurrency {
    #[serde(rename = "points")]
    Points,
    #[serde(rename = "cashback")]
    Cashback,
}

/// Rounding applied to each reward slice, never to the pre-split total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rounding {
    #[serde(rename = "down")]
    Down,
    #[serde(rename = "nearest")]
    Nearest,
    #[serde(rename = "none")]
    None,
}

impl Rounding {
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Rounding::Down => value.floor(),
            Rounding::Nearest => value.round(),
            Rounding::None => value,
        }
    }
}

/// A wallet card.
///
/// Ids are assigned by the wallet on addition; a freshly built card carries 0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    pub issuer: String,
    pub currency: RewardCurrency,
    /// Billing cycle start day, 1-28. Monthly cap periods anchor here.
    pub cycle_day: u32,
    pub tier: TierLevel,
    /// Multiplies every non-excluded reward slice. 1.0 = no boost.
    pub tier_multiplier: f64,
    /// Monetary value of one reward unit (1.0 for cashback).
    pub point_value: f64,
    pub rounding: Rounding,
    pub annual_fee: f64,
    pub credit_limit: Option<f64>,
    pub active: bool,
}

impl Card {
    pub fn points(name: impl Into<String>) -> Self {
        Self::new(name, RewardCurrency::Points)
    }

    pub fn cashback(name: impl Into<String>) -> Self {
        Self::new(name, RewardCurrency::Cashback)
    }

    pub fn new(name: impl Into<String>, currency: RewardCurrency) -> Self {
        let (point_value, rounding) = match currency {
            RewardCurrency::Points => (0.25, Rounding::Down),
            RewardCurrency::Cashback => (1.0, Rounding::None),
        };
        Self {
            id: 0,
            name: name.into(),
            issuer: String::new(),
            currency,
            cycle_day: 1,
            tier: TierLevel::Base,
            tier_multiplier: 1.0,
            point_value,
            rounding,
            annual_fee: 0.0,
            credit_limit: None,
            active: true,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_cycle_day(mut self, day: u32) -> Self {
        self.cycle_day = day;
        self
    }

    pub fn with_tier(mut self, tier: TierLevel) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_tier_multiplier(mut self, multiplier: f64) -> Self {
        self.tier_multiplier = multiplier;
        self
    }

    pub fn with_point_value(mut self, value: f64) -> Self {
        self.point_value = value;
        self
    }

    pub fn with_rounding(mut self, rounding: Rounding) -> Self {
        self.rounding = rounding;
        self
    }

    pub fn with_annual_fee(mut self, fee: f64) -> Self {
        self.annual_fee = fee;
        self
    }

    pub fn with_credit_limit(mut self, limit: f64) -> Self {
        self.credit_limit = Some(limit);
        self
    }
}

/// A loyalty program points can transfer to, sometimes at better value than
/// direct redemption.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedemptionPartner {
    pub id: PartnerId,
    pub name: String,
    /// Partner units granted per point transferred.
    pub transfer_ratio: f64,
    /// Monetary value of one partner unit.
    pub unit_value: f64,
}

impl RedemptionPartner {
    pub fn new(name: impl Into<String>, transfer_ratio: f64, unit_value: f64) -> Self {
        Self {
            id: 0,
            name: name.into(),
            transfer_ratio,
            unit_value,
        }
    }

    /// Monetary value one point is worth when routed through this partner.
    pub fn effective_point_value(&self) -> f64 {
        self.transfer_ratio * self.unit_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_card_defaults() {
        let card = Card::points("Regent Infinite");
        assert_eq!(card.currency, RewardCurrency::Points);
        assert_eq!(card.point_value, 0.25);
        assert_eq!(card.rounding, Rounding::Down);
        assert_eq!(card.cycle_day, 1);
        assert!(card.active);
    }

    #[test]
    fn test_cashback_card_defaults() {
        let card = Card::cashback("Flat Five");
        assert_eq!(card.point_value, 1.0);
        assert_eq!(card.rounding, Rounding::None);
    }

    #[test]
    fn test_builders() {
        let card = Card::points("Regent Infinite")
            .with_issuer("HDFC")
            .with_cycle_day(15)
            .with_tier(TierLevel::Gold)
            .with_annual_fee(2500.0);
        assert_eq!(card.cycle_day, 15);
        assert_eq!(card.tier, TierLevel::Gold);
        assert_eq!(card.annual_fee, 2500.0);
    }

    #[test]
    fn test_tier_ordering() {
        assert!(TierLevel::Platinum > TierLevel::Gold);
        assert!(TierLevel::Base < TierLevel::Silver);
    }

    #[test]
    fn test_partner_effective_value() {
        let accor = RedemptionPartner::new("Accor Live Limitless", 1.0, 1.8);
        let krisflyer = RedemptionPartner::new("KrisFlyer", 0.5, 1.0);
        assert_eq!(accor.effective_point_value(), 1.8);
        assert_eq!(krisflyer.effective_point_value(), 0.5);
    }

    #[test]
    fn test_rounding_modes() {
        assert_eq!(Rounding::Down.apply(47.9), 47.0);
        assert_eq!(Rounding::Nearest.apply(47.9), 48.0);
        assert_eq!(Rounding::None.apply(47.9), 47.9);
    }
}
