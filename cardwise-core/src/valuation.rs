//! Reward valuation: turn an earned amount into money for ranking.

use serde::{Deserialize, Serialize};

use crate::card::RedemptionPartner;

/// Where the winning per-point value came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueSource {
    BasePoints,
    Partner(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    /// Estimated monetary value. A ranking estimate, not a redemption quote.
    pub value: f64,
    pub per_point: f64,
    pub source: ValueSource,
}

/// Value a reward at the better of the card's own point value and the best
/// transfer partner. Monotonic in the reward amount.
pub fn value_reward(reward: f64, point_value: f64, partners: &[RedemptionPartner]) -> Valuation {
    let mut per_point = point_value;
    let mut source = ValueSource::BasePoints;
    for partner in partners {
        let effective = partner.effective_point_value();
        if effective > per_point {
            per_point = effective;
            source = ValueSource::Partner(partner.name.clone());
        }
    }
    Valuation {
        value: reward * per_point,
        per_point,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_value_when_no_partner_beats_it() {
        let partners = vec![RedemptionPartner::new("KrisFlyer", 0.5, 1.0)];
        let v = value_reward(1000.0, 0.6, &partners);
        assert_eq!(v.value, 600.0);
        assert_eq!(v.source, ValueSource::BasePoints);
    }

    #[test]
    fn test_best_partner_wins() {
        let partners = vec![
            RedemptionPartner::new("KrisFlyer", 0.5, 1.0),
            RedemptionPartner::new("Accor Live Limitless", 1.0, 1.8),
        ];
        let v = value_reward(1000.0, 0.2, &partners);
        assert_eq!(v.per_point, 1.8);
        assert_eq!(v.value, 1800.0);
        assert_eq!(v.source, ValueSource::Partner(String::from("Accor Live Limitless")));
    }

    #[test]
    fn test_monotonic_in_reward() {
        let partners = vec![RedemptionPartner::new("Accor Live Limitless", 1.0, 1.8)];
        let small = value_reward(100.0, 0.2, &partners);
        let large = value_reward(101.0, 0.2, &partners);
        assert!(large.value > small.value);
    }

    #[test]
    fn test_zero_reward_is_worth_nothing() {
        let v = value_reward(0.0, 0.25, &[]);
        assert_eq!(v.value, 0.0);
    }
}
