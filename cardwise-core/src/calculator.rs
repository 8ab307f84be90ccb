//! Reward computation: cap-aware slicing, stacking, tier boost, rounding.
//!
//! Pure over its inputs. Bucket state is read, never written; the produced
//! `cap_uses` tell the caller what a commit would consume.

use serde::{Deserialize, Serialize};

use crate::caps::{BucketId, CapBucket, CapUnit, CapUse, period_key};
use crate::card::Card;
use crate::rules::{
    CapOverflow, ResolvedPurchase, RewardRule, RuleId, RuleMatch, match_rules,
};

/// One rule's contribution to a reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardSlice {
    pub rule_id: RuleId,
    pub label: String,
    /// Portion of the purchase amount this slice applies to.
    pub basis: f64,
    pub multiplier: f64,
    pub reward: f64,
}

/// Full result of running one purchase against one card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub total: f64,
    pub slices: Vec<RewardSlice>,
    pub excluded: bool,
    /// Scope label of the exclusion that zeroed the purchase.
    pub excluded_by: Option<String>,
    /// Amount that earned nothing because the capped rule forfeits overflow.
    pub forfeited: f64,
    /// Bucket usage a commit of this purchase consumes.
    pub cap_uses: Vec<CapUse>,
    /// Buckets attached to the primary rules, consumed or not.
    pub primary_buckets: Vec<BucketId>,
}

impl RewardBreakdown {
    fn zero() -> Self {
        Self {
            total: 0.0,
            slices: Vec::new(),
            excluded: false,
            excluded_by: None,
            forfeited: 0.0,
            cap_uses: Vec::new(),
            primary_buckets: Vec::new(),
        }
    }

    /// Short human-readable account of what earned, for recommendations.
    pub fn rule_summary(&self) -> String {
        if self.excluded {
            return match &self.excluded_by {
                Some(scope) => format!("excluded: {}", scope),
                None => "excluded".to_string(),
            };
        }
        if self.slices.is_empty() {
            return "no applicable rule".to_string();
        }
        let mut parts: Vec<String> = Vec::new();
        for s in &self.slices {
            let part = format!("{} {}", s.label, fmt_multiplier(s.multiplier));
            if !parts.contains(&part) {
                parts.push(part);
            }
        }
        parts.join(" + ")
    }
}

fn fmt_multiplier(m: f64) -> String {
    if m.fract() == 0.0 {
        format!("{:.0}x", m)
    } else {
        format!("{}x", m)
    }
}

/// Compute the reward one purchase earns on one card.
///
/// The cap split happens on the reward basis: each bucket attached to the
/// primary rules constrains how much of the amount still earns the primary
/// rate this period, and the tightest bucket wins. The remainder earns the
/// fallback rate, or nothing when the primary rules forfeit overflow.
/// Rounding is applied per slice; splitting first changes the result and
/// that is intended.
pub fn compute_reward(
    card: &Card,
    rules: &[RewardRule],
    buckets: &[CapBucket],
    p: &ResolvedPurchase,
) -> RewardBreakdown {
    match match_rules(&card.name, card.tier, rules, p) {
        None => RewardBreakdown::zero(),
        Some(RuleMatch::Excluded { rule }) => RewardBreakdown {
            excluded: true,
            excluded_by: Some(rule.scope.label()),
            ..RewardBreakdown::zero()
        },
        Some(RuleMatch::Earning { primary, fallback }) => {
            earn(card, buckets, p, &primary, fallback)
        }
    }
}

fn earn(
    card: &Card,
    buckets: &[CapBucket],
    p: &ResolvedPurchase,
    primary: &[&RewardRule],
    fallback: &RewardRule,
) -> RewardBreakdown {
    let stacked: f64 = primary.iter().map(|r| r.multiplier).sum();
    let boost = card.tier_multiplier;

    let mut bucket_ids: Vec<BucketId> = primary
        .iter()
        .flat_map(|r| r.cap_buckets.iter().copied())
        .collect();
    bucket_ids.sort_unstable();
    bucket_ids.dedup();

    // Tightest eligible basis across every attached bucket.
    let mut eligible = p.amount;
    for id in &bucket_ids {
        let Some(bucket) = buckets.iter().find(|b| b.id == *id) else {
            continue;
        };
        let key = period_key(bucket.period, card.cycle_day, p.date);
        let headroom = bucket.headroom_in(&key);
        let basis_cap = match bucket.unit {
            CapUnit::Spend => headroom,
            CapUnit::Reward => {
                let rate = stacked * boost;
                if rate > 0.0 { headroom / rate } else { p.amount }
            }
        };
        eligible = eligible.min(basis_cap);
    }
    let eligible = eligible.max(0.0);

    let mut slices = Vec::new();
    let mut primary_reward = 0.0;
    if eligible > 0.0 {
        for rule in primary {
            let reward = card.rounding.apply(eligible * rule.multiplier * boost);
            primary_reward += reward;
            slices.push(RewardSlice {
                rule_id: rule.id,
                label: rule.scope.label(),
                basis: eligible,
                multiplier: rule.multiplier,
                reward,
            });
        }
    }

    let rest = (p.amount - eligible).max(0.0);
    let mut overflow_reward = 0.0;
    let mut forfeited = 0.0;
    if rest > 0.0 {
        if primary.iter().all(|r| r.overflow == CapOverflow::Forfeit) {
            forfeited = rest;
        } else if fallback.multiplier > 0.0 {
            let reward = card.rounding.apply(rest * fallback.multiplier * boost);
            overflow_reward = reward;
            slices.push(RewardSlice {
                rule_id: fallback.id,
                label: fallback.scope.label(),
                basis: rest,
                multiplier: fallback.multiplier,
                reward,
            });
        }
    }

    let mut cap_uses = Vec::new();
    for id in &bucket_ids {
        let Some(bucket) = buckets.iter().find(|b| b.id == *id) else {
            continue;
        };
        let key = period_key(bucket.period, card.cycle_day, p.date);
        let amount = match bucket.unit {
            CapUnit::Spend => eligible,
            CapUnit::Reward => primary_reward,
        };
        if amount > 0.0 {
            cap_uses.push(CapUse {
                bucket_id: *id,
                period_key: key,
                amount,
            });
        }
    }

    RewardBreakdown {
        total: primary_reward + overflow_reward,
        slices,
        excluded: false,
        excluded_by: None,
        forfeited,
        cap_uses,
        primary_buckets: bucket_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::TierLevel;
    use crate::category::Category;
    use crate::rules::RuleScope;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn travel_purchase(amount: f64, on: NaiveDate) -> ResolvedPurchase {
        ResolvedPurchase {
            amount,
            date: on,
            category: Category::TravelFlights,
            merchant: None,
            portal: None,
        }
    }

    /// Base 1x, Travel 4x under a monthly 15,000 spend cap, anchor day 15.
    fn capped_travel_setup() -> (Card, Vec<RewardRule>, Vec<CapBucket>) {
        let card = Card::points("Voyager").with_cycle_day(15);
        let mut bucket = CapBucket::monthly("accelerated travel", CapUnit::Spend, 15_000.0);
        bucket.id = 10;
        let mut base = RewardRule::new(RuleScope::Default, 1.0);
        base.id = 1;
        let mut travel =
            RewardRule::new(RuleScope::Category(Category::TravelFlights), 4.0).with_cap(10);
        travel.id = 2;
        (card, vec![base, travel], vec![bucket])
    }

    #[test]
    fn test_under_cap_full_rate() {
        let (card, rules, buckets) = capped_travel_setup();
        let b = compute_reward(&card, &rules, &buckets, &travel_purchase(12_000.0, date(2026, 3, 20)));
        assert_eq!(b.total, 48_000.0);
        assert_eq!(b.slices.len(), 1);
        assert_eq!(b.cap_uses.len(), 1);
        assert_eq!(b.cap_uses[0].amount, 12_000.0);
        assert_eq!(b.cap_uses[0].period_key, "2026-03");
    }

    #[test]
    fn test_cap_boundary_splits_and_degrades_to_base() {
        let (card, rules, mut buckets) = capped_travel_setup();
        buckets[0].record("2026-03", 12_000.0);

        let b = compute_reward(&card, &rules, &buckets, &travel_purchase(5_000.0, date(2026, 3, 28)));
        // 3,000 headroom at 4x, remaining 2,000 at base 1x
        assert_eq!(b.slices.len(), 2);
        assert_eq!(b.slices[0].basis, 3_000.0);
        assert_eq!(b.slices[0].reward, 12_000.0);
        assert_eq!(b.slices[1].basis, 2_000.0);
        assert_eq!(b.slices[1].reward, 2_000.0);
        assert_eq!(b.total, 14_000.0);
        assert_eq!(b.cap_uses[0].amount, 3_000.0);
    }

    #[test]
    fn test_exhausted_cap_earns_base_only() {
        let (card, rules, mut buckets) = capped_travel_setup();
        buckets[0].record("2026-03", 15_000.0);

        let b = compute_reward(&card, &rules, &buckets, &travel_purchase(5_000.0, date(2026, 3, 28)));
        assert_eq!(b.total, 5_000.0);
        assert_eq!(b.slices.len(), 1);
        assert_eq!(b.slices[0].rule_id, 1);
        assert!(b.cap_uses.is_empty());
    }

    #[test]
    fn test_new_period_restores_full_rate() {
        let (card, rules, mut buckets) = capped_travel_setup();
        buckets[0].record("2026-03", 15_000.0);

        // April 16 is past the anchor: new period
        let b = compute_reward(&card, &rules, &buckets, &travel_purchase(5_000.0, date(2026, 4, 16)));
        assert_eq!(b.total, 20_000.0);
        assert_eq!(b.cap_uses[0].period_key, "2026-04");
    }

    #[test]
    fn test_reward_unit_cap_limits_earned_points() {
        let card = Card::points("Portal Max");
        let mut bucket = CapBucket::monthly("portal", CapUnit::Reward, 4_000.0);
        bucket.id = 20;
        let mut base = RewardRule::new(RuleScope::Default, 1.0);
        base.id = 1;
        let mut portal = RewardRule::new(RuleScope::Portal(String::from("SmartBuy")), 10.0).with_cap(20);
        portal.id = 2;

        let p = ResolvedPurchase {
            amount: 1_000.0,
            date: date(2026, 3, 10),
            category: Category::ShoppingOnline,
            merchant: None,
            portal: Some(String::from("SmartBuy")),
        };
        let b = compute_reward(&card, &[base, portal], &[bucket], &p);
        // 400 of spend exhausts the 4,000-point bucket at 10x, rest at base
        assert_eq!(b.slices[0].basis, 400.0);
        assert_eq!(b.slices[0].reward, 4_000.0);
        assert_eq!(b.slices[1].reward, 600.0);
        assert_eq!(b.total, 4_600.0);
        assert_eq!(b.cap_uses[0].amount, 4_000.0);
    }

    #[test]
    fn test_forfeit_overflow_earns_nothing_above_cap() {
        let (card, mut rules, mut buckets) = capped_travel_setup();
        rules[1] = rules[1].clone().with_overflow(CapOverflow::Forfeit);
        buckets[0].record("2026-03", 14_000.0);

        let b = compute_reward(&card, &rules, &buckets, &travel_purchase(3_000.0, date(2026, 3, 28)));
        assert_eq!(b.total, 4_000.0);
        assert_eq!(b.forfeited, 2_000.0);
        assert_eq!(b.slices.len(), 1);
    }

    #[test]
    fn test_capped_lone_base_rule_keeps_rate_over_cap() {
        let card = Card::points("Flat");
        let mut bucket = CapBucket::monthly("everything", CapUnit::Spend, 500.0);
        bucket.id = 30;
        let mut base = RewardRule::new(RuleScope::Default, 2.0).with_cap(30);
        base.id = 1;

        let p = ResolvedPurchase {
            amount: 1_000.0,
            date: date(2026, 3, 10),
            category: Category::Other,
            merchant: None,
            portal: None,
        };
        let b = compute_reward(&card, &[base], &[bucket], &p);
        // no lower rate exists to degrade to, so the overflow keeps 2x;
        // the bucket still meters the eligible slice
        assert_eq!(b.total, 2_000.0);
        assert_eq!(b.slices.len(), 2);
        assert_eq!(b.cap_uses[0].amount, 500.0);
    }

    #[test]
    fn test_excluded_category_earns_zero() {
        let card = Card::points("Strict");
        let mut base = RewardRule::new(RuleScope::Default, 1.0);
        base.id = 1;
        let mut excl = RewardRule::excluding(RuleScope::Category(Category::Insurance));
        excl.id = 2;

        let p = ResolvedPurchase {
            amount: 50_000.0,
            date: date(2026, 3, 10),
            category: Category::Insurance,
            merchant: None,
            portal: None,
        };
        let b = compute_reward(&card, &[base, excl], &[], &p);
        assert!(b.excluded);
        assert_eq!(b.total, 0.0);
        assert!(b.slices.is_empty());
        assert_eq!(b.rule_summary(), "excluded: Insurance");
    }

    #[test]
    fn test_rounding_is_per_slice() {
        let card = Card::points("Floorer");
        let mut bucket = CapBucket::monthly("cap", CapUnit::Spend, 333.0);
        bucket.id = 30;
        let mut base = RewardRule::new(RuleScope::Default, 1.0);
        base.id = 1;
        let mut dining = RewardRule::new(RuleScope::Category(Category::Dining), 1.5).with_cap(30);
        dining.id = 2;

        let p = ResolvedPurchase {
            amount: 666.0,
            date: date(2026, 3, 10),
            category: Category::Dining,
            merchant: None,
            portal: None,
        };
        let b = compute_reward(&card, &[base, dining], &[bucket], &p);
        // floor(333 * 1.5) = 499, not 499.5 carried into the total
        assert_eq!(b.slices[0].reward, 499.0);
        assert_eq!(b.slices[1].reward, 333.0);
        assert_eq!(b.total, 832.0);
    }

    #[test]
    fn test_tier_multiplier_boosts_every_slice() {
        let card = Card::points("Elite")
            .with_tier(TierLevel::Gold)
            .with_tier_multiplier(1.5);
        let mut base = RewardRule::new(RuleScope::Default, 2.0);
        base.id = 1;

        let p = travel_purchase(100.0, date(2026, 3, 10));
        let b = compute_reward(&card, &[base], &[], &p);
        assert_eq!(b.total, 300.0);
    }

    #[test]
    fn test_stacked_rules_sum_per_rule_slices() {
        let card = Card::points("Stacker");
        let mut base = RewardRule::new(RuleScope::Default, 1.0);
        base.id = 1;
        let mut a = RewardRule::new(RuleScope::Merchant(String::from("AMAZON")), 2.0);
        a.id = 2;
        let mut b_rule = RewardRule::new(RuleScope::Merchant(String::from("AMAZON PAY")), 1.5);
        b_rule.id = 3;

        let p = ResolvedPurchase {
            amount: 100.0,
            date: date(2026, 3, 10),
            category: Category::ShoppingOnline,
            merchant: Some(String::from("AMAZON PAY UPI")),
            portal: None,
        };
        let b = compute_reward(&card, &[base, a, b_rule], &[], &p);
        assert_eq!(b.slices.len(), 2);
        assert_eq!(b.total, 350.0);
    }

    #[test]
    fn test_quarterly_bucket_uses_calendar_quarter() {
        let card = Card::points("Quarterly").with_cycle_day(15);
        let mut bucket = CapBucket::quarterly("fuel", CapUnit::Spend, 10_000.0);
        bucket.id = 40;
        let mut base = RewardRule::new(RuleScope::Default, 1.0);
        base.id = 1;
        let mut fuel = RewardRule::new(RuleScope::Category(Category::Fuel), 5.0).with_cap(40);
        fuel.id = 2;

        let p = ResolvedPurchase {
            amount: 2_000.0,
            date: date(2026, 5, 2),
            category: Category::Fuel,
            merchant: None,
            portal: None,
        };
        let b = compute_reward(&card, &[base, fuel], &[bucket], &p);
        assert_eq!(b.cap_uses[0].period_key, "2026-Q2");
    }

    #[test]
    fn test_summary_mentions_each_rate() {
        let (card, rules, mut buckets) = capped_travel_setup();
        buckets[0].record("2026-03", 12_000.0);
        let b = compute_reward(&card, &rules, &buckets, &travel_purchase(5_000.0, date(2026, 3, 28)));
        assert_eq!(b.rule_summary(), "Travel - Flights 4x + base 1x");
    }
}
