//! Reward rules and the specificity-ordered matcher.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::caps::BucketId;
use crate::card::TierLevel;
use crate::category::Category;

pub type RuleId = u64;

/// A purchase after category resolution, ready for rule matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPurchase {
    pub amount: f64,
    pub date: NaiveDate,
    pub category: Category,
    pub merchant: Option<String>,
    pub portal: Option<String>,
}

/// Rule scope. A closed set; precedence comes from `specificity`, never from
/// match order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleScope {
    /// Normalized substring match against the purchase's merchant text.
    Merchant(String),
    Category(Category),
    Portal(String),
    Default,
}

impl RuleScope {
    /// Specificity rank, lower wins: merchant > category > portal > default.
    pub fn specificity(&self) -> u8 {
        match self {
            RuleScope::Merchant(_) => 0,
            RuleScope::Category(_) => 1,
            RuleScope::Portal(_) => 2,
            RuleScope::Default => 3,
        }
    }

    pub fn label(&self) -> String {
        match self {
            RuleScope::Merchant(m) => m.clone(),
            RuleScope::Category(c) => c.label().to_string(),
            RuleScope::Portal(p) => format!("via {}", p),
            RuleScope::Default => "base".to_string(),
        }
    }

    fn matches(&self, p: &ResolvedPurchase) -> bool {
        match self {
            RuleScope::Merchant(needle) => p
                .merchant
                .as_deref()
                .is_some_and(|m| m.to_uppercase().contains(&needle.to_uppercase())),
            RuleScope::Category(c) => *c == p.category,
            RuleScope::Portal(name) => p
                .portal
                .as_deref()
                .is_some_and(|x| x.eq_ignore_ascii_case(name)),
            RuleScope::Default => true,
        }
    }

    /// Two scopes targeting the same thing. Backs the per-card uniqueness
    /// check on rule addition.
    pub fn same_target(&self, other: &RuleScope) -> bool {
        match (self, other) {
            (RuleScope::Merchant(a), RuleScope::Merchant(b)) => a.eq_ignore_ascii_case(b),
            (RuleScope::Category(a), RuleScope::Category(b)) => a == b,
            (RuleScope::Portal(a), RuleScope::Portal(b)) => a.eq_ignore_ascii_case(b),
            (RuleScope::Default, RuleScope::Default) => true,
            _ => false,
        }
    }
}

/// What the spillover above a full cap earns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapOverflow {
    #[serde(rename = "degrade-to-base")]
    DegradeToBase,
    #[serde(rename = "forfeit")]
    Forfeit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRule {
    pub id: RuleId,
    pub scope: RuleScope,
    /// Points per currency unit, or cashback rate. Meaningless for exclusions.
    pub multiplier: f64,
    /// Matches but earns nothing, overriding every multiplier rule.
    pub exclusion: bool,
    /// At equal specificity: exclusive rules compete, non-exclusive stack.
    pub exclusive: bool,
    pub min_tier: Option<TierLevel>,
    pub min_spend: Option<f64>,
    pub overflow: CapOverflow,
    pub cap_buckets: Vec<BucketId>,
}

impl RewardRule {
    pub fn new(scope: RuleScope, multiplier: f64) -> Self {
        Self {
            id: 0,
            scope,
            multiplier,
            exclusion: false,
            exclusive: false,
            min_tier: None,
            min_spend: None,
            overflow: CapOverflow::DegradeToBase,
            cap_buckets: Vec::new(),
        }
    }

    /// An exclusion rule: matches, then forces the whole purchase to zero.
    pub fn excluding(scope: RuleScope) -> Self {
        let mut rule = Self::new(scope, 0.0);
        rule.exclusion = true;
        rule
    }

    pub fn with_exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    pub fn with_min_tier(mut self, tier: TierLevel) -> Self {
        self.min_tier = Some(tier);
        self
    }

    pub fn with_min_spend(mut self, amount: f64) -> Self {
        self.min_spend = Some(amount);
        self
    }

    pub fn with_overflow(mut self, overflow: CapOverflow) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_cap(mut self, bucket: BucketId) -> Self {
        self.cap_buckets.push(bucket);
        self
    }

    fn gates_open(&self, tier: TierLevel, amount: f64) -> bool {
        self.min_tier.is_none_or(|t| tier >= t) && self.min_spend.is_none_or(|m| amount >= m)
    }
}

/// Matcher outcome for one card and one purchase.
#[derive(Debug)]
pub enum RuleMatch<'a> {
    /// An exclusion matched; the purchase earns nothing on this card.
    Excluded { rule: &'a RewardRule },
    /// The stacked primary rules, plus the rate cap overflow degrades to.
    Earning {
        primary: Vec<&'a RewardRule>,
        fallback: &'a RewardRule,
    },
}

/// Match a card's rules against a resolved purchase.
///
/// Tier-gated and minimum-spend rules are dropped first. Any surviving
/// exclusion short-circuits the card. The remaining matches are grouped by
/// specificity: the top group is the primary (stacking unless a member is
/// `exclusive`, in which case the highest multiplier wins and exact ties go
/// to the earliest-created rule, with a warning). The fallback is the best
/// rule of the next-lower matched specificity; a lone default rule falls
/// back to itself, which is warned when that rule carries a degrade-to-base
/// cap, since the cap then cannot lower the rate.
///
/// Returns `None` when nothing matches, e.g. a default rule gated above the
/// card's tier.
pub fn match_rules<'a>(
    card_name: &str,
    tier: TierLevel,
    rules: &'a [RewardRule],
    p: &ResolvedPurchase,
) -> Option<RuleMatch<'a>> {
    let candidates: Vec<&RewardRule> = rules
        .iter()
        .filter(|r| r.gates_open(tier, p.amount) && r.scope.matches(p))
        .collect();

    if let Some(rule) = candidates
        .iter()
        .copied()
        .filter(|r| r.exclusion)
        .min_by_key(|r| (r.scope.specificity(), r.id))
    {
        return Some(RuleMatch::Excluded { rule });
    }

    let earning: Vec<&RewardRule> = candidates.into_iter().filter(|r| !r.exclusion).collect();
    let top = earning.iter().map(|r| r.scope.specificity()).min()?;

    let mut primary: Vec<&RewardRule> = earning
        .iter()
        .copied()
        .filter(|r| r.scope.specificity() == top)
        .collect();
    primary.sort_by_key(|r| r.id);

    if primary.len() > 1 && primary.iter().any(|r| r.exclusive) {
        primary = vec![pick_highest(card_name, &primary)];
    }

    let below: Vec<&RewardRule> = earning
        .iter()
        .copied()
        .filter(|r| r.scope.specificity() > top)
        .collect();
    let fallback = match below.iter().map(|r| r.scope.specificity()).min() {
        Some(next) => {
            let mut group: Vec<&RewardRule> = below
                .into_iter()
                .filter(|r| r.scope.specificity() == next)
                .collect();
            group.sort_by_key(|r| r.id);
            pick_highest(card_name, &group)
        }
        None => {
            let rule = primary[0];
            if !rule.cap_buckets.is_empty() && rule.overflow == CapOverflow::DegradeToBase {
                warn!(
                    "capped rule {} on {} has no lower rate to degrade to; overflow keeps earning {}x",
                    rule.id, card_name, rule.multiplier
                );
            }
            rule
        }
    };

    Some(RuleMatch::Earning { primary, fallback })
}

/// Highest multiplier wins; an exact tie keeps the earliest-created rule and
/// logs the conflict. Expects creation order.
fn pick_highest<'a>(card_name: &str, group: &[&'a RewardRule]) -> &'a RewardRule {
    let mut best = group[0];
    let mut tied = false;
    for &r in &group[1..] {
        if r.multiplier > best.multiplier {
            best = r;
            tied = false;
        } else if r.multiplier == best.multiplier {
            tied = true;
        }
    }
    if tied {
        warn!(
            "ambiguous rule conflict on {}: equal specificity and multiplier, keeping rule {} (created first)",
            card_name, best.id
        );
    }
    best
}
