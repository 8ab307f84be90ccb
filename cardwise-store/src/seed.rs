//! A ready-made demo wallet so first runs have something to recommend.

use anyhow::Result;
use cardwise_core::{
    CapBucket, CapOverflow, CapUnit, Card, Category, RedemptionPartner, RewardRule, RuleScope,
    TierLevel, Wallet,
};

/// Two-card demo wallet: a premium points card with accelerated travel
/// and dining, and a flat cashback card that excludes the usual
/// never-earns categories.
pub fn demo_wallet() -> Result<Wallet> {
    let wallet = Wallet::new();

    let atlas = wallet.add_card(
        Card::points("Atlas Reserve")
            .with_issuer("Meridian Bank")
            .with_cycle_day(15)
            .with_point_value(0.5)
            .with_tier(TierLevel::Gold)
            .with_annual_fee(2999.0),
        1.0,
    )?;
    let travel_cap = wallet.add_cap_bucket(
        atlas,
        CapBucket::monthly("accelerated travel", CapUnit::Spend, 15_000.0),
    )?;
    wallet.add_rule(
        atlas,
        RewardRule::new(RuleScope::Category(Category::TravelFlights), 4.0).with_cap(travel_cap),
    )?;
    wallet.add_rule(
        atlas,
        RewardRule::new(RuleScope::Category(Category::TravelHotels), 4.0).with_cap(travel_cap),
    )?;
    let dining_cap = wallet.add_cap_bucket(
        atlas,
        CapBucket::quarterly("dining points", CapUnit::Reward, 10_000.0),
    )?;
    wallet.add_rule(
        atlas,
        RewardRule::new(RuleScope::Category(Category::Dining), 2.0).with_cap(dining_cap),
    )?;
    let portal_cap = wallet.add_cap_bucket(
        atlas,
        CapBucket::monthly("portal points", CapUnit::Reward, 4_000.0),
    )?;
    wallet.add_rule(
        atlas,
        RewardRule::new(RuleScope::Portal("SmartBuy".to_string()), 3.0)
            .with_cap(portal_cap)
            .with_overflow(CapOverflow::Forfeit),
    )?;
    wallet.add_rule(atlas, RewardRule::excluding(RuleScope::Category(Category::Rent)))?;
    wallet.add_partner(atlas, RedemptionPartner::new("Starlight Hotels", 1.0, 0.6))?;
    wallet.add_partner(atlas, RedemptionPartner::new("AeroClub Miles", 0.5, 1.0))?;

    let shield = wallet.add_card(
        Card::cashback("Shield Cash")
            .with_issuer("Meridian Bank")
            .with_cycle_day(5),
        0.01,
    )?;
    let grocery_cap = wallet.add_cap_bucket(
        shield,
        CapBucket::monthly("grocery cashback", CapUnit::Reward, 200.0),
    )?;
    wallet.add_rule(
        shield,
        RewardRule::new(RuleScope::Category(Category::Groceries), 0.05).with_cap(grocery_cap),
    )?;
    wallet.add_rule(
        shield,
        RewardRule::excluding(RuleScope::Category(Category::Insurance)),
    )?;
    wallet.add_rule(
        shield,
        RewardRule::excluding(RuleScope::Category(Category::Jewellery)),
    )?;

    Ok(wallet)
}
