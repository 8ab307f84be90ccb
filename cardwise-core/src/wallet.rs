//! The wallet aggregate: cards with their rules, caps, partners and ledgers,
//! one mutex per card so posting stays atomic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::calculator::{RewardBreakdown, compute_reward};
use crate::caps::{BucketId, CapBucket, CapStatus, CapUse};
use crate::card::{Card, CardId, PartnerId, RedemptionPartner};
use crate::category::Category;
use crate::error::{EngineError, EngineResult};
use crate::ledger::{EntryId, EntryKind, LedgerEntry, TransactionId, balance, signed_adjustment};
use crate::recommend::{PurchaseContext, Recommendation, rank_recommendations};
use crate::rules::{RewardRule, RuleId, RuleScope};
use crate::valuation::{Valuation, value_reward};

/// A posted expense with the reward it earned frozen at posting time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub card_id: CardId,
    pub amount: f64,
    pub date: NaiveDate,
    pub category: Category,
    pub merchant: Option<String>,
    pub portal: Option<String>,
    pub reward: f64,
    pub ledger_entry_id: EntryId,
    /// Bucket usage this posting consumed, kept for reversal.
    pub cap_uses: Vec<CapUse>,
    pub reversed: bool,
}

/// Everything one card owns. Guarded by a single mutex in the wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CardRecord {
    card: Card,
    rules: Vec<RewardRule>,
    buckets: Vec<CapBucket>,
    partners: Vec<RedemptionPartner>,
    transactions: Vec<Transaction>,
    ledger: Vec<LedgerEntry>,
}

/// Result of committing a purchase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Posted {
    pub transaction_id: TransactionId,
    pub ledger_entry_id: EntryId,
    pub reward: f64,
    pub new_balance: f64,
    /// Post-commit status of every bucket the purchase consumed.
    pub new_cap_state: Vec<CapStatus>,
}

/// Result of reversing a posted transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reversed {
    pub ledger_entry_id: EntryId,
    pub new_balance: f64,
}

/// Result of a manual balance adjustment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Adjusted {
    pub ledger_entry_id: EntryId,
    pub new_balance: f64,
}

/// Dry run of a purchase against one card. Nothing is committed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub card_id: CardId,
    pub card_name: String,
    pub reward: f64,
    pub breakdown: RewardBreakdown,
    pub valuation: Valuation,
    /// Tightest bucket headroom left if this purchase were committed.
    pub cap_remaining_after: Option<f64>,
}

/// Aggregated spend and reward for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpend {
    pub category: Category,
    pub spend: f64,
    pub reward: f64,
    pub transactions: usize,
}

/// Serializable image of a whole wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSnapshot {
    cards: Vec<CardRecord>,
    next_id: u64,
}

/// In-memory wallet. Reads clone a consistent per-card snapshot; writes
/// hold that card's mutex across compute and commit.
#[derive(Debug)]
pub struct Wallet {
    cards: RwLock<HashMap<CardId, Arc<Mutex<CardRecord>>>>,
    /// Transaction id to owning card, for reversal lookups. Never held
    /// while taking a card mutex.
    txn_cards: RwLock<HashMap<TransactionId, CardId>>,
    next_id: AtomicU64,
}

// Poisoned locks still hold usable state; take the guard anyway.
fn lock(record: &Mutex<CardRecord>) -> MutexGuard<'_, CardRecord> {
    record.lock().unwrap_or_else(|e| e.into_inner())
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

impl Wallet {
    pub fn new() -> Self {
        Self {
            cards: RwLock::new(HashMap::new()),
            txn_cards: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Ids for cards, rules, buckets, partners, transactions and ledger
    /// entries all come from one counter.
    fn alloc_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn record(&self, card_id: CardId) -> EngineResult<Arc<Mutex<CardRecord>>> {
        read(&self.cards)
            .get(&card_id)
            .cloned()
            .ok_or(EngineError::NotFound("card", card_id))
    }

    /// Register a card. Every card gets a base rule at `base_multiplier`
    /// so a purchase always has a rate to fall back to.
    pub fn add_card(&self, card: Card, base_multiplier: f64) -> EngineResult<CardId> {
        if card.name.trim().is_empty() {
            return Err(EngineError::validation("card name must not be empty"));
        }
        if !(1..=28).contains(&card.cycle_day) {
            return Err(EngineError::validation(
                "billing cycle day must be between 1 and 28",
            ));
        }
        if !card.tier_multiplier.is_finite() || card.tier_multiplier <= 0.0 {
            return Err(EngineError::validation("tier multiplier must be positive"));
        }
        if !card.point_value.is_finite() || card.point_value <= 0.0 {
            return Err(EngineError::validation("point value must be positive"));
        }
        if !card.annual_fee.is_finite() || card.annual_fee < 0.0 {
            return Err(EngineError::validation("annual fee must not be negative"));
        }
        if card.credit_limit.is_some_and(|l| !l.is_finite() || l <= 0.0) {
            return Err(EngineError::validation("credit limit must be positive"));
        }
        if !base_multiplier.is_finite() || base_multiplier < 0.0 {
            return Err(EngineError::validation(
                "base multiplier must not be negative",
            ));
        }
        let mut card = card;
        card.id = self.alloc_id();
        let mut base = RewardRule::new(RuleScope::Default, base_multiplier);
        base.id = self.alloc_id();
        let record = CardRecord {
            card,
            rules: vec![base],
            buckets: Vec::new(),
            partners: Vec::new(),
            transactions: Vec::new(),
            ledger: Vec::new(),
        };
        let card_id = record.card.id;
        write(&self.cards).insert(card_id, Arc::new(Mutex::new(record)));
        Ok(card_id)
    }

    /// Drop a card and everything it owns, history included.
    pub fn remove_card(&self, card_id: CardId) -> EngineResult<()> {
        if write(&self.cards).remove(&card_id).is_none() {
            return Err(EngineError::NotFound("card", card_id));
        }
        write(&self.txn_cards).retain(|_, owner| *owner != card_id);
        Ok(())
    }

    /// Inactive cards keep their history but stop posting and drop out of
    /// recommendations.
    pub fn set_card_active(&self, card_id: CardId, active: bool) -> EngineResult<()> {
        let record = self.record(card_id)?;
        lock(&record).card.active = active;
        Ok(())
    }

    pub fn card(&self, card_id: CardId) -> EngineResult<Card> {
        let record = self.record(card_id)?;
        let card = lock(&record).card.clone();
        Ok(card)
    }

    pub fn cards(&self) -> Vec<Card> {
        let mut cards: Vec<Card> = read(&self.cards)
            .values()
            .map(|r| lock(r).card.clone())
            .collect();
        cards.sort_by_key(|c| c.id);
        cards
    }

    pub fn add_rule(&self, card_id: CardId, rule: RewardRule) -> EngineResult<RuleId> {
        if !rule.multiplier.is_finite() || rule.multiplier < 0.0 {
            return Err(EngineError::validation(
                "rule multiplier must not be negative",
            ));
        }
        if rule.exclusion && rule.multiplier != 0.0 {
            return Err(EngineError::validation(
                "an exclusion rule cannot carry a multiplier",
            ));
        }
        if rule.min_spend.is_some_and(|m| !m.is_finite() || m <= 0.0) {
            return Err(EngineError::validation("minimum spend must be positive"));
        }
        match &rule.scope {
            RuleScope::Merchant(name) if name.trim().is_empty() => {
                return Err(EngineError::validation(
                    "merchant scope needs a merchant name",
                ));
            }
            RuleScope::Portal(name) if name.trim().is_empty() => {
                return Err(EngineError::validation("portal scope needs a portal name"));
            }
            _ => {}
        }
        let record = self.record(card_id)?;
        let mut rec = lock(&record);
        if rec.rules.iter().any(|r| r.scope.same_target(&rule.scope)) {
            return Err(EngineError::validation(format!(
                "card {} already has a rule for {}",
                card_id,
                rule.scope.label()
            )));
        }
        for bucket_id in &rule.cap_buckets {
            if !rec.buckets.iter().any(|b| b.id == *bucket_id) {
                return Err(EngineError::NotFound("cap bucket", *bucket_id));
            }
        }
        let mut rule = rule;
        rule.id = self.alloc_id();
        let id = rule.id;
        rec.rules.push(rule);
        Ok(id)
    }

    pub fn rules(&self, card_id: CardId) -> EngineResult<Vec<RewardRule>> {
        let record = self.record(card_id)?;
        let rules = lock(&record).rules.clone();
        Ok(rules)
    }

    pub fn add_cap_bucket(&self, card_id: CardId, bucket: CapBucket) -> EngineResult<BucketId> {
        if !bucket.limit.is_finite() || bucket.limit <= 0.0 {
            return Err(EngineError::validation("cap limit must be positive"));
        }
        let record = self.record(card_id)?;
        let mut rec = lock(&record);
        let mut bucket = bucket;
        bucket.id = self.alloc_id();
        let id = bucket.id;
        rec.buckets.push(bucket);
        Ok(id)
    }

    pub fn add_partner(&self, card_id: CardId, partner: RedemptionPartner) -> EngineResult<PartnerId> {
        if !partner.transfer_ratio.is_finite() || partner.transfer_ratio <= 0.0 {
            return Err(EngineError::validation("transfer ratio must be positive"));
        }
        if !partner.unit_value.is_finite() || partner.unit_value < 0.0 {
            return Err(EngineError::validation(
                "partner point value must not be negative",
            ));
        }
        let record = self.record(card_id)?;
        let mut rec = lock(&record);
        let mut partner = partner;
        partner.id = self.alloc_id();
        let id = partner.id;
        rec.partners.push(partner);
        Ok(id)
    }

    pub fn partners(&self, card_id: CardId) -> EngineResult<Vec<RedemptionPartner>> {
        let record = self.record(card_id)?;
        let partners = lock(&record).partners.clone();
        Ok(partners)
    }

    /// What would this purchase earn on one card. Nothing is committed.
    pub fn evaluate(&self, ctx: &PurchaseContext, card_id: CardId) -> EngineResult<Evaluation> {
        if !ctx.amount.is_finite() || ctx.amount <= 0.0 {
            return Err(EngineError::validation("purchase amount must be positive"));
        }
        let record = self.record(card_id)?;
        let rec = lock(&record).clone();
        let p = ctx.resolve();
        let breakdown = compute_reward(&rec.card, &rec.rules, &rec.buckets, &p);
        let valuation = value_reward(breakdown.total, rec.card.point_value, &rec.partners);
        let cap_remaining_after = breakdown
            .cap_uses
            .iter()
            .filter_map(|u| {
                rec.buckets
                    .iter()
                    .find(|b| b.id == u.bucket_id)
                    .map(|b| (b.headroom_in(&u.period_key) - u.amount).max(0.0))
            })
            .min_by(f64::total_cmp);
        Ok(Evaluation {
            card_id,
            card_name: rec.card.name.clone(),
            reward: breakdown.total,
            breakdown,
            valuation,
            cap_remaining_after,
        })
    }

    /// Rank every active card for a purchase, best first.
    pub fn recommend(&self, ctx: &PurchaseContext) -> Vec<Recommendation> {
        if !ctx.amount.is_finite() || ctx.amount <= 0.0 {
            warn!(amount = ctx.amount, "skipping recommendation for a non-positive amount");
            return Vec::new();
        }
        let records: Vec<CardRecord> = read(&self.cards)
            .values()
            .map(|r| lock(r).clone())
            .collect();
        let p = ctx.resolve();
        let mut rows = Vec::new();
        for rec in records.iter().filter(|r| r.card.active) {
            let breakdown = compute_reward(&rec.card, &rec.rules, &rec.buckets, &p);
            let valuation = value_reward(breakdown.total, rec.card.point_value, &rec.partners);
            let cap_status = breakdown
                .primary_buckets
                .iter()
                .filter_map(|id| rec.buckets.iter().find(|b| b.id == *id))
                .map(|b| b.status(rec.card.cycle_day, p.date))
                .min_by(|a, b| a.remaining.total_cmp(&b.remaining));
            rows.push(Recommendation {
                rank: 0,
                card_id: rec.card.id,
                card_name: rec.card.name.clone(),
                reward: breakdown.total,
                currency: rec.card.currency,
                value: valuation.value,
                value_source: valuation.source,
                rule_summary: breakdown.rule_summary(),
                cap_status,
                excluded: breakdown.excluded,
                annual_fee: rec.card.annual_fee,
            });
        }
        rank_recommendations(&mut rows);
        rows
    }

    /// Commit a purchase: consume cap headroom, record the transaction and
    /// append the earn entry, all under the card's mutex.
    pub fn post_transaction(&self, card_id: CardId, ctx: &PurchaseContext) -> EngineResult<Posted> {
        if !ctx.amount.is_finite() || ctx.amount <= 0.0 {
            return Err(EngineError::validation("purchase amount must be positive"));
        }
        let record = self.record(card_id)?;
        let mut rec = lock(&record);
        if !rec.card.active {
            return Err(EngineError::validation(format!(
                "card {} is inactive",
                card_id
            )));
        }
        let p = ctx.resolve();
        let breakdown = compute_reward(&rec.card, &rec.rules, &rec.buckets, &p);
        let transaction_id = self.alloc_id();
        let entry_id = self.alloc_id();
        for cap_use in &breakdown.cap_uses {
            if let Some(bucket) = rec.buckets.iter_mut().find(|b| b.id == cap_use.bucket_id) {
                bucket.record(&cap_use.period_key, cap_use.amount);
            }
        }
        // A zero-reward earn entry still lands in the ledger so excluded
        // purchases stay auditable.
        rec.ledger.push(LedgerEntry {
            id: entry_id,
            card_id,
            kind: EntryKind::Earn,
            amount: breakdown.total,
            date: p.date,
            transaction_id: Some(transaction_id),
            note: p.merchant.clone(),
        });
        rec.transactions.push(Transaction {
            id: transaction_id,
            card_id,
            amount: p.amount,
            date: p.date,
            category: p.category,
            merchant: p.merchant.clone(),
            portal: p.portal.clone(),
            reward: breakdown.total,
            ledger_entry_id: entry_id,
            cap_uses: breakdown.cap_uses.clone(),
            reversed: false,
        });
        let new_balance = balance(&rec.ledger);
        let new_cap_state: Vec<CapStatus> = breakdown
            .cap_uses
            .iter()
            .filter_map(|u| rec.buckets.iter().find(|b| b.id == u.bucket_id))
            .map(|b| b.status(rec.card.cycle_day, p.date))
            .collect();
        // Publish the reversal index before the card unlocks: a reader that
        // can already see the transaction must be able to reverse it.
        write(&self.txn_cards).insert(transaction_id, card_id);
        Ok(Posted {
            transaction_id,
            ledger_entry_id: entry_id,
            reward: breakdown.total,
            new_balance,
            new_cap_state,
        })
    }

    /// Undo a posted transaction with a compensating earn entry. Cap usage
    /// is handed back only while its period is still current.
    pub fn reverse_transaction(
        &self,
        transaction_id: TransactionId,
        date: NaiveDate,
    ) -> EngineResult<Reversed> {
        let card_id = read(&self.txn_cards)
            .get(&transaction_id)
            .copied()
            .ok_or(EngineError::NotFound("transaction", transaction_id))?;
        let record = self.record(card_id)?;
        let mut rec = lock(&record);
        let Some(idx) = rec.transactions.iter().position(|t| t.id == transaction_id) else {
            return Err(EngineError::NotFound("transaction", transaction_id));
        };
        if rec.transactions[idx].reversed {
            return Err(EngineError::validation(format!(
                "transaction {} is already reversed",
                transaction_id
            )));
        }
        let reward = rec.transactions[idx].reward;
        let cap_uses = rec.transactions[idx].cap_uses.clone();
        for cap_use in &cap_uses {
            if let Some(bucket) = rec.buckets.iter_mut().find(|b| b.id == cap_use.bucket_id) {
                bucket.release(&cap_use.period_key, cap_use.amount);
            }
        }
        let entry_id = self.alloc_id();
        rec.ledger.push(LedgerEntry {
            id: entry_id,
            card_id,
            kind: EntryKind::Earn,
            amount: -reward,
            date,
            transaction_id: Some(transaction_id),
            note: Some(format!("reversal of transaction {}", transaction_id)),
        });
        rec.transactions[idx].reversed = true;
        let new_balance = balance(&rec.ledger);
        Ok(Reversed {
            ledger_entry_id: entry_id,
            new_balance,
        })
    }

    /// Append a manual ledger entry. Redemptions and expiries must be
    /// covered by the current balance; corrections may drive it negative.
    pub fn adjust_balance(
        &self,
        card_id: CardId,
        kind: EntryKind,
        amount: f64,
        date: NaiveDate,
        note: Option<String>,
    ) -> EngineResult<Adjusted> {
        let signed = signed_adjustment(kind, amount)?;
        let record = self.record(card_id)?;
        let mut rec = lock(&record);
        let available = balance(&rec.ledger);
        let after = available + signed;
        if kind.requires_cover() && after < 0.0 {
            return Err(EngineError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        if kind == EntryKind::Correction && after < 0.0 {
            warn!(card_id, balance = after, "correction drives the balance negative");
        }
        let entry_id = self.alloc_id();
        rec.ledger.push(LedgerEntry {
            id: entry_id,
            card_id,
            kind,
            amount: signed,
            date,
            transaction_id: None,
            note,
        });
        Ok(Adjusted {
            ledger_entry_id: entry_id,
            new_balance: after,
        })
    }

    pub fn get_balance(&self, card_id: CardId) -> EngineResult<f64> {
        let record = self.record(card_id)?;
        let rec = lock(&record);
        Ok(balance(&rec.ledger))
    }

    pub fn get_cap_status(
        &self,
        card_id: CardId,
        bucket_id: BucketId,
        on: NaiveDate,
    ) -> EngineResult<CapStatus> {
        let record = self.record(card_id)?;
        let rec = lock(&record);
        let bucket = rec
            .buckets
            .iter()
            .find(|b| b.id == bucket_id)
            .ok_or(EngineError::NotFound("cap bucket", bucket_id))?;
        Ok(bucket.status(rec.card.cycle_day, on))
    }

    pub fn cap_statuses(&self, card_id: CardId, on: NaiveDate) -> EngineResult<Vec<CapStatus>> {
        let record = self.record(card_id)?;
        let rec = lock(&record);
        Ok(rec
            .buckets
            .iter()
            .map(|b| b.status(rec.card.cycle_day, on))
            .collect())
    }

    pub fn transactions(&self, card_id: CardId) -> EngineResult<Vec<Transaction>> {
        let record = self.record(card_id)?;
        let transactions = lock(&record).transactions.clone();
        Ok(transactions)
    }

    pub fn ledger_entries(&self, card_id: CardId) -> EngineResult<Vec<LedgerEntry>> {
        let record = self.record(card_id)?;
        let entries = lock(&record).ledger.clone();
        Ok(entries)
    }

    /// Spend and reward per category, biggest spend first. Reversed
    /// transactions are left out.
    pub fn spend_summary(&self, card_id: Option<CardId>) -> EngineResult<Vec<CategorySpend>> {
        let records: Vec<CardRecord> = match card_id {
            Some(id) => {
                let record = self.record(id)?;
                vec![lock(&record).clone()]
            }
            None => read(&self.cards).values().map(|r| lock(r).clone()).collect(),
        };
        let mut by_category: HashMap<Category, CategorySpend> = HashMap::new();
        for rec in &records {
            for txn in rec.transactions.iter().filter(|t| !t.reversed) {
                let row = by_category.entry(txn.category).or_insert_with(|| CategorySpend {
                    category: txn.category,
                    spend: 0.0,
                    reward: 0.0,
                    transactions: 0,
                });
                row.spend += txn.amount;
                row.reward += txn.reward;
                row.transactions += 1;
            }
        }
        let mut rows: Vec<CategorySpend> = by_category.into_values().collect();
        rows.sort_by(|a, b| b.spend.total_cmp(&a.spend));
        Ok(rows)
    }

    pub fn snapshot(&self) -> WalletSnapshot {
        let mut cards: Vec<CardRecord> = read(&self.cards)
            .values()
            .map(|r| lock(r).clone())
            .collect();
        cards.sort_by_key(|r| r.card.id);
        WalletSnapshot {
            cards,
            next_id: self.next_id.load(Ordering::Relaxed),
        }
    }

    pub fn from_snapshot(snapshot: WalletSnapshot) -> Self {
        // Hand-edited snapshots may carry a stale counter; never hand out
        // an id that is already taken.
        let mut next_id = snapshot.next_id.max(1);
        let mut cards = HashMap::new();
        let mut txn_cards = HashMap::new();
        for rec in snapshot.cards {
            let ids = std::iter::once(rec.card.id)
                .chain(rec.rules.iter().map(|r| r.id))
                .chain(rec.buckets.iter().map(|b| b.id))
                .chain(rec.partners.iter().map(|p| p.id))
                .chain(rec.transactions.iter().map(|t| t.id))
                .chain(rec.ledger.iter().map(|e| e.id));
            for id in ids {
                next_id = next_id.max(id + 1);
            }
            for txn in &rec.transactions {
                txn_cards.insert(txn.id, rec.card.id);
            }
            cards.insert(rec.card.id, Arc::new(Mutex::new(rec)));
        }
        Self {
            cards: RwLock::new(cards),
            txn_cards: RwLock::new(txn_cards),
            next_id: AtomicU64::new(next_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::CapUnit;
    use crate::category::Category;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn wallet_with_points_card() -> (Wallet, CardId) {
        let wallet = Wallet::new();
        let card_id = wallet.add_card(Card::points("Regal Points"), 1.0).unwrap();
        (wallet, card_id)
    }

    fn travel_context(amount: f64) -> PurchaseContext {
        PurchaseContext::new(amount, date(2026, 3, 20)).with_category(Category::TravelFlights)
    }

    #[test]
    fn test_add_card_creates_base_rule() {
        let (wallet, card_id) = wallet_with_points_card();
        let rules = wallet.rules(card_id).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].scope, RuleScope::Default);
        assert_eq!(rules[0].multiplier, 1.0);
    }

    #[test]
    fn test_add_card_rejects_bad_cycle_day() {
        let wallet = Wallet::new();
        let result = wallet.add_card(Card::points("Odd Cycle").with_cycle_day(29), 1.0);
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_duplicate_rule_scope_rejected() {
        let (wallet, card_id) = wallet_with_points_card();
        wallet
            .add_rule(card_id, RewardRule::new(RuleScope::Category(Category::Dining), 2.0))
            .unwrap();
        let dup = wallet.add_rule(card_id, RewardRule::new(RuleScope::Category(Category::Dining), 3.0));
        assert!(matches!(dup, Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_rule_with_unknown_bucket_rejected() {
        let (wallet, card_id) = wallet_with_points_card();
        let rule = RewardRule::new(RuleScope::Category(Category::TravelFlights), 4.0).with_cap(999);
        assert_eq!(
            wallet.add_rule(card_id, rule),
            Err(EngineError::NotFound("cap bucket", 999))
        );
    }

    #[test]
    fn test_post_earns_and_updates_balance() {
        let (wallet, card_id) = wallet_with_points_card();
        let posted = wallet.post_transaction(card_id, &travel_context(100.0)).unwrap();
        assert_eq!(posted.reward, 100.0);
        assert_eq!(posted.new_balance, 100.0);
        assert_eq!(wallet.get_balance(card_id).unwrap(), 100.0);
        let history = wallet.transactions(card_id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].category, Category::TravelFlights);
        assert!(!history[0].reversed);
    }

    #[test]
    fn test_post_rejects_inactive_card() {
        let (wallet, card_id) = wallet_with_points_card();
        wallet.set_card_active(card_id, false).unwrap();
        let result = wallet.post_transaction(card_id, &travel_context(100.0));
        assert!(matches!(result, Err(EngineError::Validation(_))));
        assert!(wallet.recommend(&travel_context(100.0)).is_empty());
    }

    #[test]
    fn test_post_rejects_non_positive_amount() {
        let (wallet, card_id) = wallet_with_points_card();
        let result = wallet.post_transaction(card_id, &travel_context(0.0));
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_reverse_restores_balance_and_cap() {
        let (wallet, card_id) = wallet_with_points_card();
        let bucket_id = wallet
            .add_cap_bucket(card_id, CapBucket::monthly("travel cap", CapUnit::Spend, 1000.0))
            .unwrap();
        wallet
            .add_rule(
                card_id,
                RewardRule::new(RuleScope::Category(Category::TravelFlights), 4.0).with_cap(bucket_id),
            )
            .unwrap();

        let posted = wallet.post_transaction(card_id, &travel_context(1500.0)).unwrap();
        // 1,000 at 4x plus 500 at the base rate.
        assert_eq!(posted.reward, 4500.0);
        assert_eq!(posted.new_cap_state.len(), 1);
        assert_eq!(posted.new_cap_state[0].remaining, 0.0);

        let reversed = wallet
            .reverse_transaction(posted.transaction_id, date(2026, 3, 21))
            .unwrap();
        assert_eq!(reversed.new_balance, 0.0);
        let status = wallet
            .get_cap_status(card_id, bucket_id, date(2026, 3, 21))
            .unwrap();
        assert_eq!(status.accumulated, 0.0);

        let again = wallet.reverse_transaction(posted.transaction_id, date(2026, 3, 22));
        assert!(matches!(again, Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_reverse_unknown_transaction() {
        let (wallet, _) = wallet_with_points_card();
        assert_eq!(
            wallet.reverse_transaction(404, date(2026, 3, 21)),
            Err(EngineError::NotFound("transaction", 404))
        );
    }

    #[test]
    fn test_redemption_needs_cover() {
        let (wallet, card_id) = wallet_with_points_card();
        let result = wallet.adjust_balance(
            card_id,
            EntryKind::Redemption,
            500.0,
            date(2026, 3, 20),
            None,
        );
        assert_eq!(
            result,
            Err(EngineError::InsufficientBalance {
                requested: 500.0,
                available: 0.0,
            })
        );
    }

    #[test]
    fn test_correction_may_go_negative() {
        let (wallet, card_id) = wallet_with_points_card();
        wallet.post_transaction(card_id, &travel_context(100.0)).unwrap();
        let adjusted = wallet
            .adjust_balance(
                card_id,
                EntryKind::Correction,
                -250.0,
                date(2026, 3, 21),
                Some("issuer clawback".to_string()),
            )
            .unwrap();
        assert_eq!(adjusted.new_balance, -150.0);
        assert_eq!(wallet.get_balance(card_id).unwrap(), -150.0);
    }

    #[test]
    fn test_remove_card_drops_history() {
        let (wallet, card_id) = wallet_with_points_card();
        let posted = wallet.post_transaction(card_id, &travel_context(100.0)).unwrap();
        wallet.remove_card(card_id).unwrap();
        assert_eq!(
            wallet.get_balance(card_id),
            Err(EngineError::NotFound("card", card_id))
        );
        assert_eq!(
            wallet.reverse_transaction(posted.transaction_id, date(2026, 3, 21)),
            Err(EngineError::NotFound("transaction", posted.transaction_id))
        );
    }

    #[test]
    fn test_spend_summary_skips_reversed() {
        let (wallet, card_id) = wallet_with_points_card();
        wallet.post_transaction(card_id, &travel_context(200.0)).unwrap();
        let groceries = PurchaseContext::new(300.0, date(2026, 3, 21))
            .with_category(Category::Groceries);
        let posted = wallet.post_transaction(card_id, &groceries).unwrap();
        wallet
            .reverse_transaction(posted.transaction_id, date(2026, 3, 22))
            .unwrap();

        let summary = wallet.spend_summary(Some(card_id)).unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].category, Category::TravelFlights);
        assert_eq!(summary[0].spend, 200.0);
        assert_eq!(summary[0].transactions, 1);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let (wallet, card_id) = wallet_with_points_card();
        let posted = wallet.post_transaction(card_id, &travel_context(100.0)).unwrap();

        let json = serde_json::to_string(&wallet.snapshot()).unwrap();
        let restored = Wallet::from_snapshot(serde_json::from_str(&json).unwrap());

        assert_eq!(restored.get_balance(card_id).unwrap(), 100.0);
        // The transaction index is rebuilt, so reversal still resolves.
        restored
            .reverse_transaction(posted.transaction_id, date(2026, 3, 21))
            .unwrap();
        // New ids never collide with restored ones.
        let next_card = restored.add_card(Card::points("Second"), 1.0).unwrap();
        assert!(next_card > posted.transaction_id);
    }

    #[test]
    fn test_recommend_empty_for_bad_amount() {
        let (wallet, _) = wallet_with_points_card();
        assert!(wallet.recommend(&travel_context(-5.0)).is_empty());
    }
}
