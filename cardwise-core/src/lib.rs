//! cardwise-core: Reward engine for a wallet of credit cards

pub mod calculator;
pub mod caps;
pub mod card;
pub mod category;
pub mod error;
pub mod ledger;
pub mod recommend;
pub mod rules;
pub mod valuation;
pub mod wallet;

pub use calculator::{RewardBreakdown, RewardSlice, compute_reward};
pub use caps::{
    BucketId, CapBucket, CapPeriod, CapStatus, CapUnit, CapUse, LOW_HEADROOM_FRACTION,
    period_key, period_window,
};
pub use card::{Card, CardId, PartnerId, RedemptionPartner, RewardCurrency, Rounding, TierLevel};
pub use category::{Category, Resolution, resolve_category};
pub use error::{EngineError, EngineResult};
pub use ledger::{EntryId, EntryKind, LedgerEntry, TransactionId};
pub use recommend::{PurchaseContext, Recommendation, rank_recommendations};
pub use rules::{CapOverflow, ResolvedPurchase, RewardRule, RuleId, RuleScope};
pub use valuation::{Valuation, ValueSource, value_reward};
pub use wallet::{
    Adjusted,
    CategorySpend,
    Evaluation,
    Posted,
    Reversed,
    Transaction,
    Wallet,
    WalletSnapshot,
};
