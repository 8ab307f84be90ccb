//! Append-only points ledger. Entries are never edited or deleted; every
//! change to a balance is a new signed entry.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::card::CardId;
use crate::error::{EngineError, EngineResult};

pub type EntryId = u64;
pub type TransactionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    #[serde(rename = "earn")]
    Earn,
    #[serde(rename = "bonus")]
    Bonus,
    #[serde(rename = "referral")]
    Referral,
    #[serde(rename = "correction")]
    Correction,
    #[serde(rename = "redemption")]
    Redemption,
    #[serde(rename = "expiry")]
    Expiry,
}

impl EntryKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Earn => "earn",
            EntryKind::Bonus => "bonus",
            EntryKind::Referral => "referral",
            EntryKind::Correction => "correction",
            EntryKind::Redemption => "redemption",
            EntryKind::Expiry => "expiry",
        }
    }

    /// Kinds that may never push a balance below zero.
    pub fn requires_cover(&self) -> bool {
        matches!(self, EntryKind::Redemption | EntryKind::Expiry)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub card_id: CardId,
    pub kind: EntryKind,
    /// Signed. Deductions are negative.
    pub amount: f64,
    pub date: NaiveDate,
    pub transaction_id: Option<TransactionId>,
    pub note: Option<String>,
}

pub fn balance(entries: &[LedgerEntry]) -> f64 {
    entries.iter().map(|e| e.amount).sum()
}

/// Turn an adjustment request into the signed amount to append.
///
/// Bonus, referral, redemption and expiry take positive magnitudes; the
/// deducting kinds are stored negative. Corrections keep their sign as
/// given (they exist to repair past mistakes in either direction). Earn
/// entries only come from posting transactions.
pub fn signed_adjustment(kind: EntryKind, amount: f64) -> EngineResult<f64> {
    match kind {
        EntryKind::Earn => Err(EngineError::validation(
            "earn entries are created by posting transactions",
        )),
        EntryKind::Bonus | EntryKind::Referral => {
            if amount <= 0.0 {
                return Err(EngineError::validation(format!(
                    "{} amount must be positive",
                    kind.label()
                )));
            }
            Ok(amount)
        }
        EntryKind::Redemption | EntryKind::Expiry => {
            if amount <= 0.0 {
                return Err(EngineError::validation(format!(
                    "{} amount must be positive",
                    kind.label()
                )));
            }
            Ok(-amount)
        }
        EntryKind::Correction => {
            if amount == 0.0 {
                return Err(EngineError::validation("correction amount must be non-zero"));
            }
            Ok(amount)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: EntryKind, amount: f64) -> LedgerEntry {
        LedgerEntry {
            id: 0,
            card_id: 1,
            kind,
            amount,
            date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            transaction_id: None,
            note: None,
        }
    }

    #[test]
    fn test_balance_is_signed_sum() {
        let entries = vec![
            entry(EntryKind::Earn, 4_000.0),
            entry(EntryKind::Bonus, 1_000.0),
            entry(EntryKind::Redemption, -2_500.0),
        ];
        assert_eq!(balance(&entries), 2_500.0);
    }

    #[test]
    fn test_deducting_kinds_store_negative() {
        assert_eq!(signed_adjustment(EntryKind::Redemption, 500.0).unwrap(), -500.0);
        assert_eq!(signed_adjustment(EntryKind::Expiry, 120.0).unwrap(), -120.0);
        assert_eq!(signed_adjustment(EntryKind::Bonus, 500.0).unwrap(), 500.0);
    }

    #[test]
    fn test_magnitudes_must_be_positive() {
        assert!(signed_adjustment(EntryKind::Bonus, 0.0).is_err());
        assert!(signed_adjustment(EntryKind::Redemption, -10.0).is_err());
    }

    #[test]
    fn test_correction_keeps_sign() {
        assert_eq!(signed_adjustment(EntryKind::Correction, -750.0).unwrap(), -750.0);
        assert_eq!(signed_adjustment(EntryKind::Correction, 300.0).unwrap(), 300.0);
        assert!(signed_adjustment(EntryKind::Correction, 0.0).is_err());
    }

    #[test]
    fn test_earn_cannot_be_adjusted_in() {
        assert!(signed_adjustment(EntryKind::Earn, 100.0).is_err());
    }

    #[test]
    fn test_cover_required_only_for_deductions() {
        assert!(EntryKind::Redemption.requires_cover());
        assert!(EntryKind::Expiry.requires_cover());
        assert!(!EntryKind::Correction.requires_cover());
        assert!(!EntryKind::Bonus.requires_cover());
    }
}
