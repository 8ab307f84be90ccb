//! Cap buckets: periodic earning limits with lazy rollover.
//!
//! A bucket never resets itself on a schedule. Every read derives the period
//! key for "now" from the card's billing anchor and compares it with the key
//! stored at the last write; a mismatch means the stored accumulation belongs
//! to a dead period and counts as zero.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

pub type BucketId = u64;

/// Utilization at or above this fraction flags the bucket as nearly full.
pub const LOW_HEADROOM_FRACTION: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapPeriod {
    /// Anchored to the card's billing-cycle day.
    #[serde(rename = "monthly")]
    Monthly,
    /// Calendar quarters, independent of the billing anchor.
    #[serde(rename = "quarterly")]
    Quarterly,
}

/// What the limit counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapUnit {
    /// Reward-basis currency charged against rules under this bucket.
    #[serde(rename = "spend")]
    Spend,
    /// Reward units earned by rules under this bucket.
    #[serde(rename = "reward")]
    Reward,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapBucket {
    pub id: BucketId,
    pub label: String,
    pub period: CapPeriod,
    pub unit: CapUnit,
    pub limit: f64,
    /// Usage within `period_key`. Stale once the period rolls over.
    pub accumulated: f64,
    pub period_key: String,
}

impl CapBucket {
    pub fn monthly(label: impl Into<String>, unit: CapUnit, limit: f64) -> Self {
        Self::new(label, CapPeriod::Monthly, unit, limit)
    }

    pub fn quarterly(label: impl Into<String>, unit: CapUnit, limit: f64) -> Self {
        Self::new(label, CapPeriod::Quarterly, unit, limit)
    }

    pub fn new(label: impl Into<String>, period: CapPeriod, unit: CapUnit, limit: f64) -> Self {
        Self {
            id: 0,
            label: label.into(),
            period,
            unit,
            limit,
            accumulated: 0.0,
            period_key: String::new(),
        }
    }

    /// Usage counted toward `key`; zero if the stored period is older.
    pub fn usage_in(&self, key: &str) -> f64 {
        if self.period_key == key {
            self.accumulated
        } else {
            0.0
        }
    }

    pub fn headroom_in(&self, key: &str) -> f64 {
        (self.limit - self.usage_in(key)).max(0.0)
    }

    /// Commit usage for `key`, rolling the stored period forward first if it
    /// is stale.
    pub fn record(&mut self, key: &str, amount: f64) {
        if self.period_key != key {
            self.period_key = key.to_string();
            self.accumulated = 0.0;
        }
        self.accumulated += amount;
    }

    /// Give back usage recorded under `key`. A no-op after rollover: the
    /// accumulation it belonged to is already dead.
    pub fn release(&mut self, key: &str, amount: f64) {
        if self.period_key == key {
            self.accumulated = (self.accumulated - amount).max(0.0);
        }
    }

    pub fn status(&self, cycle_day: u32, on: NaiveDate) -> CapStatus {
        let key = period_key(self.period, cycle_day, on);
        let (window_start, window_end) = period_window(self.period, cycle_day, on);
        let accumulated = self.usage_in(&key);
        let used_fraction = if self.limit > 0.0 {
            (accumulated / self.limit).min(1.0)
        } else {
            1.0
        };
        CapStatus {
            bucket_id: self.id,
            label: self.label.clone(),
            unit: self.unit,
            limit: self.limit,
            accumulated,
            remaining: (self.limit - accumulated).max(0.0),
            period_key: key,
            window_start,
            window_end,
            used_fraction,
            low_headroom: used_fraction >= LOW_HEADROOM_FRACTION,
        }
    }
}

/// Usage one posted transaction consumed from one bucket. Stored on the
/// transaction so a reversal can give back exactly what was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapUse {
    pub bucket_id: BucketId,
    pub period_key: String,
    pub amount: f64,
}

/// Point-in-time view of a bucket, reported by `get_cap_status` and attached
/// to recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapStatus {
    pub bucket_id: BucketId,
    pub label: String,
    pub unit: CapUnit,
    pub limit: f64,
    pub accumulated: f64,
    pub remaining: f64,
    pub period_key: String,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub used_fraction: f64,
    pub low_headroom: bool,
}

/// Period key a transaction on `on` falls into: `YYYY-MM` of the billing
/// cycle's start for monthly buckets, `YYYY-Qn` for quarterly.
pub fn period_key(period: CapPeriod, cycle_day: u32, on: NaiveDate) -> String {
    match period {
        CapPeriod::Monthly => {
            let start = cycle_start(cycle_day, on);
            format!("{:04}-{:02}", start.year(), start.month())
        }
        CapPeriod::Quarterly => format!("{:04}-Q{}", on.year(), on.month0() / 3 + 1),
    }
}

/// First and last day of the period containing `on`.
pub fn period_window(period: CapPeriod, cycle_day: u32, on: NaiveDate) -> (NaiveDate, NaiveDate) {
    match period {
        CapPeriod::Monthly => {
            let start = cycle_start(cycle_day, on);
            let end = start
                .checked_add_months(Months::new(1))
                .and_then(|d| d.pred_opt())
                .unwrap_or(start);
            (start, end)
        }
        CapPeriod::Quarterly => {
            let start = ymd(on.year(), on.month0() / 3 * 3 + 1, 1);
            let end = start
                .checked_add_months(Months::new(3))
                .and_then(|d| d.pred_opt())
                .unwrap_or(start);
            (start, end)
        }
    }
}

/// Start of the billing cycle containing `on`: the anchor day of the current
/// month, or of the previous month when `on` sits before the anchor.
fn cycle_start(cycle_day: u32, on: NaiveDate) -> NaiveDate {
    let anchored = ymd(on.year(), on.month(), cycle_day);
    if on >= anchored {
        anchored
    } else {
        anchored
            .checked_sub_months(Months::new(1))
            .unwrap_or(anchored)
    }
}

// Cycle days are validated to 1..=28 on card creation, so this cannot miss.
fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}
