//! Parse card statement CSV exports into postable rows.
//!
//! Statements arrive with arbitrary preamble lines, then:
//! Date,Merchant,Amount,Portal,Category
//! Dates are YYYY-MM-DD. Credits and unparseable rows are skipped.

use anyhow::{Context, Result};
use cardwise_core::{Category, PurchaseContext};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// One purchase parsed out of a statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatementRow {
    pub date: NaiveDate,
    pub merchant: String,
    pub amount: f64,
    pub portal: Option<String>,
    pub category: Option<Category>,
}

impl StatementRow {
    pub fn context(&self) -> PurchaseContext {
        let mut ctx = PurchaseContext::new(self.amount, self.date);
        if !self.merchant.is_empty() {
            ctx = ctx.with_merchant(self.merchant.clone());
        }
        if let Some(portal) = &self.portal {
            ctx = ctx.with_portal(portal.clone());
        }
        if let Some(category) = self.category {
            ctx = ctx.with_category(category);
        }
        ctx
    }
}

/// Parse a statement CSV file, returning all postable rows.
/// Skips the preamble and header automatically.
pub fn parse_statement_csv(path: impl AsRef<Path>) -> Result<Vec<StatementRow>> {
    let file = fs::File::open(path.as_ref())
        .with_context(|| format!("opening {}", path.as_ref().display()))?;
    read_statement(file)
}

pub fn read_statement<R: io::Read>(input: R) -> Result<Vec<StatementRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(input);

    let mut rows = Vec::new();
    let mut header_found = false;

    for result in rdr.records() {
        let record = result?;
        // Skip until we find the header row
        if !header_found {
            if record.get(0).map(|s| s.trim()) == Some("Date") {
                header_found = true;
            }
            continue;
        }

        let date_str = record.get(0).unwrap_or("").trim();
        if date_str.is_empty() {
            continue;
        }
        let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
            debug!(row = date_str, "skipping row with an unparseable date");
            continue;
        };

        let amount: f64 = record.get(2).unwrap_or("0").trim().parse().unwrap_or(0.0);
        if amount <= 0.0 {
            // Payments and refunds come through as credits; nothing to post.
            debug!(%date, amount, "skipping non-positive amount");
            continue;
        }

        let portal = record
            .get(3)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        let category = record.get(4).and_then(|s| Category::parse(s.trim()));

        rows.push(StatementRow {
            date,
            merchant: record.get(1).unwrap_or("").trim().to_string(),
            amount,
            portal,
            category,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Statement for card ending 4432
,,
Date,Merchant,Amount,Portal,Category
2026-03-02,SWIGGY BANGALORE,640.50,,
2026-03-05,INDIGO 6E BOOKING,8200.00,SmartBuy,travel-flights
2026-03-07,PAYMENT RECEIVED,-5000.00,,
2026-03-09,TANISHQ JEWELLERS,15000.00,,jewellery
03/11/2026,BADLY DATED ROW,100.00,,
";

    #[test]
    fn test_parse_statement_with_preamble() {
        let rows = read_statement(SAMPLE.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].merchant, "SWIGGY BANGALORE");
        assert_eq!(rows[0].amount, 640.50);
        assert_eq!(rows[0].portal, None);
        assert_eq!(rows[0].category, None);

        assert_eq!(rows[1].date, NaiveDate::from_ymd_opt(2026, 3, 5).unwrap());
        assert_eq!(rows[1].portal.as_deref(), Some("SmartBuy"));
        assert_eq!(rows[1].category, Some(Category::TravelFlights));

        assert_eq!(rows[2].category, Some(Category::Jewellery));
    }

    #[test]
    fn test_credits_and_bad_dates_are_skipped() {
        let rows = read_statement(SAMPLE.as_bytes()).unwrap();
        assert!(rows.iter().all(|r| r.amount > 0.0));
        assert!(rows.iter().all(|r| !r.merchant.contains("BADLY DATED")));
    }

    #[test]
    fn test_row_context_carries_fields() {
        let rows = read_statement(SAMPLE.as_bytes()).unwrap();
        let ctx = rows[1].context();
        assert_eq!(ctx.amount, 8200.0);
        assert_eq!(ctx.merchant.as_deref(), Some("INDIGO 6E BOOKING"));
        assert_eq!(ctx.portal.as_deref(), Some("SmartBuy"));
        assert_eq!(ctx.category, Some(Category::TravelFlights));
    }

    #[test]
    fn test_parse_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, SAMPLE.as_bytes()).unwrap();
        let rows = parse_statement_csv(file.path()).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_missing_file_errors() {
        assert!(parse_statement_csv("/nonexistent/statement.csv").is_err());
    }
}
