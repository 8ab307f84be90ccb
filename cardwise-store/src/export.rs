//! CSV export of a card's reward ledger.

use anyhow::Result;
use cardwise_core::LedgerEntry;
use std::io;

pub fn export_history_csv<W: io::Write>(out: W, entries: &[LedgerEntry]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["id", "date", "kind", "amount", "transaction", "note"])?;
    for entry in entries {
        wtr.write_record([
            entry.id.to_string(),
            entry.date.to_string(),
            entry.kind.label().to_string(),
            format!("{:.2}", entry.amount),
            entry
                .transaction_id
                .map(|t| t.to_string())
                .unwrap_or_default(),
            entry.note.clone().unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardwise_core::{EntryKind, LedgerEntry};
    use chrono::NaiveDate;

    fn entry(id: u64, kind: EntryKind, amount: f64) -> LedgerEntry {
        LedgerEntry {
            id,
            card_id: 1,
            kind,
            amount,
            date: NaiveDate::from_ymd_opt(2026, 3, 20).unwrap(),
            transaction_id: (kind == EntryKind::Earn).then_some(9),
            note: None,
        }
    }

    #[test]
    fn test_export_writes_header_and_rows() {
        let mut out = Vec::new();
        let entries = vec![
            entry(1, EntryKind::Earn, 4500.0),
            entry(2, EntryKind::Redemption, -2000.0),
        ];
        export_history_csv(&mut out, &entries).unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("id,date,kind,amount,transaction,note"));
        assert_eq!(lines.next(), Some("1,2026-03-20,earn,4500.00,9,"));
        assert_eq!(lines.next(), Some("2,2026-03-20,redemption,-2000.00,,"));
    }

    #[test]
    fn test_export_empty_ledger() {
        let mut out = Vec::new();
        export_history_csv(&mut out, &[]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.trim(), "id,date,kind,amount,transaction,note");
    }
}
