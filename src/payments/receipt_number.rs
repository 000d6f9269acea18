use chrono::NaiveDate;

use crate::ledger::FeeLedger;

/// `{prefix}-{YYYYMMDD}-{seq:06}`
pub fn format_receipt_number(prefix: &str, date: NaiveDate, seq: u64) -> String {
    format!("{}-{}-{:06}", prefix, date.format("%Y%m%d"), seq)
}

/// split a receipt number back into prefix, date and sequence
pub fn parse_receipt_number(receipt_number: &str) -> Option<(&str, NaiveDate, u64)> {
    let mut parts = receipt_number.rsplitn(3, '-');
    let seq = parts.next()?;
    let date = parts.next()?;
    let prefix = parts.next()?;

    if prefix.is_empty() || seq.len() < 6 || !seq.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if date.len() != 8 {
        return None;
    }
    let date = NaiveDate::parse_from_str(date, "%Y%m%d").ok()?;
    Some((prefix, date, seq.parse().ok()?))
}

impl FeeLedger {
    /// next free receipt number; the sequence is only advanced once the
    /// payment carrying it commits
    pub(crate) fn next_receipt_number(&self, date: NaiveDate) -> (u64, String) {
        let mut seq = self.receipt_seq;
        loop {
            seq += 1;
            let candidate = format_receipt_number(&self.config.receipt.prefix, date, seq);
            if !self.receipts.contains_key(&candidate) {
                return (seq, candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_and_parse() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 9).unwrap();
        let number = format_receipt_number("RCPT", date, 42);
        assert_eq!(number, "RCPT-20250709-000042");
        assert_eq!(parse_receipt_number(&number), Some(("RCPT", date, 42)));
    }

    #[test]
    fn test_sequence_wider_than_six_digits() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 9).unwrap();
        let number = format_receipt_number("RCPT", date, 1_234_567);
        assert_eq!(number, "RCPT-20250709-1234567");
        assert_eq!(parse_receipt_number(&number).map(|p| p.2), Some(1_234_567));
    }

    #[test]
    fn test_malformed_numbers() {
        for bad in ["", "RCPT", "RCPT-2025-000001", "RCPT-20251340-000001", "-20250709-000001", "RCPT-20250709-12a456"] {
            assert!(parse_receipt_number(bad).is_none(), "{bad}");
        }
    }
}
