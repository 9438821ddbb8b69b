// Transaction batch schema and the alias-aware CSV mapper.
//
// Bank exports disagree on header names, so each field binds to a list of
// aliases tried in priority order; the first header that matches wins.
// Annotation fields are never read from input, only written by the bridge.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::io::Read;

use crate::error::ImportError;

/// Category used when the CSV cell is blank or the column is missing.
pub const DEFAULT_CATEGORY: &str = "other";

/// Timestamp formats accepted from CSV input, tried in order.
/// Fixed formats only; no locale detection.
pub const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d"];

/// Header aliases per field, highest priority first.
pub const AMOUNT_ALIASES: [&str; 4] = ["Amount", "Transaction Amount", "Debit", "Credit"];
pub const CATEGORY_ALIASES: [&str; 3] = ["Category", "Type", "Transaction Type"];
pub const DATE_ALIASES: [&str; 2] = ["Date", "Transaction Date"];

/// One transaction in a batch handed to the analysis bridge.
///
/// Identity is positional within the batch; nothing here is persisted. The
/// annotation fields stay at their defaults until the bridge succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub amount: f64,
    /// Lower-cased free text, `"other"` when the source was blank.
    pub category: String,
    pub timestamp: NaiveDateTime,

    // Annotations, populated only by the analysis bridge
    #[serde(default)]
    pub flagged: bool,
    #[serde(default)]
    pub advice: Option<String>,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TransactionRecord {
    /// Build a record with normalized category and defaulted timestamp.
    pub fn new(amount: f64, category: Option<&str>, timestamp: Option<NaiveDateTime>) -> Self {
        let category = match category.map(str::trim) {
            Some(c) if !c.is_empty() => c.to_lowercase(),
            _ => DEFAULT_CATEGORY.to_string(),
        };

        Self {
            amount,
            category,
            timestamp: timestamp.unwrap_or_else(|| chrono::Local::now().naive_local()),
            flagged: false,
            advice: None,
            impact: None,
            tags: Vec::new(),
        }
    }
}

/// First header matching any alias, in alias priority order.
fn find_column(headers: &csv::StringRecord, aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| headers.iter().position(|h| h.trim() == *alias))
}

pub fn parse_timestamp(cell: &str) -> Option<NaiveDateTime> {
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(cell, format) {
            return Some(ts);
        }
        // Bare dates parse as midnight
        if let Ok(date) = chrono::NaiveDate::parse_from_str(cell, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Parse an uploaded transactions CSV into a batch.
///
/// Amount is required (under any of its aliases); category and timestamp
/// default when their columns or cells are absent. Fail-fast like the
/// catalog import: one bad row aborts the batch.
pub fn parse_batch<R: Read>(input: R) -> Result<Vec<TransactionRecord>, ImportError> {
    let mut rdr = csv::Reader::from_reader(input);
    let headers = rdr
        .headers()
        .map_err(|e| ImportError::Parse(e.to_string()))?
        .clone();

    let amount_col = find_column(&headers, &AMOUNT_ALIASES).ok_or_else(|| {
        ImportError::Parse(format!(
            "no amount column found (expected one of: {})",
            AMOUNT_ALIASES.join(", ")
        ))
    })?;
    let category_col = find_column(&headers, &CATEGORY_ALIASES);
    let date_col = find_column(&headers, &DATE_ALIASES);

    let mut batch = Vec::new();

    for (i, row) in rdr.records().enumerate() {
        let line = i + 2;
        let row = row.map_err(|e| ImportError::Parse(format!("row {line}: {e}")))?;

        let amount_cell = row.get(amount_col).map(str::trim).unwrap_or_default();
        if amount_cell.is_empty() {
            return Err(ImportError::Parse(format!("row {line}: empty amount")));
        }
        let amount: f64 = amount_cell.parse().map_err(|_| {
            ImportError::Parse(format!("row {line}: invalid amount '{amount_cell}'"))
        })?;

        let category = category_col.and_then(|idx| row.get(idx));

        let timestamp = match date_col.and_then(|idx| row.get(idx)).map(str::trim) {
            Some(cell) if !cell.is_empty() => Some(parse_timestamp(cell).ok_or_else(|| {
                ImportError::Parse(format!("row {line}: invalid date '{cell}'"))
            })?),
            _ => None,
        };

        batch.push(TransactionRecord::new(amount, category, timestamp));
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_amount_alias_priority() {
        // Both Debit and Amount present: Amount wins
        let csv = "Debit,Amount\n1.00,2.50\n";
        let batch = parse_batch(csv.as_bytes()).unwrap();
        assert_eq!(batch[0].amount, 2.50);
    }

    #[test]
    fn test_debit_alias_accepted() {
        let csv = "Debit,Category\n-42.10,Dining\n";
        let batch = parse_batch(csv.as_bytes()).unwrap();
        assert_eq!(batch[0].amount, -42.10);
        assert_eq!(batch[0].category, "dining");
    }

    #[test]
    fn test_missing_amount_column_fails() {
        let csv = "Category,Date\nother,2024-01-01\n";
        let err = parse_batch(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::Parse(_)));
    }

    #[test]
    fn test_category_defaults_to_other() {
        let csv = "Amount,Category\n10.00,\n20.00,Groceries\n";
        let batch = parse_batch(csv.as_bytes()).unwrap();
        assert_eq!(batch[0].category, "other");
        assert_eq!(batch[1].category, "groceries");
    }

    #[test]
    fn test_missing_category_column_defaults() {
        let csv = "Amount\n10.00\n";
        let batch = parse_batch(csv.as_bytes()).unwrap();
        assert_eq!(batch[0].category, "other");
    }

    #[test]
    fn test_timestamp_formats() {
        let csv = "Amount,Date\n1.00,2024-03-20 14:30:00\n2.00,2024-03-21\n";
        let batch = parse_batch(csv.as_bytes()).unwrap();
        assert_eq!(
            batch[0].timestamp,
            NaiveDate::from_ymd_opt(2024, 3, 20)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap()
        );
        assert_eq!(
            batch[1].timestamp,
            NaiveDate::from_ymd_opt(2024, 3, 21)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_transaction_date_alias() {
        let csv = "Transaction Amount,Transaction Date\n5.00,2024-06-01\n";
        let batch = parse_batch(csv.as_bytes()).unwrap();
        assert_eq!(batch[0].amount, 5.00);
        assert_eq!(
            batch[0].timestamp.date(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
    }

    #[test]
    fn test_invalid_date_fails() {
        let csv = "Amount,Date\n1.00,03/20/2024\n";
        let err = parse_batch(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::Parse(_)));
    }

    #[test]
    fn test_annotations_default_and_are_never_read_from_csv() {
        let csv = "Amount,Flagged,Advice\n1.00,true,spend less\n";
        let batch = parse_batch(csv.as_bytes()).unwrap();
        assert!(!batch[0].flagged);
        assert!(batch[0].advice.is_none());
        assert!(batch[0].tags.is_empty());
    }

    #[test]
    fn test_new_normalizes_category() {
        let record = TransactionRecord::new(1.0, Some("  DINING "), None);
        assert_eq!(record.category, "dining");

        let record = TransactionRecord::new(1.0, Some("   "), None);
        assert_eq!(record.category, "other");

        let record = TransactionRecord::new(1.0, None, None);
        assert_eq!(record.category, "other");
    }
}
