//! Shapes returned by the ledger's read side.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{LedgerError, LedgerResult, ProductId};

use crate::movement::Movement;
use crate::product::Price;

/// One row of the best-sellers ranking (total EXIT quantity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopSeller {
    pub product_id: ProductId,
    pub name: String,
    pub category: String,
    pub price: Price,
    /// Zero for products that never left the warehouse.
    pub total_sold: i64,
}

/// Stock aggregated per category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStock {
    pub category: String,
    pub product_count: i64,
    pub total_stock: i64,
}

/// A movement joined with the product it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementReportRow {
    pub movement: Movement,
    pub product_name: String,
    pub category: String,
}

/// Per-product ledger totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerBalance {
    pub entries: i64,
    pub exits: i64,
}

impl LedgerBalance {
    /// Net stock change recorded by the ledger (excludes the creation baseline).
    pub fn net(&self) -> i64 {
        self.entries - self.exits
    }
}

/// Inclusive calendar-date range, compared against UTC timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Parse two `YYYY-MM-DD` dates. Malformed or impossible dates fail with
    /// `InvalidDateFormat`. `start > end` is allowed and matches nothing.
    pub fn parse(start: &str, end: &str) -> LedgerResult<Self> {
        Ok(Self {
            start: parse_day(start)?,
            end: parse_day(end)?,
        })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.start <= day && day <= self.end
    }
}

fn parse_day(raw: &str) -> LedgerResult<NaiveDate> {
    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return Err(LedgerError::InvalidDateFormat(raw.to_string()));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| LedgerError::InvalidDateFormat(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_well_formed_dates() {
        let range = DateRange::parse("2024-01-01", "2024-12-31").unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn rejects_malformed_dates() {
        for bad in ["2024-1-01", "24-01-01", "2024/01/01", "2024-02-30", "", "2024-01-01T00"] {
            assert_eq!(
                DateRange::parse(bad, "2024-12-31"),
                Err(LedgerError::InvalidDateFormat(bad.to_string())),
                "{bad}"
            );
        }
        assert!(DateRange::parse("2024-01-01", "2024-13-01").is_err());
    }

    #[test]
    fn contains_is_inclusive_on_both_ends() {
        let range = DateRange::parse("2024-03-01", "2024-03-02").unwrap();
        let first = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let last = Utc.with_ymd_and_hms(2024, 3, 2, 23, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap();
        assert!(range.contains(first));
        assert!(range.contains(last));
        assert!(!range.contains(after));
    }

    #[test]
    fn reversed_range_matches_nothing() {
        let range = DateRange::parse("2024-03-05", "2024-03-01").unwrap();
        let inside = Utc.with_ymd_and_hms(2024, 3, 3, 12, 0, 0).unwrap();
        assert!(!range.contains(inside));
    }

    #[test]
    fn balance_net_is_entries_minus_exits() {
        let balance = LedgerBalance { entries: 15, exits: 20 };
        assert_eq!(balance.net(), -5);
    }
}
