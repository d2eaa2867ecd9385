// ⏰ Period Calendar - Month keys, labels and snapshot filters
//
// Snapshots are grouped by calendar month ("2025-03") and year ("2025").
// Labels are pt-BR: "Março 2025", "Semana 2 – Março 2025".

use crate::entities::{PeriodType, Snapshot};
use crate::error::{LedgerError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const MONTH_NAMES: [&str; 12] = [
    "Janeiro", "Fevereiro", "Março", "Abril", "Maio", "Junho", "Julho", "Agosto", "Setembro",
    "Outubro", "Novembro", "Dezembro",
];

pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

/// Select-box option: machine value plus display label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodOption {
    pub value: String,
    pub label: String,
}

pub fn month_name(date: NaiveDate) -> &'static str {
    MONTH_NAMES[date.month0() as usize]
}

/// "YYYY-MM"
pub fn month_key(date: NaiveDate) -> String {
    format!("{}-{:02}", date.year(), date.month())
}

/// "Março 2025"
pub fn month_label(date: NaiveDate) -> String {
    format!("{} {}", month_name(date), date.year())
}

/// Week of the month counted in 7-day blocks from day 1
pub fn week_of_month(date: NaiveDate) -> u32 {
    date.day().div_ceil(7)
}

/// Label proposed when saving a snapshot; custom periods have none
pub fn default_period_label(period_type: PeriodType, date: NaiveDate) -> Option<String> {
    match period_type {
        PeriodType::Weekly => Some(format!(
            "Semana {} – {}",
            week_of_month(date),
            month_label(date)
        )),
        PeriodType::Monthly => Some(month_label(date)),
        PeriodType::Yearly => Some(date.year().to_string()),
        PeriodType::Custom => None,
    }
}

/// Explicit label if given, else the default for the period type
pub fn resolve_period_label(
    period_type: PeriodType,
    label: Option<&str>,
    date: NaiveDate,
) -> Result<String> {
    let label = match label.map(str::trim).filter(|l| !l.is_empty()) {
        Some(l) => l.to_string(),
        None => default_period_label(period_type, date).ok_or_else(|| {
            LedgerError::InvalidInput("Custom snapshots need a period label".to_string())
        })?,
    };
    Ok(label)
}

// ============================================================================
// SNAPSHOT FILTERS
// ============================================================================

/// Months with at least one snapshot, most recent first
pub fn available_months(snapshots: &[Snapshot]) -> Vec<PeriodOption> {
    let months: BTreeMap<String, String> = snapshots
        .iter()
        .map(|s| (month_key(s.snapshot_date), month_label(s.snapshot_date)))
        .collect();

    months
        .into_iter()
        .rev()
        .map(|(value, label)| PeriodOption { value, label })
        .collect()
}

/// Years with at least one snapshot, most recent first
pub fn available_years(snapshots: &[Snapshot]) -> Vec<PeriodOption> {
    let years: BTreeSet<i32> = snapshots.iter().map(|s| s.snapshot_date.year()).collect();

    years
        .into_iter()
        .rev()
        .map(|year| PeriodOption {
            value: year.to_string(),
            label: year.to_string(),
        })
        .collect()
}

pub fn filter_by_month<'a>(snapshots: &'a [Snapshot], key: &str) -> Vec<&'a Snapshot> {
    snapshots
        .iter()
        .filter(|s| month_key(s.snapshot_date) == key)
        .collect()
}

pub fn filter_by_year(snapshots: &[Snapshot], year: i32) -> Vec<&Snapshot> {
    snapshots
        .iter()
        .filter(|s| s.snapshot_date.year() == year)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshot_on(d: NaiveDate) -> Snapshot {
        Snapshot::sample(PeriodType::Custom, d, &[])
    }

    #[test]
    fn test_default_labels() {
        let d = date(2025, 3, 15);
        assert_eq!(
            default_period_label(PeriodType::Weekly, d).as_deref(),
            Some("Semana 3 – Março 2025")
        );
        assert_eq!(default_period_label(PeriodType::Monthly, d).as_deref(), Some("Março 2025"));
        assert_eq!(default_period_label(PeriodType::Yearly, d).as_deref(), Some("2025"));
        assert_eq!(default_period_label(PeriodType::Custom, d), None);
    }

    #[test]
    fn test_week_of_month_boundaries() {
        assert_eq!(week_of_month(date(2025, 1, 1)), 1);
        assert_eq!(week_of_month(date(2025, 1, 7)), 1);
        assert_eq!(week_of_month(date(2025, 1, 8)), 2);
        assert_eq!(week_of_month(date(2025, 1, 31)), 5);
    }

    #[test]
    fn test_resolve_label() {
        let d = date(2025, 12, 1);
        assert_eq!(resolve_period_label(PeriodType::Monthly, None, d).unwrap(), "Dezembro 2025");
        assert_eq!(
            resolve_period_label(PeriodType::Monthly, Some(" Fechamento "), d).unwrap(),
            "Fechamento"
        );
        assert!(resolve_period_label(PeriodType::Custom, Some("   "), d).is_err());
    }

    #[test]
    fn test_available_months_and_years() {
        let snapshots = vec![
            snapshot_on(date(2024, 12, 31)),
            snapshot_on(date(2025, 3, 7)),
            snapshot_on(date(2025, 3, 14)),
            snapshot_on(date(2025, 1, 5)),
        ];

        let months = available_months(&snapshots);
        let values: Vec<&str> = months.iter().map(|m| m.value.as_str()).collect();
        assert_eq!(values, vec!["2025-03", "2025-01", "2024-12"]);
        assert_eq!(months[0].label, "Março 2025");

        let years = available_years(&snapshots);
        assert_eq!(years[0].value, "2025");
        assert_eq!(years[1].label, "2024");

        assert_eq!(filter_by_month(&snapshots, "2025-03").len(), 2);
        assert_eq!(filter_by_year(&snapshots, 2024).len(), 1);
        assert!(filter_by_month(&snapshots, "2023-01").is_empty());
    }
}
