// 📸 Snapshot Entity - Closed period of streamer metrics
//
// A snapshot is an immutable value: the per-streamer counters at capture
// time plus precomputed USD totals. Dashboards aggregate several snapshots.

use super::streamer::Streamer;
use crate::error::LedgerError;
use crate::metrics::{calculate_agency_usd, calculate_host_usd, saturating_total};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// PERIOD TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Weekly,
    Monthly,
    Yearly,
    Custom,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Weekly => "weekly",
            PeriodType::Monthly => "monthly",
            PeriodType::Yearly => "yearly",
            PeriodType::Custom => "custom",
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" | "semanal" => Ok(PeriodType::Weekly),
            "monthly" | "mensal" => Ok(PeriodType::Monthly),
            "yearly" | "anual" => Ok(PeriodType::Yearly),
            "custom" | "personalizado" => Ok(PeriodType::Custom),
            other => Err(LedgerError::InvalidInput(format!(
                "Unknown period type: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// SNAPSHOT DATA
// ============================================================================

/// One streamer's counters frozen inside a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamerSnapshotData {
    pub streamer_id: String,
    pub name: String,
    pub luck_gifts: i64,
    pub exclusive_gifts: i64,
    pub host_crystals: i64,
    pub host_usd: f64,
    pub agency_usd: f64,
    pub minutes: i64,
    pub effective_days: i64,
}

impl From<&Streamer> for StreamerSnapshotData {
    fn from(s: &Streamer) -> Self {
        StreamerSnapshotData {
            streamer_id: s.streamer_id.clone(),
            name: s.name.clone(),
            luck_gifts: s.luck_gifts,
            exclusive_gifts: s.exclusive_gifts,
            host_crystals: s.host_crystals,
            host_usd: calculate_host_usd(s.host_crystals),
            agency_usd: calculate_agency_usd(s.host_crystals),
            minutes: s.minutes,
            effective_days: s.effective_days,
        }
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub period_type: PeriodType,
    pub period_label: String,
    pub snapshot_date: NaiveDate,
    pub data: Vec<StreamerSnapshotData>,
    pub total_crystals: i64,
    pub total_host_usd: f64,
    pub total_agency_usd: f64,
    pub streamer_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Snapshot contents before the store assigns identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSnapshot {
    pub period_type: PeriodType,
    pub period_label: String,
    pub snapshot_date: NaiveDate,
    pub data: Vec<StreamerSnapshotData>,
    pub total_crystals: i64,
    pub total_host_usd: f64,
    pub total_agency_usd: f64,
    pub streamer_count: usize,
}

impl NewSnapshot {
    /// Freeze the current streamer counters into a period snapshot
    pub fn capture(
        period_type: PeriodType,
        period_label: impl Into<String>,
        snapshot_date: NaiveDate,
        streamers: &[Streamer],
    ) -> Self {
        let data: Vec<StreamerSnapshotData> =
            streamers.iter().map(StreamerSnapshotData::from).collect();

        NewSnapshot {
            period_type,
            period_label: period_label.into(),
            snapshot_date,
            total_crystals: saturating_total(streamers.iter().map(|s| s.host_crystals)),
            total_host_usd: streamers.iter().map(|s| calculate_host_usd(s.host_crystals)).sum(),
            total_agency_usd: streamers
                .iter()
                .map(|s| calculate_agency_usd(s.host_crystals))
                .sum(),
            streamer_count: streamers.len(),
            data,
        }
    }
}

impl Snapshot {
    /// Stored snapshot fixture labelled with its date
    #[cfg(test)]
    pub(crate) fn sample(period_type: PeriodType, snapshot_date: NaiveDate, streamers: &[Streamer]) -> Self {
        let new = NewSnapshot::capture(period_type, snapshot_date.to_string(), snapshot_date, streamers);
        Snapshot {
            id: uuid::Uuid::new_v4().to_string(),
            period_type: new.period_type,
            period_label: new.period_label,
            snapshot_date: new.snapshot_date,
            data: new.data,
            total_crystals: new.total_crystals,
            total_host_usd: new.total_host_usd,
            total_agency_usd: new.total_agency_usd,
            streamer_count: new.streamer_count,
            created_at: Utc::now(),
        }
    }
}
