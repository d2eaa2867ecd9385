// 📈 Dashboard - Totals from live profiles or from saved snapshots

use crate::entities::{Snapshot, Streamer, StreamerSnapshotData};
use crate::metrics::{format_currency, format_number, saturating_total};
use crate::temporal::{filter_by_year, MONTH_ABBREVIATIONS};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_crystals: i64,
    pub total_luck_gifts: i64,
    pub total_exclusive_gifts: i64,
    pub total_host_usd: f64,
    pub total_agency_usd: f64,
    pub streamer_count: usize,
    pub streamers: Vec<StreamerSnapshotData>,
}

impl DashboardStats {
    fn from_rows(streamers: Vec<StreamerSnapshotData>) -> Self {
        DashboardStats {
            total_crystals: saturating_total(streamers.iter().map(|s| s.host_crystals)),
            total_luck_gifts: saturating_total(streamers.iter().map(|s| s.luck_gifts)),
            total_exclusive_gifts: saturating_total(streamers.iter().map(|s| s.exclusive_gifts)),
            total_host_usd: streamers.iter().map(|s| s.host_usd).sum(),
            total_agency_usd: streamers.iter().map(|s| s.agency_usd).sum(),
            streamer_count: streamers.len(),
            streamers,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} streamers | {} cristais | Host {} | Agência {}",
            self.streamer_count,
            format_number(self.total_crystals),
            format_currency(self.total_host_usd),
            format_currency(self.total_agency_usd)
        )
    }
}

/// Current-period view straight from the live profiles
pub fn realtime_stats(streamers: &[Streamer]) -> DashboardStats {
    DashboardStats::from_rows(streamers.iter().map(StreamerSnapshotData::from).collect())
}

/// Combine several snapshots, summing per streamer id in first-seen order.
///
/// USD values are summed as stored, not recomputed from crystals. Integer
/// counters saturate at `i64::MAX`.
pub fn aggregate_snapshots<'a, I>(snapshots: I) -> DashboardStats
where
    I: IntoIterator<Item = &'a Snapshot>,
{
    let mut rows: Vec<StreamerSnapshotData> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in snapshots.into_iter().flat_map(|s| s.data.iter()) {
        match index.get(&row.streamer_id) {
            Some(&pos) => {
                let acc = &mut rows[pos];
                acc.luck_gifts = acc.luck_gifts.saturating_add(row.luck_gifts);
                acc.exclusive_gifts = acc.exclusive_gifts.saturating_add(row.exclusive_gifts);
                acc.host_crystals = acc.host_crystals.saturating_add(row.host_crystals);
                acc.host_usd += row.host_usd;
                acc.agency_usd += row.agency_usd;
                acc.minutes = acc.minutes.saturating_add(row.minutes);
                acc.effective_days = acc.effective_days.saturating_add(row.effective_days);
            }
            None => {
                index.insert(row.streamer_id.clone(), rows.len());
                rows.push(row.clone());
            }
        }
    }

    DashboardStats::from_rows(rows)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyGrowth {
    pub month: String,
    pub revenue: f64,
    pub agency: f64,
}

/// Jan..Dez host/agency totals of one year's snapshots; empty months are zero
pub fn monthly_growth(snapshots: &[Snapshot], year: i32) -> Vec<MonthlyGrowth> {
    let mut months: Vec<MonthlyGrowth> = MONTH_ABBREVIATIONS
        .iter()
        .map(|name| MonthlyGrowth {
            month: name.to_string(),
            revenue: 0.0,
            agency: 0.0,
        })
        .collect();

    for snapshot in filter_by_year(snapshots, year) {
        let slot = &mut months[snapshot.snapshot_date.month0() as usize];
        slot.revenue += snapshot.total_host_usd;
        slot.agency += snapshot.total_agency_usd;
    }

    months
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PeriodType;
    use chrono::NaiveDate;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    #[test]
    fn test_realtime_stats() {
        let mut jub = Streamer::sample("Jub", "10597690", 1_000_000);
        jub.luck_gifts = 10;
        let cat = Streamer::sample("Cat", "10587003", 500_000);

        let stats = realtime_stats(&[jub, cat]);

        assert_eq!(stats.streamer_count, 2);
        assert_eq!(stats.total_crystals, 1_500_000);
        assert_eq!(stats.total_luck_gifts, 10);
        assert_eq!(stats.total_host_usd, 150.0);
        assert_eq!(stats.total_agency_usd, 15.0);
        assert_eq!(stats.streamers[1].name, "Cat");

        println!("✅ {}", stats.summary());
    }

    #[test]
    fn test_aggregate_by_streamer_id() {
        let week1 = Snapshot::sample(
            PeriodType::Weekly,
            date(3, 7),
            &[
                Streamer::sample("Jub", "10597690", 100_000),
                Streamer::sample("Cat", "10587003", 20_000),
            ],
        );
        // Renamed between weeks: first-seen name wins
        let week2 = Snapshot::sample(
            PeriodType::Weekly,
            date(3, 14),
            &[
                Streamer::sample("Luh", "10702736", 5_000),
                Streamer::sample("Jubscreuza", "10597690", 300_000),
            ],
        );

        let stats = aggregate_snapshots(&[week1, week2]);

        let ids: Vec<&str> = stats.streamers.iter().map(|s| s.streamer_id.as_str()).collect();
        assert_eq!(ids, vec!["10597690", "10587003", "10702736"]);
        assert_eq!(stats.streamers[0].name, "Jub");
        assert_eq!(stats.streamers[0].host_crystals, 400_000);
        assert_eq!(stats.streamers[0].host_usd, 40.0);
        assert_eq!(stats.total_crystals, 425_000);
        assert_eq!(stats.streamer_count, 3);
    }

    #[test]
    fn test_aggregate_saturates_large_counters() {
        let huge = Streamer::sample("Jub", "10597690", i64::MAX);
        let week1 = Snapshot::sample(PeriodType::Weekly, date(3, 7), &[huge.clone()]);
        let week2 = Snapshot::sample(PeriodType::Weekly, date(3, 14), &[huge.clone()]);

        let stats = aggregate_snapshots(&[week1, week2]);
        assert_eq!(stats.streamers[0].host_crystals, i64::MAX);
        assert_eq!(stats.total_crystals, i64::MAX);

        let live = realtime_stats(&[huge, Streamer::sample("Cat", "10587003", 1)]);
        assert_eq!(live.total_crystals, i64::MAX);
    }

    #[test]
    fn test_aggregate_nothing() {
        assert_eq!(aggregate_snapshots(&[]), DashboardStats::default());
    }

    #[test]
    fn test_monthly_growth() {
        let crystals = [Streamer::sample("Jub", "10597690", 1_000_000)];
        let snapshots = vec![
            Snapshot::sample(PeriodType::Weekly, date(1, 7), &crystals),
            Snapshot::sample(PeriodType::Weekly, date(1, 14), &crystals),
            Snapshot::sample(PeriodType::Monthly, date(3, 31), &crystals),
            Snapshot::sample(
                PeriodType::Monthly,
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                &crystals,
            ),
        ];

        let growth = monthly_growth(&snapshots, 2025);

        assert_eq!(growth.len(), 12);
        assert_eq!(growth[0].month, "Jan");
        assert_eq!(growth[0].revenue, 200.0);
        assert_eq!(growth[0].agency, 20.0);
        assert_eq!(growth[1].revenue, 0.0);
        assert_eq!(growth[2].revenue, 100.0);
        assert_eq!(growth[11].month, "Dez");
    }
}
