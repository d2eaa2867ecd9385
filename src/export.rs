// 📤 Export - Text block, spreadsheet rows and CSV for closing reports
//
// Field order is fixed (see ExportField::ALL); options only switch fields
// on and off. Values are pre-formatted pt-BR strings, as pasted into chats
// and spreadsheets by the agency.

use crate::entities::{Streamer, StreamerSnapshotData};
use crate::error::{LedgerError, Result};
use crate::metrics::{
    calculate_agency_usd, calculate_host_usd, format_currency, format_minutes_to_hours,
    format_number,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::io;
use std::str::FromStr;

// ============================================================================
// EXPORT RECORD
// ============================================================================

/// The counters an export row needs, from a live profile or a snapshot row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub name: String,
    pub streamer_id: String,
    pub luck_gifts: i64,
    pub exclusive_gifts: i64,
    pub host_crystals: i64,
    pub minutes: i64,
    pub effective_days: i64,
}

impl From<&Streamer> for ExportRecord {
    fn from(s: &Streamer) -> Self {
        ExportRecord {
            name: s.name.clone(),
            streamer_id: s.streamer_id.clone(),
            luck_gifts: s.luck_gifts,
            exclusive_gifts: s.exclusive_gifts,
            host_crystals: s.host_crystals,
            minutes: s.minutes,
            effective_days: s.effective_days,
        }
    }
}

impl From<&StreamerSnapshotData> for ExportRecord {
    fn from(s: &StreamerSnapshotData) -> Self {
        ExportRecord {
            name: s.name.clone(),
            streamer_id: s.streamer_id.clone(),
            luck_gifts: s.luck_gifts,
            exclusive_gifts: s.exclusive_gifts,
            host_crystals: s.host_crystals,
            minutes: s.minutes,
            effective_days: s.effective_days,
        }
    }
}

// ============================================================================
// FIELDS + OPTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportField {
    Ranking,
    Name,
    Id,
    ExclusiveGifts,
    HostUsd,
    AgencyUsd,
    HostCrystals,
    LuckGifts,
    Hours,
    Days,
}

impl ExportField {
    /// Column order of every export
    pub const ALL: [ExportField; 10] = [
        ExportField::Ranking,
        ExportField::Name,
        ExportField::Id,
        ExportField::ExclusiveGifts,
        ExportField::HostUsd,
        ExportField::AgencyUsd,
        ExportField::HostCrystals,
        ExportField::LuckGifts,
        ExportField::Hours,
        ExportField::Days,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ExportField::Ranking => "Ranking",
            ExportField::Name => "Nome",
            ExportField::Id => "ID",
            ExportField::ExclusiveGifts => "Exclusivos",
            ExportField::HostUsd => "Host $",
            ExportField::AgencyUsd => "Agência $",
            ExportField::HostCrystals => "Cristais",
            ExportField::LuckGifts => "Sorte",
            ExportField::Hours => "Horas",
            ExportField::Days => "Dias",
        }
    }

    /// Formatted cell; `index` is the 0-based position in the export
    pub fn value(&self, record: &ExportRecord, index: usize) -> String {
        match self {
            ExportField::Ranking => (index + 1).to_string(),
            ExportField::Name => record.name.clone(),
            ExportField::Id => record.streamer_id.clone(),
            ExportField::ExclusiveGifts => format_number(record.exclusive_gifts),
            ExportField::HostUsd => format_currency(calculate_host_usd(record.host_crystals)),
            ExportField::AgencyUsd => format_currency(calculate_agency_usd(record.host_crystals)),
            ExportField::HostCrystals => format_number(record.host_crystals),
            ExportField::LuckGifts => format_number(record.luck_gifts),
            ExportField::Hours => format_minutes_to_hours(record.minutes),
            ExportField::Days => record.effective_days.to_string(),
        }
    }
}

impl FromStr for ExportField {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ranking" | "rank" => Ok(ExportField::Ranking),
            "name" | "nome" => Ok(ExportField::Name),
            "id" | "streamer_id" => Ok(ExportField::Id),
            "exclusive" | "exclusive_gifts" | "exclusivos" => Ok(ExportField::ExclusiveGifts),
            "host_usd" | "host" => Ok(ExportField::HostUsd),
            "agency_usd" | "agency" => Ok(ExportField::AgencyUsd),
            "crystals" | "host_crystals" | "cristais" => Ok(ExportField::HostCrystals),
            "luck" | "luck_gifts" | "sorte" => Ok(ExportField::LuckGifts),
            "hours" | "horas" => Ok(ExportField::Hours),
            "days" | "dias" => Ok(ExportField::Days),
            other => Err(LedgerError::InvalidInput(format!("Unknown export field: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub include_ranking: bool,
    pub include_name: bool,
    pub include_id: bool,
    pub include_luck_gifts: bool,
    pub include_exclusive_gifts: bool,
    pub include_host_crystals: bool,
    pub include_host_usd: bool,
    pub include_agency_usd: bool,
    pub include_hours: bool,
    pub include_days: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions::only(&ExportField::ALL)
    }
}

impl ExportOptions {
    /// Options with exactly these fields switched on
    pub fn only(fields: &[ExportField]) -> Self {
        let on = |f: ExportField| fields.contains(&f);
        ExportOptions {
            include_ranking: on(ExportField::Ranking),
            include_name: on(ExportField::Name),
            include_id: on(ExportField::Id),
            include_luck_gifts: on(ExportField::LuckGifts),
            include_exclusive_gifts: on(ExportField::ExclusiveGifts),
            include_host_crystals: on(ExportField::HostCrystals),
            include_host_usd: on(ExportField::HostUsd),
            include_agency_usd: on(ExportField::AgencyUsd),
            include_hours: on(ExportField::Hours),
            include_days: on(ExportField::Days),
        }
    }

    pub fn includes(&self, field: ExportField) -> bool {
        match field {
            ExportField::Ranking => self.include_ranking,
            ExportField::Name => self.include_name,
            ExportField::Id => self.include_id,
            ExportField::ExclusiveGifts => self.include_exclusive_gifts,
            ExportField::HostUsd => self.include_host_usd,
            ExportField::AgencyUsd => self.include_agency_usd,
            ExportField::HostCrystals => self.include_host_crystals,
            ExportField::LuckGifts => self.include_luck_gifts,
            ExportField::Hours => self.include_hours,
            ExportField::Days => self.include_days,
        }
    }

    /// Switched-on fields in column order
    pub fn active_fields(&self) -> Vec<ExportField> {
        ExportField::ALL
            .into_iter()
            .filter(|f| self.includes(*f))
            .collect()
    }
}

// ============================================================================
// RENDERERS
// ============================================================================

const BLOCK_SEPARATOR: &str = "------------------------";

/// One block per streamer, headed by its name, for pasting into chats
pub fn format_text_block(records: &[ExportRecord], options: &ExportOptions) -> String {
    let fields = options.active_fields();
    let mut lines: Vec<String> = Vec::new();

    for (index, record) in records.iter().enumerate() {
        lines.push(format!("Streamer: {}", record.name));
        for field in fields.iter().filter(|f| **f != ExportField::Name) {
            lines.push(format!("{}: {}", field.label(), field.value(record, index)));
        }
        lines.push(BLOCK_SEPARATOR.to_string());
    }

    lines.join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadsheetPreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn spreadsheet_preview(records: &[ExportRecord], options: &ExportOptions) -> SpreadsheetPreview {
    let fields = options.active_fields();

    SpreadsheetPreview {
        headers: fields.iter().map(|f| f.label().to_string()).collect(),
        rows: records
            .iter()
            .enumerate()
            .map(|(index, record)| fields.iter().map(|f| f.value(record, index)).collect())
            .collect(),
    }
}

/// Header row plus one row per record
pub fn write_csv<W: io::Write>(writer: W, records: &[ExportRecord], options: &ExportOptions) -> Result<()> {
    let preview = spreadsheet_preview(records, options);
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(&preview.headers)?;
    for row in &preview.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_csv_string(records: &[ExportRecord], options: &ExportOptions) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, records, options)?;
    String::from_utf8(buffer).map_err(|e| LedgerError::InvalidInput(e.to_string()))
}

// ============================================================================
// SORTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    StreamerId,
    LuckGifts,
    ExclusiveGifts,
    #[default]
    HostCrystals,
    HostUsd,
    AgencyUsd,
    Minutes,
    EffectiveDays,
}

impl FromStr for SortField {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(SortField::Name),
            "streamer_id" | "id" => Ok(SortField::StreamerId),
            "luck_gifts" | "luck" => Ok(SortField::LuckGifts),
            "exclusive_gifts" | "exclusive" => Ok(SortField::ExclusiveGifts),
            "host_crystals" | "crystals" => Ok(SortField::HostCrystals),
            "host_usd" => Ok(SortField::HostUsd),
            "agency_usd" => Ok(SortField::AgencyUsd),
            "minutes" => Ok(SortField::Minutes),
            "effective_days" | "days" => Ok(SortField::EffectiveDays),
            other => Err(LedgerError::InvalidInput(format!("Unknown sort field: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn toggled(&self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        })
    }
}

impl FromStr for SortDirection {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(LedgerError::InvalidInput(format!("Unknown sort direction: {}", other))),
        }
    }
}

fn compare(a: &Streamer, b: &Streamer, field: SortField) -> Ordering {
    match field {
        SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortField::StreamerId => a.streamer_id.cmp(&b.streamer_id),
        SortField::LuckGifts => a.luck_gifts.cmp(&b.luck_gifts),
        SortField::ExclusiveGifts => a.exclusive_gifts.cmp(&b.exclusive_gifts),
        // USD values are monotonic in crystals
        SortField::HostCrystals | SortField::HostUsd | SortField::AgencyUsd => {
            a.host_crystals.cmp(&b.host_crystals)
        }
        SortField::Minutes => a.minutes.cmp(&b.minutes),
        SortField::EffectiveDays => a.effective_days.cmp(&b.effective_days),
    }
}

/// Stable sort; ties keep their current order in both directions
pub fn sort_streamers(streamers: &mut [Streamer], field: SortField, direction: SortDirection) {
    streamers.sort_by(|a, b| match direction {
        SortDirection::Asc => compare(a, b, field),
        SortDirection::Desc => compare(b, a, field),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, id: &str, crystals: i64) -> ExportRecord {
        ExportRecord {
            name: name.to_string(),
            streamer_id: id.to_string(),
            luck_gifts: 15_000,
            exclusive_gifts: 8_000,
            host_crystals: crystals,
            minutes: 135,
            effective_days: 3,
        }
    }

    #[test]
    fn test_default_options_all_fields_in_order() {
        let fields = ExportOptions::default().active_fields();
        assert_eq!(fields, ExportField::ALL.to_vec());

        let labels: Vec<&str> = fields.iter().map(|f| f.label()).collect();
        assert_eq!(
            labels,
            vec!["Ranking", "Nome", "ID", "Exclusivos", "Host $", "Agência $", "Cristais", "Sorte", "Horas", "Dias"]
        );
    }

    #[test]
    fn test_selection_keeps_fixed_order() {
        // Requested out of order; output follows the column order
        let options = ExportOptions::only(&[ExportField::Days, ExportField::Name, ExportField::HostUsd]);
        assert_eq!(
            options.active_fields(),
            vec![ExportField::Name, ExportField::HostUsd, ExportField::Days]
        );
    }

    #[test]
    fn test_text_block() {
        let records = vec![record("Jub", "10597690", 1_234_567), record("Cat", "10587003", 0)];
        let options = ExportOptions::only(&[ExportField::Ranking, ExportField::Name, ExportField::HostUsd]);

        let text = format_text_block(&records, &options);

        assert_eq!(
            text,
            "Streamer: Jub\nRanking: 1\nHost $: $123.46\n------------------------\n\
             Streamer: Cat\nRanking: 2\nHost $: $0.00\n------------------------"
        );
    }

    #[test]
    fn test_spreadsheet_preview_values() {
        let preview = spreadsheet_preview(&[record("Jub", "10597690", 2_000_000)], &ExportOptions::default());

        assert_eq!(preview.headers.len(), 10);
        assert_eq!(
            preview.rows[0],
            vec!["1", "Jub", "10597690", "8.000", "$200.00", "$20.00", "2.000.000", "15.000", "2:15", "3"]
        );
    }

    #[test]
    fn test_csv_output() {
        let options = ExportOptions::only(&[ExportField::Name, ExportField::HostCrystals]);
        let csv = to_csv_string(&[record("Silva, Ana", "10597690", 1_500)], &options).unwrap();

        assert_eq!(csv, "Nome,Cristais\n\"Silva, Ana\",1.500\n");
    }

    #[test]
    fn test_csv_to_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        write_csv(file.reopen().unwrap(), &[record("Jub", "10597690", 10)], &ExportOptions::default()).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.starts_with("Ranking,Nome,ID,"));
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_sort_streamers() {
        let mut streamers = vec![
            Streamer::sample("bia", "30000003", 500),
            Streamer::sample("Ana", "10000001", 900),
            Streamer::sample("Cau", "20000002", 100),
        ];

        sort_streamers(&mut streamers, SortField::HostCrystals, SortDirection::Desc);
        let names: Vec<&str> = streamers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "bia", "Cau"]);

        sort_streamers(&mut streamers, SortField::Name, SortDirection::Asc);
        let names: Vec<&str> = streamers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "bia", "Cau"], "case-insensitive");

        sort_streamers(&mut streamers, SortField::StreamerId, SortDirection::Desc);
        assert_eq!(streamers[0].streamer_id, "30000003");
    }

    #[test]
    fn test_parse_sort_and_fields() {
        assert_eq!("crystals".parse::<SortField>().unwrap(), SortField::HostCrystals);
        assert_eq!("ASC".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert_eq!(SortDirection::default().toggled(), SortDirection::Asc);
        assert_eq!("sorte".parse::<ExportField>().unwrap(), ExportField::LuckGifts);
        assert!("bogus".parse::<ExportField>().is_err());
    }
}
