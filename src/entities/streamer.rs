// 🎙️ Streamer Entity - Profile with gift/time counters
//
// Identity: `id` (UUID, assigned by the store)
// Business key: `streamer_id` (platform id, opaque string, unique)

use crate::metrics::{calculate_agency_usd, calculate_host_usd, parse_formatted_number};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// STREAMER REF
// ============================================================================

/// Minimal identity used for duplicate checks against existing records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamerRef {
    pub name: String,
    pub streamer_id: String,
}

impl StreamerRef {
    pub fn new(name: impl Into<String>, streamer_id: impl Into<String>) -> Self {
        StreamerRef {
            name: name.into(),
            streamer_id: streamer_id.into(),
        }
    }
}

impl From<&Streamer> for StreamerRef {
    fn from(s: &Streamer) -> Self {
        StreamerRef::new(s.name.clone(), s.streamer_id.clone())
    }
}

// ============================================================================
// STREAMER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Streamer {
    /// Stable identity (UUID)
    pub id: String,

    pub streamer_id: String,
    pub name: String,

    pub luck_gifts: i64,
    pub exclusive_gifts: i64,
    pub host_crystals: i64,
    pub minutes: i64,
    pub effective_days: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Streamer {
    pub fn host_usd(&self) -> f64 {
        calculate_host_usd(self.host_crystals)
    }

    pub fn agency_usd(&self) -> f64 {
        calculate_agency_usd(self.host_crystals)
    }

    /// Editable values of this profile, for read-modify-write updates
    pub fn draft(&self) -> StreamerDraft {
        StreamerDraft {
            streamer_id: self.streamer_id.clone(),
            name: self.name.clone(),
            luck_gifts: self.luck_gifts,
            exclusive_gifts: self.exclusive_gifts,
            host_crystals: self.host_crystals,
            minutes: self.minutes,
            effective_days: self.effective_days,
        }
    }

    /// Fixture with zeroed counters except crystals
    #[cfg(test)]
    pub(crate) fn sample(name: &str, streamer_id: &str, host_crystals: i64) -> Self {
        let now = Utc::now();
        Streamer {
            id: uuid::Uuid::new_v4().to_string(),
            streamer_id: streamer_id.to_string(),
            name: name.to_string(),
            luck_gifts: 0,
            exclusive_gifts: 0,
            host_crystals,
            minutes: 0,
            effective_days: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Case-insensitive search on name or streamer id
    pub fn matches_query(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self.streamer_id.to_lowercase().contains(&query)
    }
}

/// Keep the streamers matching a search box query
pub fn filter_streamers<'a>(streamers: &'a [Streamer], query: &str) -> Vec<&'a Streamer> {
    streamers.iter().filter(|s| s.matches_query(query)).collect()
}

// ============================================================================
// STREAMER DRAFT (create / update payload)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamerDraft {
    pub streamer_id: String,
    pub name: String,
    #[serde(default)]
    pub luck_gifts: i64,
    #[serde(default)]
    pub exclusive_gifts: i64,
    #[serde(default)]
    pub host_crystals: i64,
    #[serde(default)]
    pub minutes: i64,
    #[serde(default)]
    pub effective_days: i64,
}

impl StreamerDraft {
    /// New profile from a registration line: identity only, counters zeroed
    pub fn registration(name: impl Into<String>, streamer_id: impl Into<String>) -> Self {
        StreamerDraft {
            streamer_id: streamer_id.into(),
            name: name.into(),
            luck_gifts: 0,
            exclusive_gifts: 0,
            host_crystals: 0,
            minutes: 0,
            effective_days: 0,
        }
    }

    /// Build from raw form fields as typed by a user ("15.000", "$2,000")
    pub fn from_form(form: &StreamerForm) -> Self {
        StreamerDraft {
            streamer_id: form.streamer_id.trim().to_string(),
            name: form.name.trim().to_string(),
            luck_gifts: parse_formatted_number(&form.luck_gifts),
            exclusive_gifts: parse_formatted_number(&form.exclusive_gifts),
            host_crystals: parse_formatted_number(&form.host_crystals),
            minutes: parse_formatted_number(&form.minutes),
            effective_days: form.effective_days.trim().parse().unwrap_or(0),
        }
    }
}

/// Unparsed form input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamerForm {
    pub streamer_id: String,
    pub name: String,
    #[serde(default)]
    pub luck_gifts: String,
    #[serde(default)]
    pub exclusive_gifts: String,
    #[serde(default)]
    pub host_crystals: String,
    #[serde(default)]
    pub minutes: String,
    #[serde(default)]
    pub effective_days: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streamer_ref_from_streamer() {
        let s = Streamer::sample("Jub", "10597690", 0);
        let r = StreamerRef::from(&s);
        assert_eq!(r, StreamerRef::new("Jub", "10597690"));
    }

    #[test]
    fn test_usd_accessors() {
        let s = Streamer::sample("Jub", "10597690", 2_000_000);
        assert_eq!(s.host_usd(), 200.0);
        assert_eq!(s.agency_usd(), 20.0);
    }

    #[test]
    fn test_search_filter() {
        let streamers = vec![
            Streamer::sample("Rô Ramos", "10844565", 0),
            Streamer::sample("Cat", "10587003", 0),
        ];

        assert_eq!(filter_streamers(&streamers, "").len(), 2);
        assert_eq!(filter_streamers(&streamers, "RÔ")[0].name, "Rô Ramos");
        assert_eq!(filter_streamers(&streamers, "10587")[0].name, "Cat");
        assert!(filter_streamers(&streamers, "zzz").is_empty());
    }

    #[test]
    fn test_draft_from_form() {
        let form = StreamerForm {
            streamer_id: " 10597690 ".to_string(),
            name: "Jubscreuza".to_string(),
            luck_gifts: "15.000".to_string(),
            exclusive_gifts: "8,000".to_string(),
            host_crystals: "".to_string(),
            minutes: "1500".to_string(),
            effective_days: "x".to_string(),
        };

        let draft = StreamerDraft::from_form(&form);
        assert_eq!(draft.streamer_id, "10597690");
        assert_eq!(draft.luck_gifts, 15000);
        assert_eq!(draft.exclusive_gifts, 8000);
        assert_eq!(draft.host_crystals, 0);
        assert_eq!(draft.minutes, 1500);
        assert_eq!(draft.effective_days, 0);
    }
}
