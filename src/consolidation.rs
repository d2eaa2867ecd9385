// 🧮 Duplicate-ID Consolidator - Fold daily rows into one entry per streamer
//
// Input: reconciled gift-update records (duplicate sub-mode).
// Output: one entry per distinct valid id in first-seen order, followed by
// every invalid entry in original order.
//
// Sums are exact integer sums; the valid-day count is decided per row by
// ValidDayPolicy in the same fold. A row whose counters would overflow the
// running sum is rejected and joins the invalid tail instead.

use crate::parser::{ImportIssue, ParsedGiftUpdate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Minimum minutes for a row to count as an effective day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidDayPolicy {
    pub min_minutes: i64,
}

impl ValidDayPolicy {
    pub fn new(min_minutes: i64) -> Self {
        ValidDayPolicy { min_minutes }
    }

    pub fn counts(&self, minutes: i64) -> bool {
        minutes >= self.min_minutes
    }
}

impl Default for ValidDayPolicy {
    fn default() -> Self {
        ValidDayPolicy { min_minutes: 120 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Consolidator {
    pub policy: ValidDayPolicy,
}

impl Consolidator {
    pub fn new() -> Self {
        Consolidator::default()
    }

    pub fn with_policy(policy: ValidDayPolicy) -> Self {
        Consolidator { policy }
    }

    pub fn consolidate(&self, entries: Vec<ParsedGiftUpdate>) -> Vec<ParsedGiftUpdate> {
        let mut merged: Vec<ParsedGiftUpdate> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut invalid: Vec<ParsedGiftUpdate> = Vec::new();

        for entry in entries {
            if !entry.is_valid {
                invalid.push(entry);
                continue;
            }

            let valid_day = u32::from(self.policy.counts(entry.minutes));

            match index.get(&entry.streamer_id) {
                Some(&pos) => {
                    let acc = &mut merged[pos];
                    let sums = (
                        acc.luck_gifts.checked_add(entry.luck_gifts),
                        acc.exclusive_gifts.checked_add(entry.exclusive_gifts),
                        acc.minutes.checked_add(entry.minutes),
                    );

                    let (Some(luck), Some(exclusive), Some(minutes)) = sums else {
                        tracing::warn!(
                            "Line {}: counters for {} overflow, row rejected",
                            entry.line_number,
                            entry.streamer_id
                        );
                        invalid.push(entry.into_rejected(ImportIssue::ValueTooLarge));
                        continue;
                    };

                    acc.luck_gifts = luck;
                    acc.exclusive_gifts = exclusive;
                    acc.minutes = minutes;
                    acc.days_count = Some(acc.days_count.unwrap_or(1) + 1);
                    acc.valid_days_count = Some(acc.valid_days_count.unwrap_or(0) + valid_day);
                }
                None => {
                    index.insert(entry.streamer_id.clone(), merged.len());
                    merged.push(ParsedGiftUpdate {
                        days_count: Some(1),
                        valid_days_count: Some(valid_day),
                        ..entry
                    });
                }
            }
        }

        tracing::debug!(
            "Consolidated {} valid rows into {} entries ({} invalid kept)",
            merged.iter().filter_map(|e| e.days_count).sum::<u32>(),
            merged.len(),
            invalid.len()
        );

        merged.extend(invalid);
        merged
    }
}

/// Consolidate with the default 120-minute policy
pub fn consolidate_duplicates(entries: Vec<ParsedGiftUpdate>) -> Vec<ParsedGiftUpdate> {
    Consolidator::new().consolidate(entries)
}
