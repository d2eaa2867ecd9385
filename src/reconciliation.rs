// ⚖️ Reconciliation Engine - Verdict per parsed line
//
// Two lookups decide every verdict:
//   1. the existing record snapshot (read-only)
//   2. earlier lines of the same batch
//
// No side effects: the output is an annotated copy of the input, one record
// per data line, in input order.

use crate::entities::StreamerRef;
use crate::error::LedgerError;
use crate::parser::{
    preview, GiftUpdateCandidate, ImportIssue, ParsedGiftUpdate, ParsedLine, ParsedRegistration,
    RegistrationCandidate,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// UPDATE SUB-MODE
// ============================================================================

/// How repeated ids inside one gift-update batch are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateSubMode {
    /// One row per streamer; repeats are rejected
    #[default]
    Unique,
    /// One row per streamer per day; repeats pass and are consolidated later
    Duplicate,
}

impl UpdateSubMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateSubMode::Unique => "unique",
            UpdateSubMode::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for UpdateSubMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateSubMode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unique" => Ok(UpdateSubMode::Unique),
            "duplicate" => Ok(UpdateSubMode::Duplicate),
            other => Err(LedgerError::InvalidInput(format!(
                "Unknown update sub-mode: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

pub struct Reconciler<'e> {
    /// streamer_id -> display name
    by_id: HashMap<&'e str, &'e str>,
    names: HashSet<&'e str>,

    /// Characters of a malformed line echoed back in its record
    pub preview_chars: usize,
}

impl<'e> Reconciler<'e> {
    pub fn new(existing: &'e [StreamerRef]) -> Self {
        Reconciler {
            by_id: existing
                .iter()
                .map(|s| (s.streamer_id.as_str(), s.name.as_str()))
                .collect(),
            names: existing.iter().map(|s| s.name.as_str()).collect(),
            preview_chars: 30,
        }
    }

    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars;
        self
    }

    /// Registration verdicts. Order of checks:
    /// name exists, id exists, name or id seen earlier in this batch.
    pub fn reconcile_registrations(
        &self,
        lines: Vec<ParsedLine<RegistrationCandidate>>,
    ) -> Vec<ParsedRegistration> {
        let mut batch_names: HashSet<String> = HashSet::new();
        let mut batch_ids: HashSet<String> = HashSet::new();

        lines
            .into_iter()
            .map(|line| {
                let Some(candidate) = line.candidate else {
                    // The echoed preview occupies its name for the rest of the batch
                    let name = preview(&line.raw, self.preview_chars);
                    batch_names.insert(name.clone());
                    return ParsedRegistration::rejected(
                        line.number,
                        name,
                        String::new(),
                        ImportIssue::InvalidFormat,
                    );
                };

                let issue = self.registration_issue(&candidate, &batch_names, &batch_ids);

                // Rejected lines still count as "seen": a later repeat is a batch duplicate
                batch_names.insert(candidate.name.clone());
                batch_ids.insert(candidate.streamer_id.clone());

                match issue {
                    None => ParsedRegistration::accepted(line.number, candidate),
                    Some(issue) => ParsedRegistration::rejected(
                        line.number,
                        candidate.name,
                        candidate.streamer_id,
                        issue,
                    ),
                }
            })
            .collect()
    }

    fn registration_issue(
        &self,
        candidate: &RegistrationCandidate,
        batch_names: &HashSet<String>,
        batch_ids: &HashSet<String>,
    ) -> Option<ImportIssue> {
        if self.names.contains(candidate.name.as_str()) {
            return Some(ImportIssue::NameExists(candidate.name.clone()));
        }
        if self.by_id.contains_key(candidate.streamer_id.as_str()) {
            return Some(ImportIssue::IdExists(candidate.streamer_id.clone()));
        }
        if batch_names.contains(&candidate.name) || batch_ids.contains(&candidate.streamer_id) {
            return Some(ImportIssue::DuplicateInBatch);
        }
        None
    }

    /// Gift-update verdicts; valid records carry the resolved streamer name
    pub fn reconcile_gift_updates(
        &self,
        lines: Vec<ParsedLine<GiftUpdateCandidate>>,
        sub_mode: UpdateSubMode,
    ) -> Vec<ParsedGiftUpdate> {
        let mut batch_ids: HashSet<String> = HashSet::new();

        lines
            .into_iter()
            .map(|line| {
                let Some(candidate) = line.candidate else {
                    return ParsedGiftUpdate::malformed(
                        line.number,
                        preview(&line.raw, self.preview_chars),
                    );
                };

                let Some(&name) = self.by_id.get(candidate.streamer_id.as_str()) else {
                    let issue = ImportIssue::IdNotFound(candidate.streamer_id.clone());
                    return ParsedGiftUpdate::rejected(line.number, candidate, issue);
                };

                let repeated = !batch_ids.insert(candidate.streamer_id.clone());
                if repeated && sub_mode == UpdateSubMode::Unique {
                    return ParsedGiftUpdate::rejected(
                        line.number,
                        candidate,
                        ImportIssue::DuplicateInBatch,
                    );
                }

                ParsedGiftUpdate::accepted(line.number, candidate, name.to_string())
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::IssueCategory;

    fn reg_line(number: usize, name: &str, id: &str) -> ParsedLine<RegistrationCandidate> {
        ParsedLine {
            number,
            raw: format!("{},{}", name, id),
            candidate: Some(RegistrationCandidate {
                name: name.to_string(),
                streamer_id: id.to_string(),
            }),
        }
    }

    fn gift_line(number: usize, id: &str, minutes: i64) -> ParsedLine<GiftUpdateCandidate> {
        ParsedLine {
            number,
            raw: format!("{},1,1,{}", id, minutes),
            candidate: Some(GiftUpdateCandidate {
                streamer_id: id.to_string(),
                luck_gifts: 1,
                exclusive_gifts: 1,
                minutes,
            }),
        }
    }

    fn existing() -> Vec<StreamerRef> {
        vec![StreamerRef::new("Ana", "10000001")]
    }

    #[test]
    fn test_registration_check_order() {
        let existing = existing();
        let reconciler = Reconciler::new(&existing);

        let records = reconciler.reconcile_registrations(vec![
            // Name and id both exist: name wins
            reg_line(1, "Ana", "10000001"),
            reg_line(2, "Bia", "10000001"),
            reg_line(3, "Cau", "20000002"),
            reg_line(4, "Cau", "30000003"),
            reg_line(5, "Duda", "20000002"),
        ]);

        assert_eq!(records[0].error.as_deref(), Some("Nome \"Ana\" já existe (ignorado)"));
        assert_eq!(records[1].error.as_deref(), Some("ID \"10000001\" já existe (ignorado)"));
        assert!(records[2].is_valid);
        assert_eq!(records[3].error.as_deref(), Some("Duplicado neste lote"));
        assert_eq!(records[4].issue, Some(IssueCategory::DuplicateInBatch));

        println!("✅ Registration verdicts: {:?}", records.iter().map(|r| r.is_valid).collect::<Vec<_>>());
    }

    #[test]
    fn test_rejected_line_still_marks_batch() {
        let existing = existing();
        let reconciler = Reconciler::new(&existing);

        // Line 1 is rejected for its name; its id is still taken for the batch
        let records = reconciler.reconcile_registrations(vec![
            reg_line(1, "Ana", "40000004"),
            reg_line(2, "Eva", "40000004"),
        ]);

        assert!(!records[0].is_valid);
        assert_eq!(records[1].error.as_deref(), Some("Duplicado neste lote"));
    }

    #[test]
    fn test_malformed_registration_echoes_preview() {
        let reconciler = Reconciler::new(&[]).with_preview_chars(5);
        let records = reconciler.reconcile_registrations(vec![ParsedLine {
            number: 7,
            raw: "nothing useful here".to_string(),
            candidate: None,
        }]);

        assert_eq!(records[0].name, "nothi");
        assert_eq!(records[0].streamer_id, "");
        assert_eq!(records[0].line_number, 7);
        assert_eq!(records[0].error.as_deref(), Some("Formato inválido"));
        assert_eq!(records[0].action, None);
    }

    #[test]
    fn test_malformed_line_name_marks_batch() {
        let reconciler = Reconciler::new(&[]);
        let records = reconciler.reconcile_registrations(vec![
            ParsedLine {
                number: 1,
                raw: "Jub".to_string(),
                candidate: None,
            },
            reg_line(2, "Jub", "10597690"),
            reg_line(3, "Cat", "10587003"),
        ]);

        assert_eq!(records[0].error.as_deref(), Some("Formato inválido"));
        assert_eq!(records[1].error.as_deref(), Some("Duplicado neste lote"));
        assert!(records[2].is_valid, "an empty id never collides");
    }

    #[test]
    fn test_gift_update_unknown_id() {
        let existing = existing();
        let reconciler = Reconciler::new(&existing);

        let records =
            reconciler.reconcile_gift_updates(vec![gift_line(1, "99999999", 60)], UpdateSubMode::Unique);

        assert!(!records[0].is_valid);
        assert_eq!(records[0].error.as_deref(), Some("ID \"99999999\" não encontrado (ignorado)"));
        assert_eq!(records[0].streamer_name, None);
    }

    #[test]
    fn test_gift_update_sub_modes() {
        let existing = existing();
        let reconciler = Reconciler::new(&existing);
        let lines = || vec![gift_line(1, "10000001", 150), gift_line(2, "10000001", 90)];

        let unique = reconciler.reconcile_gift_updates(lines(), UpdateSubMode::Unique);
        assert!(unique[0].is_valid);
        assert_eq!(unique[0].streamer_name.as_deref(), Some("Ana"));
        assert_eq!(unique[1].error.as_deref(), Some("Duplicado neste lote"));

        let duplicate = reconciler.reconcile_gift_updates(lines(), UpdateSubMode::Duplicate);
        assert!(duplicate.iter().all(|r| r.is_valid));
        assert!(duplicate.iter().all(|r| r.streamer_name.as_deref() == Some("Ana")));
    }

    #[test]
    fn test_sub_mode_parse() {
        assert_eq!("Duplicate".parse::<UpdateSubMode>().unwrap(), UpdateSubMode::Duplicate);
        assert_eq!(UpdateSubMode::default(), UpdateSubMode::Unique);
        assert!("both".parse::<UpdateSubMode>().is_err());
    }
}
