// 📊 Import Summary - Valid/invalid tally and commit results

use crate::parser::{ParsedGiftUpdate, ParsedRegistration};
use serde::{Deserialize, Serialize};

/// Anything carrying a validity verdict
pub trait Validity {
    fn is_valid(&self) -> bool;
}

impl Validity for ParsedRegistration {
    fn is_valid(&self) -> bool {
        self.is_valid
    }
}

impl Validity for ParsedGiftUpdate {
    fn is_valid(&self) -> bool {
        self.is_valid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub valid: usize,
    pub invalid: usize,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.valid + self.invalid
    }
}

pub fn get_import_summary<T: Validity>(entries: &[T]) -> ImportSummary {
    let valid = entries.iter().filter(|e| e.is_valid()).count();
    ImportSummary {
        valid,
        invalid: entries.len() - valid,
    }
}

/// Outcome of submitting valid records to the store one at a time
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchImportResult {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl BatchImportResult {
    pub fn record_success(&mut self) {
        self.success += 1;
    }

    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.failed += 1;
        self.errors.push(error.into());
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    pub fn summary(&self) -> String {
        if self.is_clean() {
            format!("✅ {} registro(s) importado(s)", self.success)
        } else {
            format!(
                "⚠️ {} importado(s), {} falha(s): {}",
                self.success,
                self.failed,
                self.errors.join("; ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ImportIssue, RegistrationCandidate};

    fn registration(valid: bool) -> ParsedRegistration {
        let candidate = RegistrationCandidate {
            name: "Jub".to_string(),
            streamer_id: "10597690".to_string(),
        };
        if valid {
            ParsedRegistration::accepted(1, candidate)
        } else {
            ParsedRegistration::rejected(1, candidate.name, candidate.streamer_id, ImportIssue::DuplicateInBatch)
        }
    }

    #[test]
    fn test_summary_counts() {
        let entries = vec![registration(true), registration(false), registration(true)];
        let summary = get_import_summary(&entries);

        assert_eq!(summary, ImportSummary { valid: 2, invalid: 1 });
        assert_eq!(summary.total(), entries.len());
    }

    #[test]
    fn test_summary_empty() {
        let entries: Vec<ParsedGiftUpdate> = Vec::new();
        assert_eq!(get_import_summary(&entries), ImportSummary::default());
    }

    #[test]
    fn test_batch_result_summary() {
        let mut result = BatchImportResult::default();
        result.record_success();
        result.record_success();
        assert!(result.is_clean());
        assert!(result.summary().contains("2 registro"));

        result.record_failure("ID \"10597690\" já existe");
        assert_eq!(result.failed, 1);
        assert!(result.summary().contains("1 falha"));

        println!("✅ {}", result.summary());
    }
}
