// 📥 Batch Importer - Paste in, preview out, commit on request
//
// Pipeline:
//   raw text -> LineParser -> Reconciler -> (duplicate sub-mode) Consolidator
//            -> ImportPreview { entries, summary, fingerprint }
//
// Preview is pure. Commit submits valid entries to a RecordStore one at a
// time; a failed submission is counted and the rest continue.

use crate::config::ImportConfig;
use crate::consolidation::{Consolidator, ValidDayPolicy};
use crate::db::RecordStore;
use crate::entities::{StreamerDraft, StreamerRef};
use crate::error::{LedgerError, Result};
use crate::parser::{GiftUpdateParser, LineParser, ParsedGiftUpdate, ParsedRegistration, RegistrationParser};
use crate::reconciliation::{Reconciler, UpdateSubMode};
use crate::summary::{get_import_summary, BatchImportResult, ImportSummary};
use crate::tokenizer::ImportMode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

// ============================================================================
// PREVIEW
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportPreview<T> {
    pub mode: ImportMode,
    pub entries: Vec<T>,
    pub summary: ImportSummary,
    /// SHA-256 of the normalised paste; equal for re-pasted batches
    pub fingerprint: String,
}

impl<T> ImportPreview<T> {
    pub fn has_valid(&self) -> bool {
        self.summary.valid > 0
    }
}

/// Hash of the non-blank trimmed lines, so line endings and padding don't matter
pub fn batch_fingerprint(input: &str) -> String {
    let normalized = input.replace("\r\n", "\n").replace('\r', "\n");

    let mut hasher = Sha256::new();
    for line in normalized.split('\n').map(str::trim).filter(|l| !l.is_empty()) {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// BATCH IMPORTER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct BatchImporter {
    pub config: ImportConfig,
}

impl BatchImporter {
    pub fn new(config: ImportConfig) -> Self {
        BatchImporter { config }
    }

    fn reconciler<'e>(&self, existing: &'e [StreamerRef]) -> Reconciler<'e> {
        Reconciler::new(existing).with_preview_chars(self.config.name_preview_chars)
    }

    pub fn preview_registrations(
        &self,
        input: &str,
        existing: &[StreamerRef],
    ) -> ImportPreview<ParsedRegistration> {
        let lines = RegistrationParser::new(&self.config).parse_input(input);
        let entries = self.reconciler(existing).reconcile_registrations(lines);
        let summary = get_import_summary(&entries);

        debug!(
            "Registration preview: {} lines, {} valid, {} invalid",
            entries.len(),
            summary.valid,
            summary.invalid
        );

        ImportPreview {
            mode: ImportMode::Register,
            entries,
            summary,
            fingerprint: batch_fingerprint(input),
        }
    }

    /// Gift-update preview; duplicate sub-mode entries come back consolidated
    pub fn preview_gift_updates(
        &self,
        input: &str,
        existing: &[StreamerRef],
        sub_mode: UpdateSubMode,
    ) -> ImportPreview<ParsedGiftUpdate> {
        let lines = GiftUpdateParser::new(&self.config).parse_input(input);
        let mut entries = self.reconciler(existing).reconcile_gift_updates(lines, sub_mode);

        if sub_mode == UpdateSubMode::Duplicate {
            let policy = ValidDayPolicy::new(self.config.valid_day_minutes);
            entries = Consolidator::with_policy(policy).consolidate(entries);
        }

        let summary = get_import_summary(&entries);

        debug!(
            "Gift update preview ({}): {} entries, {} valid, {} invalid",
            sub_mode,
            entries.len(),
            summary.valid,
            summary.invalid
        );

        ImportPreview {
            mode: ImportMode::Update,
            entries,
            summary,
            fingerprint: batch_fingerprint(input),
        }
    }

    // ========================================================================
    // COMMIT
    // ========================================================================

    /// Create a zeroed profile for every valid registration
    pub fn commit_registrations<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        entries: &[ParsedRegistration],
    ) -> BatchImportResult {
        let mut result = BatchImportResult::default();

        for entry in entries.iter().filter(|e| e.is_valid) {
            let draft = StreamerDraft::registration(entry.name.as_str(), entry.streamer_id.as_str());
            match store.create_streamer(&draft) {
                Ok(_) => result.record_success(),
                Err(e) => {
                    warn!("Line {}: could not create {}: {}", entry.line_number, entry.name, e);
                    result.record_failure(format!("{}: {}", entry.name, e));
                }
            }
        }

        info!("Registration commit: {} created, {} failed", result.success, result.failed);
        result
    }

    /// Replace luck/exclusive/minutes of each matching profile.
    ///
    /// Consolidated entries also set `effective_days` to their valid-day count.
    pub fn commit_gift_updates<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        entries: &[ParsedGiftUpdate],
    ) -> BatchImportResult {
        let mut result = BatchImportResult::default();

        for entry in entries.iter().filter(|e| e.is_valid) {
            match apply_gift_update(store, entry) {
                Ok(()) => result.record_success(),
                Err(e) => {
                    warn!("Line {}: could not update {}: {}", entry.line_number, entry.streamer_id, e);
                    result.record_failure(format!("{}: {}", entry.streamer_id, e));
                }
            }
        }

        info!("Gift update commit: {} updated, {} failed", result.success, result.failed);
        result
    }

    /// Preview against the store's current profiles, then commit the valid part
    pub fn import_registrations<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        input: &str,
    ) -> Result<(ImportPreview<ParsedRegistration>, BatchImportResult)> {
        let existing = store.streamer_refs()?;
        let preview = self.preview_registrations(input, &existing);
        info!("Importing registration batch {}", short_fingerprint(&preview.fingerprint));

        let result = self.commit_registrations(store, &preview.entries);
        Ok((preview, result))
    }

    pub fn import_gift_updates<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        input: &str,
        sub_mode: UpdateSubMode,
    ) -> Result<(ImportPreview<ParsedGiftUpdate>, BatchImportResult)> {
        let existing = store.streamer_refs()?;
        let preview = self.preview_gift_updates(input, &existing, sub_mode);
        info!("Importing gift update batch {}", short_fingerprint(&preview.fingerprint));

        let result = self.commit_gift_updates(store, &preview.entries);
        Ok((preview, result))
    }
}

fn apply_gift_update<S: RecordStore + ?Sized>(store: &mut S, entry: &ParsedGiftUpdate) -> Result<()> {
    let streamer = store
        .find_by_streamer_id(&entry.streamer_id)?
        .ok_or_else(|| LedgerError::NotFound(format!("streamer {}", entry.streamer_id)))?;

    let mut draft = streamer.draft();
    draft.luck_gifts = entry.luck_gifts;
    draft.exclusive_gifts = entry.exclusive_gifts;
    draft.minutes = entry.minutes;
    if let Some(valid_days) = entry.valid_days_count {
        draft.effective_days = i64::from(valid_days);
    }

    store.update_streamer(&streamer.id, &draft)?;
    Ok(())
}

fn short_fingerprint(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}

// ============================================================================
// CONVENIENCE (default configuration)
// ============================================================================

/// Parse and reconcile a registration paste with default settings
pub fn parse_batch_input(input: &str, existing: &[StreamerRef]) -> Vec<ParsedRegistration> {
    BatchImporter::default().preview_registrations(input, existing).entries
}

/// Parse and reconcile a gift-update paste with default settings (not consolidated)
pub fn parse_gift_update_input(
    input: &str,
    existing: &[StreamerRef],
    sub_mode: UpdateSubMode,
) -> Vec<ParsedGiftUpdate> {
    let config = ImportConfig::default();
    let lines = GiftUpdateParser::new(&config).parse_input(input);
    Reconciler::new(existing)
        .with_preview_chars(config.name_preview_chars)
        .reconcile_gift_updates(lines, sub_mode)
}

// ============================================================================
// TESTS
// ============================================================================
