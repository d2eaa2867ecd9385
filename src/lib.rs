// Streamer Ledger - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod error;
pub mod metrics;
pub mod tokenizer;
pub mod parser;
pub mod reconciliation;
pub mod consolidation;
pub mod summary;
pub mod import;
pub mod entities;
pub mod db;
pub mod temporal;
pub mod dashboard;
pub mod export;

// Re-export commonly used types
pub use config::{HeaderKeywords, ImportConfig, LedgerConfig, ServerConfig};
pub use error::{LedgerError, Result};
pub use metrics::{
    calculate_agency_usd, calculate_host_usd, format_currency, format_minutes_to_hours,
    format_number, parse_formatted_number, saturating_total,
};
pub use tokenizer::{ImportMode, LineTokenizer, Strategy, Tokenized};
pub use parser::{
    data_lines, GiftUpdateCandidate, GiftUpdateParser, ImportAction, ImportIssue, IssueCategory,
    LineParser, ParsedGiftUpdate, ParsedLine, ParsedRegistration, RegistrationCandidate,
    RegistrationParser,
};
pub use reconciliation::{Reconciler, UpdateSubMode};
pub use consolidation::{consolidate_duplicates, Consolidator, ValidDayPolicy};
pub use summary::{get_import_summary, BatchImportResult, ImportSummary, Validity};
pub use import::{
    batch_fingerprint, parse_batch_input, parse_gift_update_input, BatchImporter, ImportPreview,
};
pub use entities::{
    filter_streamers, NewSnapshot, PeriodType, Snapshot, Streamer, StreamerDraft, StreamerForm,
    StreamerRef, StreamerSnapshotData,
};
pub use db::{get_events_for_entity, insert_event, setup_database, Event, RecordStore, SqliteStore};
pub use temporal::{
    available_months, available_years, default_period_label, filter_by_month, filter_by_year,
    month_key, resolve_period_label, PeriodOption,
};
pub use dashboard::{aggregate_snapshots, monthly_growth, realtime_stats, DashboardStats, MonthlyGrowth};
pub use export::{
    format_text_block, sort_streamers, spreadsheet_preview, to_csv_string, write_csv, ExportField,
    ExportOptions, ExportRecord, SortDirection, SortField, SpreadsheetPreview,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
