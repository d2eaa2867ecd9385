// Streamer Ledger - Command line interface
//
// Usage:
//   streamer-ledger import register streamers.txt --dry-run
//   streamer-ledger import update gifts.tsv --duplicate-ids
//   streamer-ledger snapshot create --period monthly
//   streamer-ledger export --format csv --output fechamento.csv

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use streamer_ledger::{
    aggregate_snapshots, available_months, filter_by_month, filter_by_year, filter_streamers,
    format_currency, format_minutes_to_hours, format_number, format_text_block, monthly_growth,
    realtime_stats, resolve_period_label, sort_streamers, spreadsheet_preview, write_csv,
    BatchImporter, ExportField, ExportOptions, ExportRecord, LedgerConfig, NewSnapshot,
    ParsedGiftUpdate, ParsedRegistration, PeriodType, RecordStore, SortDirection, SortField,
    SqliteStore, UpdateSubMode,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "streamer-ledger", version)]
#[command(about = "Agency ledger for streamer gifts, earnings and airtime")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SQLite database, overrides the configured path
    #[arg(long, global = true, value_name = "FILE")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a pasted batch and commit its valid lines
    Import {
        #[command(subcommand)]
        kind: ImportKind,
    },

    /// List streamer profiles
    Streamers {
        /// Case-insensitive match on name or id
        #[arg(long)]
        search: Option<String>,

        #[arg(long, default_value = "host_crystals")]
        sort: SortField,

        #[arg(long, default_value = "desc")]
        direction: SortDirection,
    },

    /// Save, list or delete period snapshots
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },

    /// Export current profiles or a snapshot
    Export {
        /// Snapshot id to export instead of the live profiles
        #[arg(long)]
        snapshot: Option<String>,

        /// Comma-separated fields (default: all)
        #[arg(long, value_delimiter = ',')]
        fields: Vec<ExportField>,

        #[arg(long, value_enum, default_value_t = ExportFormat::Text)]
        format: ExportFormat,

        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[arg(long)]
        search: Option<String>,
    },

    /// Totals for the live profiles, a month or a year of snapshots
    Dashboard {
        /// Month key, e.g. 2025-03
        #[arg(long, conflicts_with = "year")]
        month: Option<String>,

        #[arg(long)]
        year: Option<i32>,
    },

    /// Zero every counter to start a new month
    ClearMonthly {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ImportKind {
    /// "name,id" lines that create profiles
    Register {
        /// Input file, or - for stdin
        file: PathBuf,

        /// Preview only
        #[arg(long)]
        dry_run: bool,
    },

    /// "id,luck,exclusive,minutes" lines applied to existing profiles
    Update {
        /// Input file, or - for stdin
        file: PathBuf,

        /// Rows are per day; repeated ids are summed
        #[arg(long)]
        duplicate_ids: bool,

        /// Preview only
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SnapshotAction {
    Create {
        #[arg(long, default_value = "weekly")]
        period: PeriodType,

        /// Defaults to the period's standard label
        #[arg(long)]
        label: Option<String>,

        /// Snapshot date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    List,
    Delete {
        id: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ExportFormat {
    Text,
    Table,
    Csv,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = LedgerConfig::resolve(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }

    info!("Database path: {}", config.database_path.display());
    let mut store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;

    match cli.command {
        Command::Import { kind } => run_import(&mut store, &config, kind),
        Command::Streamers { search, sort, direction } => {
            run_streamers(&store, search.as_deref(), sort, direction)
        }
        Command::Snapshot { action } => run_snapshot(&mut store, action),
        Command::Export { snapshot, fields, format, output, search } => {
            let options = if fields.is_empty() {
                ExportOptions::default()
            } else {
                ExportOptions::only(&fields)
            };
            run_export(&store, snapshot.as_deref(), search.as_deref(), &options, format, output.as_deref())
        }
        Command::Dashboard { month, year } => run_dashboard(&store, month.as_deref(), year),
        Command::ClearMonthly { yes } => {
            if !yes {
                bail!("This zeroes every counter of every streamer; re-run with --yes to confirm");
            }
            let cleared = store.clear_monthly()?;
            println!("✅ {} streamer(s) zerados", cleared);
            Ok(())
        }
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).context("Failed to read stdin")?;
        return Ok(buffer);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

// ============================================================================
// IMPORT
// ============================================================================

fn run_import(store: &mut SqliteStore, config: &LedgerConfig, kind: ImportKind) -> Result<()> {
    let importer = BatchImporter::new(config.import.clone());
    let existing = store.streamer_refs()?;

    match kind {
        ImportKind::Register { file, dry_run } => {
            let input = read_input(&file)?;
            let preview = importer.preview_registrations(&input, &existing);

            println!("📥 Cadastro ({})", &preview.fingerprint[..12]);
            print_registrations(&preview.entries);
            println!(
                "\n{} válido(s), {} inválido(s)",
                preview.summary.valid, preview.summary.invalid
            );

            if dry_run || !preview.has_valid() {
                return Ok(());
            }
            let result = importer.commit_registrations(store, &preview.entries);
            println!("{}", result.summary());
        }
        ImportKind::Update { file, duplicate_ids, dry_run } => {
            let input = read_input(&file)?;
            let sub_mode = if duplicate_ids {
                UpdateSubMode::Duplicate
            } else {
                UpdateSubMode::Unique
            };
            let preview = importer.preview_gift_updates(&input, &existing, sub_mode);

            println!("📥 Atualização de presentes, {} ({})", sub_mode, &preview.fingerprint[..12]);
            print_gift_updates(&preview.entries);
            println!(
                "\n{} válido(s), {} inválido(s)",
                preview.summary.valid, preview.summary.invalid
            );

            if dry_run || !preview.has_valid() {
                return Ok(());
            }
            let result = importer.commit_gift_updates(store, &preview.entries);
            println!("{}", result.summary());
        }
    }

    Ok(())
}

fn verdict(is_valid: bool) -> &'static str {
    if is_valid {
        "✓"
    } else {
        "✗"
    }
}

fn print_registrations(entries: &[ParsedRegistration]) {
    for e in entries {
        println!(
            "{:>4} {} {:<30} {:<12} {}",
            e.line_number,
            verdict(e.is_valid),
            e.name,
            e.streamer_id,
            e.error.as_deref().unwrap_or("")
        );
    }
}

fn print_gift_updates(entries: &[ParsedGiftUpdate]) {
    for e in entries {
        let days = match (e.days_count, e.valid_days_count) {
            (Some(days), Some(valid)) => format!("{} dia(s), {} válido(s)", days, valid),
            _ => String::new(),
        };
        println!(
            "{:>4} {} {:<12} {:<20} sorte {:>10} excl {:>10} {:>7} {} {}",
            e.line_number,
            verdict(e.is_valid),
            e.streamer_id,
            e.streamer_name.as_deref().unwrap_or(""),
            format_number(e.luck_gifts),
            format_number(e.exclusive_gifts),
            format_minutes_to_hours(e.minutes),
            days,
            e.error.as_deref().unwrap_or("")
        );
    }
}

// ============================================================================
// STREAMERS / SNAPSHOTS
// ============================================================================

fn run_streamers(
    store: &SqliteStore,
    search: Option<&str>,
    sort: SortField,
    direction: SortDirection,
) -> Result<()> {
    let mut streamers = store.list_streamers()?;
    sort_streamers(&mut streamers, sort, direction);

    let shown = filter_streamers(&streamers, search.unwrap_or(""));
    for s in &shown {
        println!(
            "{:<12} {:<30} cristais {:>12} host {:>12} agência {:>10} {:>7} {} dia(s)",
            s.streamer_id,
            s.name,
            format_number(s.host_crystals),
            format_currency(s.host_usd()),
            format_currency(s.agency_usd()),
            format_minutes_to_hours(s.minutes),
            s.effective_days
        );
    }
    println!("\n{} de {} streamer(s)", shown.len(), streamers.len());
    Ok(())
}

fn run_snapshot(store: &mut SqliteStore, action: SnapshotAction) -> Result<()> {
    match action {
        SnapshotAction::Create { period, label, date } => {
            let streamers = store.list_streamers()?;
            if streamers.is_empty() {
                bail!("No streamers to snapshot");
            }

            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let label = resolve_period_label(period, label.as_deref(), date)?;
            let snapshot = store.create_snapshot(&NewSnapshot::capture(period, label, date, &streamers))?;

            println!(
                "📸 {} ({}) salvo: {} streamer(s), host {}, agência {}",
                snapshot.period_label,
                snapshot.period_type,
                snapshot.streamer_count,
                format_currency(snapshot.total_host_usd),
                format_currency(snapshot.total_agency_usd)
            );
        }
        SnapshotAction::List => {
            for s in store.list_snapshots()? {
                println!(
                    "{} {} {:<8} {:<32} {:>3} streamer(s) host {}",
                    s.id,
                    s.snapshot_date,
                    s.period_type,
                    s.period_label,
                    s.streamer_count,
                    format_currency(s.total_host_usd)
                );
            }
        }
        SnapshotAction::Delete { id } => {
            store.delete_snapshot(&id)?;
            println!("🗑️  Snapshot {} removido", id);
        }
    }
    Ok(())
}

// ============================================================================
// EXPORT / DASHBOARD
// ============================================================================

fn run_export(
    store: &SqliteStore,
    snapshot: Option<&str>,
    search: Option<&str>,
    options: &ExportOptions,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<()> {
    let records: Vec<ExportRecord> = match snapshot {
        Some(id) => {
            let snapshot = store
                .list_snapshots()?
                .into_iter()
                .find(|s| s.id == id)
                .with_context(|| format!("Snapshot {} not found", id))?;
            snapshot
                .data
                .iter()
                .filter(|row| search.map_or(true, |q| row_matches(&row.name, &row.streamer_id, q)))
                .map(ExportRecord::from)
                .collect()
        }
        None => {
            let streamers = store.list_streamers()?;
            filter_streamers(&streamers, search.unwrap_or(""))
                .into_iter()
                .map(ExportRecord::from)
                .collect()
        }
    };

    match format {
        ExportFormat::Csv => match output {
            Some(path) => {
                let file = std::fs::File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                write_csv(file, &records, options)?;
                println!("✅ {} linha(s) exportada(s) para {}", records.len(), path.display());
            }
            None => write_csv(io::stdout(), &records, options)?,
        },
        ExportFormat::Text | ExportFormat::Table => {
            let content = if format == ExportFormat::Text {
                format_text_block(&records, options)
            } else {
                let preview = spreadsheet_preview(&records, options);
                std::iter::once(preview.headers)
                    .chain(preview.rows)
                    .map(|row| row.join("\t"))
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            match output {
                Some(path) => std::fs::write(path, content)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", content),
            }
        }
    }

    Ok(())
}

fn row_matches(name: &str, streamer_id: &str, query: &str) -> bool {
    let query = query.to_lowercase();
    name.to_lowercase().contains(&query) || streamer_id.to_lowercase().contains(&query)
}

fn run_dashboard(store: &SqliteStore, month: Option<&str>, year: Option<i32>) -> Result<()> {
    let snapshots = store.list_snapshots()?;

    let stats = match (month, year) {
        (Some(key), _) => {
            if !available_months(&snapshots).iter().any(|m| m.value == key) {
                bail!("No snapshots for month {}", key);
            }
            aggregate_snapshots(filter_by_month(&snapshots, key))
        }
        (None, Some(year)) => aggregate_snapshots(filter_by_year(&snapshots, year)),
        (None, None) => realtime_stats(&store.list_streamers()?),
    };

    println!("📊 {}", stats.summary());
    println!(
        "   Sorte {} | Exclusivos {}",
        format_number(stats.total_luck_gifts),
        format_number(stats.total_exclusive_gifts)
    );

    let mut top: Vec<_> = stats.streamers.iter().collect();
    top.sort_by(|a, b| b.host_crystals.cmp(&a.host_crystals));

    for (rank, s) in top.iter().enumerate().take(10) {
        println!(
            "{:>3}. {:<30} {:>12} cristais {:>12}",
            rank + 1,
            s.name,
            format_number(s.host_crystals),
            format_currency(s.host_usd)
        );
    }

    if let Some(year) = year {
        println!("\n📈 Crescimento mensal {}", year);
        for m in monthly_growth(&snapshots, year) {
            println!("   {} host {:>12} agência {:>10}", m.month, format_currency(m.revenue), format_currency(m.agency));
        }
    }

    Ok(())
}
