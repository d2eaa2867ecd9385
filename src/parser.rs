// 🏗️ Line Parsers - Registration and gift-update rows
//
// Two parsers share one trait: each knows its mode (which tokenizer
// strategies apply), its header keywords, and how to turn a field list into
// a candidate. Everything about *validity against existing data* lives in
// reconciliation.rs; parsers only answer "is this line well-formed?".

use crate::config::{HeaderKeywords, ImportConfig};
use crate::tokenizer::{ImportMode, LineTokenizer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// ISSUES (data-quality outcomes, never raised)
// ============================================================================

/// Why a line was not accepted. Display text is shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportIssue {
    #[error("Formato inválido")]
    InvalidFormat,

    #[error("Nome \"{0}\" já existe (ignorado)")]
    NameExists(String),

    #[error("ID \"{0}\" já existe (ignorado)")]
    IdExists(String),

    #[error("ID \"{0}\" não encontrado (ignorado)")]
    IdNotFound(String),

    #[error("Duplicado neste lote")]
    DuplicateInBatch,

    /// Merged counters would exceed the integer range
    #[error("Valor muito grande")]
    ValueTooLarge,
}

impl ImportIssue {
    pub fn category(&self) -> IssueCategory {
        match self {
            ImportIssue::InvalidFormat | ImportIssue::ValueTooLarge => IssueCategory::FormatError,
            ImportIssue::NameExists(_) | ImportIssue::IdExists(_) | ImportIssue::IdNotFound(_) => {
                IssueCategory::DuplicateInExisting
            }
            ImportIssue::DuplicateInBatch => IssueCategory::DuplicateInBatch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    /// Missing delimiter, too few fields, bad id, non-numeric counter
    FormatError,
    /// Conflicts with the existing record snapshot
    DuplicateInExisting,
    /// Repeats an earlier line of the same paste
    DuplicateInBatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportAction {
    Create,
    Update,
}

// ============================================================================
// CANDIDATES (well-formed, not yet reconciled)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationCandidate {
    pub name: String,
    pub streamer_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GiftUpdateCandidate {
    pub streamer_id: String,
    pub luck_gifts: i64,
    pub exclusive_gifts: i64,
    pub minutes: i64,
}

/// One data line of the paste and what the parser made of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine<T> {
    /// 1-based line in the pasted text
    pub number: usize,
    /// Trimmed line text
    pub raw: String,
    pub candidate: Option<T>,
}

// ============================================================================
// PARSED RECORDS (reconciled, one per data line)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedRegistration {
    pub line_number: usize,
    pub name: String,
    pub streamer_id: String,

    #[serde(rename = "isValid")]
    pub is_valid: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<IssueCategory>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ImportAction>,
}

impl ParsedRegistration {
    pub fn accepted(line_number: usize, candidate: RegistrationCandidate) -> Self {
        ParsedRegistration {
            line_number,
            name: candidate.name,
            streamer_id: candidate.streamer_id,
            is_valid: true,
            error: None,
            issue: None,
            action: Some(ImportAction::Create),
        }
    }

    pub fn rejected(line_number: usize, name: String, streamer_id: String, issue: ImportIssue) -> Self {
        ParsedRegistration {
            line_number,
            name,
            streamer_id,
            is_valid: false,
            error: Some(issue.to_string()),
            issue: Some(issue.category()),
            action: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedGiftUpdate {
    pub line_number: usize,
    pub streamer_id: String,
    pub luck_gifts: i64,
    pub exclusive_gifts: i64,
    pub minutes: i64,

    #[serde(rename = "isValid")]
    pub is_valid: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<IssueCategory>,

    #[serde(rename = "streamerName", default, skip_serializing_if = "Option::is_none")]
    pub streamer_name: Option<String>,

    /// Rows merged into this entry (consolidation only)
    #[serde(rename = "daysCount", default, skip_serializing_if = "Option::is_none")]
    pub days_count: Option<u32>,

    /// Merged rows that met the valid-day threshold (consolidation only)
    #[serde(rename = "validDaysCount", default, skip_serializing_if = "Option::is_none")]
    pub valid_days_count: Option<u32>,
}

impl ParsedGiftUpdate {
    pub fn accepted(line_number: usize, candidate: GiftUpdateCandidate, streamer_name: String) -> Self {
        ParsedGiftUpdate {
            line_number,
            streamer_id: candidate.streamer_id,
            luck_gifts: candidate.luck_gifts,
            exclusive_gifts: candidate.exclusive_gifts,
            minutes: candidate.minutes,
            is_valid: true,
            error: None,
            issue: None,
            streamer_name: Some(streamer_name),
            days_count: None,
            valid_days_count: None,
        }
    }

    pub fn rejected(line_number: usize, candidate: GiftUpdateCandidate, issue: ImportIssue) -> Self {
        ParsedGiftUpdate {
            line_number,
            streamer_id: candidate.streamer_id,
            luck_gifts: candidate.luck_gifts,
            exclusive_gifts: candidate.exclusive_gifts,
            minutes: candidate.minutes,
            is_valid: false,
            error: Some(issue.to_string()),
            issue: Some(issue.category()),
            streamer_name: None,
            days_count: None,
            valid_days_count: None,
        }
    }

    /// Demote an accepted entry, keeping its line and counters
    pub fn into_rejected(self, issue: ImportIssue) -> Self {
        ParsedGiftUpdate {
            is_valid: false,
            error: Some(issue.to_string()),
            issue: Some(issue.category()),
            streamer_name: None,
            days_count: None,
            valid_days_count: None,
            ..self
        }
    }

    /// Unparseable line: the raw text preview stands in for the id
    pub fn malformed(line_number: usize, preview: String) -> Self {
        let candidate = GiftUpdateCandidate {
            streamer_id: preview,
            luck_gifts: 0,
            exclusive_gifts: 0,
            minutes: 0,
        };
        ParsedGiftUpdate::rejected(line_number, candidate, ImportIssue::InvalidFormat)
    }
}

// ============================================================================
// LINE SPLITTING + HEADER DETECTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLine {
    pub number: usize,
    pub text: String,
}

/// Non-blank trimmed lines, minus a header row if the first one looks like one.
///
/// Accepts `\n`, `\r\n` and bare `\r` line endings.
pub fn data_lines(input: &str, headers: &HeaderKeywords) -> Vec<DataLine> {
    let normalized = input.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines = normalized
        .split('\n')
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .peekable();

    if let Some((_, first)) = lines.peek() {
        if headers.is_header(first) {
            lines.next();
        }
    }

    lines
        .map(|(number, text)| DataLine {
            number,
            text: text.to_string(),
        })
        .collect()
}

/// First `chars` characters of a line, echoed back for malformed rows
pub fn preview(line: &str, chars: usize) -> String {
    line.chars().take(chars).collect()
}

// ============================================================================
// LINE PARSER TRAIT
// ============================================================================

/// LineParser - turns tokenized fields into a mode-specific candidate
pub trait LineParser {
    type Candidate;

    fn mode(&self) -> ImportMode;

    fn config(&self) -> &ImportConfig;

    fn headers(&self) -> &HeaderKeywords;

    /// Build a candidate from one strategy's fields, or reject them
    fn from_fields(&self, fields: &[&str]) -> Option<Self::Candidate>;

    /// Try every tokenizer strategy in priority order; first accepted wins
    fn parse_line(&self, line: &str) -> Option<Self::Candidate> {
        LineTokenizer::new(self.mode(), self.config())
            .candidates(line)
            .into_iter()
            .find_map(|(_, fields)| self.from_fields(&fields))
    }

    fn parse_input(&self, input: &str) -> Vec<ParsedLine<Self::Candidate>> {
        data_lines(input, self.headers())
            .into_iter()
            .map(|line| {
                let candidate = self.parse_line(&line.text);
                ParsedLine {
                    number: line.number,
                    raw: line.text,
                    candidate,
                }
            })
            .collect()
    }
}

/// Registration rows: `name,id` / `name<TAB>id` / `name<symbols>id`
pub struct RegistrationParser<'c> {
    config: &'c ImportConfig,
}

impl<'c> RegistrationParser<'c> {
    pub fn new(config: &'c ImportConfig) -> Self {
        RegistrationParser { config }
    }
}

impl LineParser for RegistrationParser<'_> {
    type Candidate = RegistrationCandidate;

    fn mode(&self) -> ImportMode {
        ImportMode::Register
    }

    fn config(&self) -> &ImportConfig {
        self.config
    }

    fn headers(&self) -> &HeaderKeywords {
        &self.config.registration_headers
    }

    fn from_fields(&self, fields: &[&str]) -> Option<RegistrationCandidate> {
        let name = fields.first()?.trim();
        let id = fields.get(1)?.trim();

        if name.is_empty() || !self.config.is_valid_id(id) {
            return None;
        }

        Some(RegistrationCandidate {
            name: name.to_string(),
            streamer_id: id.to_string(),
        })
    }
}

/// Gift rows: `id, luck gifts, exclusive gifts, minutes`
pub struct GiftUpdateParser<'c> {
    config: &'c ImportConfig,
}

impl<'c> GiftUpdateParser<'c> {
    pub fn new(config: &'c ImportConfig) -> Self {
        GiftUpdateParser { config }
    }
}

impl LineParser for GiftUpdateParser<'_> {
    type Candidate = GiftUpdateCandidate;

    fn mode(&self) -> ImportMode {
        ImportMode::Update
    }

    fn config(&self) -> &ImportConfig {
        self.config
    }

    fn headers(&self) -> &HeaderKeywords {
        &self.config.gift_update_headers
    }

    fn from_fields(&self, fields: &[&str]) -> Option<GiftUpdateCandidate> {
        if fields.len() < 4 {
            return None;
        }

        let id = fields[0].trim();
        if !self.config.is_valid_id(id) {
            return None;
        }

        Some(GiftUpdateCandidate {
            streamer_id: id.to_string(),
            luck_gifts: parse_count(fields[1])?,
            exclusive_gifts: parse_count(fields[2])?,
            minutes: parse_count(fields[3])?,
        })
    }
}

/// Non-negative integer with `.`/`,` thousands separators ("15.000", "1,500")
pub fn parse_count(field: &str) -> Option<i64> {
    let cleaned: String = field
        .trim()
        .chars()
        .filter(|c| *c != '.' && *c != ',')
        .collect();

    if cleaned.is_empty() || !cleaned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    cleaned.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_formats() {
        let config = ImportConfig::default();
        let parser = RegistrationParser::new(&config);

        let expect = |line: &str, name: &str, id: &str| {
            let c = parser.parse_line(line).expect(line);
            assert_eq!(c.name, name, "name for {:?}", line);
            assert_eq!(c.streamer_id, id, "id for {:?}", line);
        };

        expect("Jubscreuza,10597690", "Jubscreuza", "10597690");
        expect("Rô Ramos\t10844565", "Rô Ramos", "10844565");
        expect("Cat 10587003", "Cat", "10587003");
        expect("Luh🦋10702736", "Luh", "10702736");
        expect("Luh.ᴮˡᵒᵒᵐ🦋10702736", "Luh.ᴮˡᵒᵒᵐ", "10702736");
    }

    #[test]
    fn test_registration_rejects() {
        let config = ImportConfig::default();
        let parser = RegistrationParser::new(&config);

        assert_eq!(parser.parse_line("Ana,1234"), None, "4-digit id");
        assert_eq!(parser.parse_line(",10597690"), None, "empty name");
        assert_eq!(parser.parse_line("10597690"), None, "id only");
        assert_eq!(parser.parse_line("just words"), None);
    }

    #[test]
    fn test_registration_falls_back_after_bad_comma_split() {
        let config = ImportConfig::default();
        let parser = RegistrationParser::new(&config);

        // Comma split gives ("Silva", "Ana 10597690") which has a bad id;
        // the suffix strategy still recovers the row.
        let c = parser.parse_line("Silva, Ana 10597690").unwrap();
        assert_eq!(c.name, "Silva, Ana");
        assert_eq!(c.streamer_id, "10597690");
    }

    #[test]
    fn test_gift_update_formats() {
        let config = ImportConfig::default();
        let parser = GiftUpdateParser::new(&config);

        let expected = GiftUpdateCandidate {
            streamer_id: "10597690".to_string(),
            luck_gifts: 15000,
            exclusive_gifts: 8000,
            minutes: 1500,
        };

        assert_eq!(parser.parse_line("10597690,15000,8000,1500").as_ref(), Some(&expected));
        assert_eq!(parser.parse_line("10597690\t15.000\t8.000\t1.500").as_ref(), Some(&expected));
        assert_eq!(parser.parse_line("10597690 15.000 8.000 1500").as_ref(), Some(&expected));
        // Comma grouping inside tab columns: comma split fails, tab split wins
        assert_eq!(parser.parse_line("10597690\t15,000\t8,000\t1,500").as_ref(), Some(&expected));
    }

    #[test]
    fn test_gift_update_rejects() {
        let config = ImportConfig::default();
        let parser = GiftUpdateParser::new(&config);

        assert_eq!(parser.parse_line("10597690,15000,8000"), None, "3 fields");
        assert_eq!(parser.parse_line("1059,15000,8000,1500"), None, "short id");
        assert_eq!(parser.parse_line("10597690,abc,8000,1500"), None, "text counter");
        assert_eq!(parser.parse_line("10597690,-5,8000,1500"), None, "negative counter");
        assert_eq!(parser.parse_line("10597690,,8000,1500"), None, "empty counter");
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("15.000"), Some(15000));
        assert_eq!(parse_count(" 1,500 "), Some(1500));
        assert_eq!(parse_count("0"), Some(0));
        assert_eq!(parse_count("1.2.3"), Some(123));
        assert_eq!(parse_count("+5"), None);
        assert_eq!(parse_count("99999999999999999999999"), None, "overflow");
    }

    #[test]
    fn test_data_lines_header_and_blanks() {
        let headers = HeaderKeywords::registration();
        let lines = data_lines("Nome,ID\r\n\r\nJub,10597690\r\n  \rCat 10587003\n", &headers);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], DataLine { number: 3, text: "Jub,10597690".to_string() });
        assert_eq!(lines[1].number, 5);
        assert_eq!(lines[1].text, "Cat 10587003");
    }

    #[test]
    fn test_header_only_checked_on_first_line() {
        let headers = HeaderKeywords::registration();
        let lines = data_lines("Jub,10597690\nNome,ID", &headers);
        assert_eq!(lines.len(), 2, "a later header-like line is data");
    }

    #[test]
    fn test_header_keyword_inside_first_name() {
        // Substring matching: a first row naming "David" contains "id" and is
        // taken as a header. Operators paste a header row in practice.
        let headers = HeaderKeywords::registration();
        let lines = data_lines("David,10597690\nCat,10587003", &headers);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Cat,10587003");
    }

    #[test]
    fn test_parse_input_keeps_every_line() {
        let config = ImportConfig::default();
        let parser = RegistrationParser::new(&config);
        let parsed = parser.parse_input("Jub,10597690\ngarbage\n\nCat 10587003");

        assert_eq!(parsed.len(), 3);
        assert!(parsed[0].candidate.is_some());
        assert!(parsed[1].candidate.is_none());
        assert_eq!(parsed[1].raw, "garbage");
        assert_eq!(parsed[2].number, 4);
    }

    #[test]
    fn test_issue_messages_and_categories() {
        let issue = ImportIssue::IdExists("10597690".to_string());
        assert!(issue.to_string().contains("já existe"));
        assert_eq!(issue.category(), IssueCategory::DuplicateInExisting);
        assert_eq!(ImportIssue::InvalidFormat.to_string(), "Formato inválido");
        assert_eq!(ImportIssue::DuplicateInBatch.category(), IssueCategory::DuplicateInBatch);
    }

    #[test]
    fn test_record_json_shape() {
        let record = ParsedRegistration::accepted(
            1,
            RegistrationCandidate {
                name: "Jub".to_string(),
                streamer_id: "10597690".to_string(),
            },
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["isValid"], true);
        assert_eq!(json["action"], "create");
        assert!(json.get("error").is_none());
    }
}
