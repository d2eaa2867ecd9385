// ✂️ Line Tokenizer - Delimiter heuristics for pasted rows
//
// Pasted text arrives in whatever shape the source spreadsheet or chat used:
//   "Jubscreuza,10597690"          (CSV)
//   "Rô Ramos\t10844565"           (spreadsheet copy)
//   "10597690 15.000 8.000 1500"   (whitespace columns)
//   "Luh.ᴮˡᵒᵒᵐ🦋10702736"          (name glued to id)
//
// Each heuristic is a Strategy value; the mode decides which ones apply and
// in what order. First strategy producing >= 2 fields wins.

use crate::config::ImportConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// IMPORT MODE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// (name, id) pairs that create profiles
    Register,
    /// (id, luck, exclusive, minutes) rows applied to existing profiles
    Update,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Register => "register",
            ImportMode::Update => "update",
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportMode {
    type Err = crate::error::LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "register" | "registration" => Ok(ImportMode::Register),
            "update" | "gifts" => Ok(ImportMode::Update),
            other => Err(crate::error::LedgerError::InvalidInput(format!(
                "Unknown import mode: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// STRATEGY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Comma,
    Tab,
    Whitespace,
    /// `<name><separators><digits>` with the id anchored at end of line
    NumericSuffix,
}

const REGISTER_STRATEGIES: &[Strategy] = &[Strategy::Comma, Strategy::Tab, Strategy::NumericSuffix];
const UPDATE_STRATEGIES: &[Strategy] = &[Strategy::Comma, Strategy::Tab, Strategy::Whitespace];

/// Result of the first-match tokenization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tokenized<'a> {
    Fields {
        strategy: Strategy,
        fields: Vec<&'a str>,
    },
    NoDelimiter,
}

// ============================================================================
// LINE TOKENIZER
// ============================================================================

pub struct LineTokenizer<'c> {
    mode: ImportMode,
    config: &'c ImportConfig,
}

impl<'c> LineTokenizer<'c> {
    pub fn new(mode: ImportMode, config: &'c ImportConfig) -> Self {
        LineTokenizer { mode, config }
    }

    /// Strategies tried for this mode, highest priority first
    pub fn strategies(&self) -> &'static [Strategy] {
        match self.mode {
            ImportMode::Register => REGISTER_STRATEGIES,
            ImportMode::Update => UPDATE_STRATEGIES,
        }
    }

    /// Apply one strategy; `None` when it does not recognise the line
    pub fn apply<'a>(&self, strategy: Strategy, line: &'a str) -> Option<Vec<&'a str>> {
        let fields = match strategy {
            Strategy::Comma => split_on(line, ',')?,
            Strategy::Tab => split_on(line, '\t')?,
            Strategy::Whitespace => line.split_whitespace().collect(),
            Strategy::NumericSuffix => self.split_numeric_suffix(line)?,
        };

        // Delimiter presence does not guarantee a usable row
        if fields.len() < 2 {
            return None;
        }
        Some(fields)
    }

    /// First strategy that yields fields
    pub fn tokenize<'a>(&self, line: &'a str) -> Tokenized<'a> {
        self.strategies()
            .iter()
            .find_map(|&strategy| {
                self.apply(strategy, line)
                    .map(|fields| Tokenized::Fields { strategy, fields })
            })
            .unwrap_or(Tokenized::NoDelimiter)
    }

    /// Every strategy that yields fields, in priority order.
    ///
    /// Parsers walk all of them so a comma split with a bad id can still be
    /// rescued by the tab or suffix strategy.
    pub fn candidates<'a>(&self, line: &'a str) -> Vec<(Strategy, Vec<&'a str>)> {
        self.strategies()
            .iter()
            .filter_map(|&s| self.apply(s, line).map(|fields| (s, fields)))
            .collect()
    }

    fn split_numeric_suffix<'a>(&self, line: &'a str) -> Option<Vec<&'a str>> {
        let digit_count = line.bytes().rev().take_while(u8::is_ascii_digit).count();
        if digit_count < self.config.min_id_digits {
            return None;
        }

        // ASCII digits are single bytes, so this is a char boundary
        let (prefix, id) = line.split_at(line.len() - digit_count);
        let name = prefix
            .trim()
            .trim_end_matches(|c: char| self.config.is_name_separator(c))
            .trim();

        Some(vec![name, id])
    }
}

fn split_on(line: &str, delimiter: char) -> Option<Vec<&str>> {
    if !line.contains(delimiter) {
        return None;
    }
    Some(line.split(delimiter).map(str::trim).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields<'a>(mode: ImportMode, config: &ImportConfig, line: &'a str) -> Option<Vec<&'a str>> {
        match LineTokenizer::new(mode, config).tokenize(line) {
            Tokenized::Fields { fields, .. } => Some(fields),
            Tokenized::NoDelimiter => None,
        }
    }

    #[test]
    fn test_comma_wins_over_tab() {
        let config = ImportConfig::default();
        let tokenizer = LineTokenizer::new(ImportMode::Register, &config);

        match tokenizer.tokenize("Jub , 10597690\tx") {
            Tokenized::Fields { strategy, fields } => {
                assert_eq!(strategy, Strategy::Comma);
                assert_eq!(fields, vec!["Jub", "10597690\tx"]);
            }
            Tokenized::NoDelimiter => panic!("comma line should tokenize"),
        }
    }

    #[test]
    fn test_tab_split_trims_fields() {
        let config = ImportConfig::default();
        assert_eq!(
            fields(ImportMode::Register, &config, "Rô Ramos\t 10844565 "),
            Some(vec!["Rô Ramos", "10844565"])
        );
    }

    #[test]
    fn test_whitespace_only_in_update_mode() {
        let config = ImportConfig::default();
        assert_eq!(
            fields(ImportMode::Update, &config, "10597690   15.000 8.000 1500"),
            Some(vec!["10597690", "15.000", "8.000", "1500"])
        );

        // Registration falls to the suffix strategy instead
        assert_eq!(
            fields(ImportMode::Register, &config, "Cat Lima 10587003"),
            Some(vec!["Cat Lima", "10587003"])
        );
    }

    #[test]
    fn test_numeric_suffix_strips_decorations() {
        let config = ImportConfig::default();
        assert_eq!(
            fields(ImportMode::Register, &config, "Luh🦋10702736"),
            Some(vec!["Luh", "10702736"])
        );
        assert_eq!(
            fields(ImportMode::Register, &config, "Luh.ᴮˡᵒᵒᵐ🦋10702736"),
            Some(vec!["Luh.ᴮˡᵒᵒᵐ", "10702736"])
        );
        assert_eq!(
            fields(ImportMode::Register, &config, "Mel ❤️✨ - 10990011"),
            Some(vec!["Mel", "10990011"])
        );
    }

    #[test]
    fn test_numeric_suffix_needs_enough_digits() {
        let config = ImportConfig::default();
        assert_eq!(fields(ImportMode::Register, &config, "Page 1234"), None);
        assert_eq!(
            fields(ImportMode::Register, &config, "Page 12345"),
            Some(vec!["Page", "12345"])
        );
        assert_eq!(fields(ImportMode::Register, &config, "10597690 trailing"), None);
    }

    #[test]
    fn test_candidates_in_priority_order() {
        let config = ImportConfig::default();
        let tokenizer = LineTokenizer::new(ImportMode::Register, &config);

        // Trailing comma: no digits at end of line for the suffix strategy
        let all: Vec<Strategy> = tokenizer
            .candidates("Ana 10597690,")
            .into_iter()
            .map(|(s, _)| s)
            .collect();
        assert_eq!(all, vec![Strategy::Comma]);

        let all: Vec<Strategy> = tokenizer
            .candidates("Ana, 10597690")
            .into_iter()
            .map(|(s, _)| s)
            .collect();
        assert_eq!(all, vec![Strategy::Comma, Strategy::NumericSuffix]);
    }

    #[test]
    fn test_single_token_falls_through() {
        let config = ImportConfig::default();
        let tokenizer = LineTokenizer::new(ImportMode::Update, &config);
        assert_eq!(tokenizer.apply(Strategy::Whitespace, "10597690"), None);
        assert_eq!(tokenizer.apply(Strategy::Comma, "10597690"), None);
    }

    #[test]
    fn test_no_delimiter() {
        let config = ImportConfig::default();
        assert_eq!(
            LineTokenizer::new(ImportMode::Register, &config).tokenize("justaname"),
            Tokenized::NoDelimiter
        );
        assert_eq!(
            LineTokenizer::new(ImportMode::Update, &config).tokenize("10597690"),
            Tokenized::NoDelimiter
        );
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("register".parse::<ImportMode>().unwrap(), ImportMode::Register);
        assert_eq!("UPDATE".parse::<ImportMode>().unwrap(), ImportMode::Update);
        assert!("delete".parse::<ImportMode>().is_err());
    }
}
