// ⚙️ Configuration - Import heuristics and store location as data
//
// Resolution order:
// 1. --config flag
// 2. STREAMER_LEDGER_CONFIG environment variable
// 3. ./streamer-ledger.toml (if present)
// 4. Compiled defaults

use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "STREAMER_LEDGER_CONFIG";
pub const DATABASE_ENV_VAR: &str = "STREAMER_LEDGER_DB";
pub const DEFAULT_CONFIG_FILE: &str = "streamer-ledger.toml";

// ============================================================================
// HEADER KEYWORDS
// ============================================================================

/// Trigger words that mark the first pasted line as a header row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderKeywords {
    /// Substrings (lower-case) that mark a header
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Whole-line literals (lower-case) that mark a header
    #[serde(default)]
    pub literals: Vec<String>,
}

impl HeaderKeywords {
    pub fn registration() -> Self {
        HeaderKeywords {
            keywords: vec!["nome".to_string(), "name".to_string(), "id".to_string()],
            literals: vec!["nome,id".to_string(), "name,id".to_string()],
        }
    }

    pub fn gift_update() -> Self {
        HeaderKeywords {
            keywords: ["sorte", "exclusivo", "minuto", "tempo", "luck", "exclusive", "id"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            literals: Vec::new(),
        }
    }

    /// Case-insensitive check of a trimmed line
    pub fn is_header(&self, line: &str) -> bool {
        let lower = line.trim().to_lowercase();
        if lower.is_empty() {
            return false;
        }

        self.keywords.iter().any(|k| lower.contains(k.as_str()))
            || self.literals.iter().any(|l| lower == *l)
    }
}

// ============================================================================
// IMPORT CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Minimum run of digits that counts as a streamer id
    pub min_id_digits: usize,

    /// How much of an unparseable line is echoed back as its "name"
    pub name_preview_chars: usize,

    /// Characters stripped from the end of a name glued to its id
    pub name_separators: String,

    /// Minutes a day needs to count as an effective day
    pub valid_day_minutes: i64,

    pub registration_headers: HeaderKeywords,
    pub gift_update_headers: HeaderKeywords,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            min_id_digits: 5,
            name_preview_chars: 30,
            name_separators: ".,;:-_🦋💜💙💚💛🧡❤️💕✨⭐🌟".to_string(),
            valid_day_minutes: 120,
            registration_headers: HeaderKeywords::registration(),
            gift_update_headers: HeaderKeywords::gift_update(),
        }
    }
}

impl ImportConfig {
    /// True when `id` is all ASCII digits and long enough
    pub fn is_valid_id(&self, id: &str) -> bool {
        id.len() >= self.min_id_digits && id.bytes().all(|b| b.is_ascii_digit())
    }

    /// Whitespace always separates; the configured set adds punctuation and symbols
    pub fn is_name_separator(&self, c: char) -> bool {
        c.is_whitespace() || self.name_separators.contains(c)
    }

    fn validate(&self) -> Result<()> {
        if self.min_id_digits == 0 {
            return Err(LedgerError::Config(
                "import.min_id_digits must be at least 1".to_string(),
            ));
        }
        if self.valid_day_minutes < 0 {
            return Err(LedgerError::Config(
                "import.valid_day_minutes cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SERVER CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

// ============================================================================
// LEDGER CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub database_path: PathBuf,
    pub server: ServerConfig,
    pub import: ImportConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            database_path: PathBuf::from("streamers.db"),
            server: ServerConfig::default(),
            import: ImportConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Parse a TOML document; missing keys fall back to defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LedgerConfig =
            toml::from_str(content).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.import.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve the effective configuration (see module header for priority)
    pub fn resolve(cli_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::locate(cli_path) {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::load(&path)?
            }
            None => LedgerConfig::default(),
        };

        if let Ok(db) = std::env::var(DATABASE_ENV_VAR) {
            if !db.trim().is_empty() {
                config.database_path = PathBuf::from(db);
            }
        }

        Ok(config)
    }

    fn locate(cli_path: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = cli_path {
            return Some(path.to_path_buf());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        local.exists().then_some(local)
    }
}
