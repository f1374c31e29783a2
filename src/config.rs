use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::duration::{deserialize_duration, serialize_duration};
use crate::error::Error;
use crate::lifecycle::equity::EquityPolicy;
use crate::models::CurrencyCode;
use crate::valuation::ValuationPolicy;

fn default_base_currency() -> String {
    "KWD".to_string()
}

fn default_supported_currencies() -> Vec<String> {
    ["KWD", "USD", "GBP", "EUR", "AED", "SAR", "EGP"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_timezone() -> String {
    "Asia/Kuwait".to_string()
}

/// Default staleness window for stored converted values (7 days).
fn default_stale_after() -> Duration {
    Duration::from_secs(7 * 24 * 60 * 60)
}

/// Display/output formatting configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Render amounts with thousands separators in `*_display` fields.
    pub currency_grouping: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    /// How old a stored base-currency value may be before it is recomputed.
    #[serde(
        default = "default_stale_after",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub stale_after: Duration,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            stale_after: default_stale_after(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EquityConfig {
    /// Permit sells that take a holding's quantity below zero.
    pub allow_short_sales: bool,
}

/// Application configuration, as read from `wealthbook.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_base_currency")]
    pub base_currency: String,

    #[serde(default = "default_supported_currencies")]
    pub supported_currencies: Vec<String>,

    /// IANA timezone name used for business dates.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default)]
    pub valuation: ValuationConfig,

    #[serde(default)]
    pub equity: EquityConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            base_currency: default_base_currency(),
            supported_currencies: default_supported_currencies(),
            timezone: default_timezone(),
            valuation: ValuationConfig::default(),
            equity: EquityConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }

    pub fn settings(&self) -> crate::error::Result<Settings> {
        let supported = self
            .supported_currencies
            .iter()
            .map(|c| CurrencyCode::new(c))
            .collect::<crate::error::Result<Vec<_>>>()?;
        let base = CurrencyCode::new(&self.base_currency)?;
        let timezone: Tz = self
            .timezone
            .parse()
            .map_err(|_| Error::validation(format!("unknown timezone {:?}", self.timezone)))?;

        Settings::new(
            base,
            supported,
            timezone,
            self.valuation.stale_after,
            self.equity.allow_short_sales,
        )
    }
}

/// Immutable engine configuration, validated once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    base_currency: CurrencyCode,
    supported_currencies: Vec<CurrencyCode>,
    timezone: Tz,
    stale_after: Duration,
    allow_short_sales: bool,
}

impl Settings {
    pub fn new(
        base_currency: CurrencyCode,
        mut supported_currencies: Vec<CurrencyCode>,
        timezone: Tz,
        stale_after: Duration,
        allow_short_sales: bool,
    ) -> crate::error::Result<Self> {
        // Keep the configured order; drop repeats.
        let mut seen = std::collections::HashSet::new();
        supported_currencies.retain(|c| seen.insert(c.clone()));

        if !supported_currencies.contains(&base_currency) {
            return Err(Error::validation(format!(
                "base currency {base_currency} is not in the supported currency list"
            )));
        }
        Ok(Self {
            base_currency,
            supported_currencies,
            timezone,
            stale_after,
            allow_short_sales,
        })
    }

    pub fn base_currency(&self) -> &CurrencyCode {
        &self.base_currency
    }

    pub fn supported_currencies(&self) -> &[CurrencyCode] {
        &self.supported_currencies
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    pub fn is_supported(&self, currency: &CurrencyCode) -> bool {
        self.supported_currencies.contains(currency)
    }

    pub fn ensure_supported(&self, currency: &CurrencyCode) -> crate::error::Result<()> {
        if self.is_supported(currency) {
            Ok(())
        } else {
            Err(Error::UnsupportedCurrency(currency.to_string()))
        }
    }

    pub fn equity_policy(&self) -> EquityPolicy {
        EquityPolicy {
            allow_short_sales: self.allow_short_sales,
        }
    }

    pub fn valuation_policy(&self) -> ValuationPolicy {
        ValuationPolicy {
            stale_after: self.stale_after,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_currency: CurrencyCode::kwd(),
            supported_currencies: default_supported_currencies()
                .iter()
                .filter_map(|c| CurrencyCode::new(c).ok())
                .collect(),
            timezone: chrono_tz::Asia::Kuwait,
            stale_after: default_stale_after(),
            allow_short_sales: false,
        }
    }
}

/// Loaded configuration with resolved paths and validated settings.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The resolved data directory path.
    pub data_dir: PathBuf,

    pub settings: Settings,

    /// Display/output formatting settings.
    pub display: DisplayConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./wealthbook.toml` if it exists in current directory
/// 2. `~/.local/share/wealthbook/wealthbook.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("wealthbook.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("wealthbook").join("wealthbook.toml");
    }

    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    ///
    /// The data directory is resolved relative to the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        Self::from_config(config, config_dir)
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// Without a file, the intended parent directory of the config file
    /// becomes the data directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };
        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Self::from_config(Config::default(), config_dir)
    }

    fn from_config(config: Config, config_dir: &Path) -> Result<Self> {
        let settings = config.settings().context("Invalid configuration")?;
        Ok(Self {
            data_dir: config.resolve_data_dir(config_dir),
            settings,
            display: config.display,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, lines: &[&str]) -> Result<PathBuf> {
        let path = dir.path().join("wealthbook.toml");
        let mut file = std::fs::File::create(&path)?;
        for line in lines {
            writeln!(file, "{line}")?;
        }
        Ok(path)
    }

    #[test]
    fn test_default_data_dir_is_config_dir() {
        let config = Config::default();
        let config_dir = Path::new("/srv/family-office");
        assert_eq!(
            config.resolve_data_dir(config_dir),
            PathBuf::from("/srv/family-office")
        );
    }

    #[test]
    fn test_relative_and_absolute_data_dir() {
        let relative = Config {
            data_dir: Some(PathBuf::from("data")),
            ..Default::default()
        };
        let absolute = Config {
            data_dir: Some(PathBuf::from("/var/wealthbook")),
            ..Default::default()
        };
        let config_dir = Path::new("/srv/family-office");
        assert_eq!(
            relative.resolve_data_dir(config_dir),
            PathBuf::from("/srv/family-office/data")
        );
        assert_eq!(
            absolute.resolve_data_dir(config_dir),
            PathBuf::from("/var/wealthbook")
        );
    }

    #[test]
    fn test_load_empty_config_uses_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_config(&dir, &[])?;

        let config = Config::load(&path)?;
        assert_eq!(config.data_dir, None);
        assert_eq!(config.base_currency, "KWD");
        assert_eq!(config.supported_currencies.len(), 7);
        assert_eq!(config.timezone, "Asia/Kuwait");
        assert_eq!(config.valuation.stale_after, default_stale_after());
        assert!(!config.equity.allow_short_sales);
        assert!(!config.display.currency_grouping);
        Ok(())
    }

    #[test]
    fn test_load_sections() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_config(
            &dir,
            &[
                "base_currency = \"usd\"",
                "supported_currencies = [\"USD\", \"KWD\"]",
                "timezone = \"Europe/London\"",
                "[valuation]",
                "stale_after = \"2w\"",
                "[equity]",
                "allow_short_sales = true",
                "[display]",
                "currency_grouping = true",
            ],
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.valuation.stale_after, Duration::from_secs(14 * 86_400));
        assert!(config.display.currency_grouping);

        let settings = config.settings()?;
        assert_eq!(settings.base_currency(), &CurrencyCode::usd());
        assert_eq!(settings.timezone(), chrono_tz::Europe::London);
        assert!(settings.equity_policy().allow_short_sales);
        Ok(())
    }

    #[test]
    fn test_bad_stale_after_is_a_parse_error() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_config(&dir, &["[valuation]", "stale_after = \"soon\""])?;
        assert!(Config::load(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_settings_reject_unsupported_base() {
        let config = Config {
            base_currency: "JPY".to_string(),
            ..Default::default()
        };
        assert!(config.settings().is_err());
    }

    #[test]
    fn test_settings_reject_unknown_timezone() {
        let config = Config {
            timezone: "Mars/Olympus".to_string(),
            ..Default::default()
        };
        assert!(config.settings().is_err());
    }

    #[test]
    fn test_settings_reject_malformed_currency() {
        let config = Config {
            supported_currencies: vec!["KWD".to_string(), "DOLLARS".to_string()],
            ..Default::default()
        };
        assert!(config.settings().is_err());
    }

    #[test]
    fn test_settings_drop_duplicate_currencies() -> crate::error::Result<()> {
        let settings = Settings::new(
            CurrencyCode::kwd(),
            vec![CurrencyCode::kwd(), CurrencyCode::usd(), CurrencyCode::kwd()],
            chrono_tz::Asia::Kuwait,
            default_stale_after(),
            false,
        )?;
        assert_eq!(settings.supported_currencies().len(), 2);
        assert!(settings.ensure_supported(&CurrencyCode::new("EGP")?).is_err());
        Ok(())
    }

    #[test]
    fn test_resolved_config_load_or_default_missing_file() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("wealthbook.toml");

        let resolved = ResolvedConfig::load_or_default(&config_path)?;
        assert_eq!(resolved.data_dir, dir.path());
        assert_eq!(resolved.settings, Settings::default());
        Ok(())
    }

    #[test]
    fn test_resolved_config_resolves_relative_data_dir() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_config(&dir, &["data_dir = \"./data\""])?;

        let resolved = ResolvedConfig::load(&path)?;
        assert_eq!(resolved.data_dir, dir.path().canonicalize()?.join("data"));
        Ok(())
    }
}
