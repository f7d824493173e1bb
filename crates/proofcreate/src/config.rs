//! Configuration with TOML file support.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use proofcreate_ledger::{ChainBackend, Clock, Connector, LocalConnector, LocalLedgerConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ProofError, Result};
use crate::history::HistoryOrder;
use crate::logging::LogFormat;
use crate::session::ReadFallback;

/// Which chain store backs the local ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum LedgerBackendConfig {
    #[default]
    Memory,
    Sqlite {
        path: PathBuf,
    },
}

/// Configuration for the ProofCreate workflows.
///
/// Loaded from a TOML file via [`ProofConfig::from_toml_file`] or built
/// programmatically. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofConfig {
    /// Give up waiting for confirmation after this many seconds.
    /// Unset means wait indefinitely.
    #[serde(default)]
    pub confirmation_timeout_secs: Option<u64>,

    /// Order of history listings.
    #[serde(default)]
    pub history_order: HistoryOrder,

    /// Characters of the fingerprint kept in truncated display forms.
    #[serde(default = "default_display_prefix_len")]
    pub display_prefix_len: usize,

    /// Whether reads may open a read-only connection when the session has
    /// none.
    #[serde(default = "default_true")]
    pub read_fallback: bool,

    /// Simulated block time of the local ledger, in milliseconds.
    #[serde(default)]
    pub confirmation_delay_ms: u64,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log filter, e.g. `"info"` or `"debug,proofcreate_ledger=trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Local ledger chain store. Must stay the last field: it serializes
    /// as a TOML table.
    #[serde(default)]
    pub ledger: LedgerBackendConfig,
}

fn default_display_prefix_len() -> usize {
    20
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ProofConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ProofError::Config(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ProofError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ProofError::Config(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        if self.display_prefix_len < 3 {
            return Err(ProofError::Config(format!(
                "display_prefix_len must be at least 3, got {}",
                self.display_prefix_len
            )));
        }
        if self.confirmation_timeout_secs == Some(0) {
            return Err(ProofError::Config(
                "confirmation_timeout_secs must be positive; omit it to wait indefinitely".into(),
            ));
        }
        Ok(())
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_secs.map(Duration::from_secs)
    }

    /// Settings for a local ledger using the system clock.
    pub fn local_ledger(&self) -> LocalLedgerConfig {
        LocalLedgerConfig::default()
            .with_delay(Duration::from_millis(self.confirmation_delay_ms))
            .with_clock(Clock::system())
    }

    /// The read fallback this configuration asks for.
    pub fn fallback_for(&self, connector: Arc<dyn Connector>) -> ReadFallback {
        if self.read_fallback {
            ReadFallback::connector(connector)
        } else {
            ReadFallback::Disabled
        }
    }

    /// Open the configured chain store.
    pub fn open_chain(&self) -> Result<ChainBackend> {
        match &self.ledger {
            LedgerBackendConfig::Memory => Ok(ChainBackend::memory()),
            LedgerBackendConfig::Sqlite { path } => Ok(ChainBackend::sqlite(path)?),
        }
    }

    /// Open the configured chain store behind a local connector.
    pub fn local_connector(&self) -> Result<LocalConnector<ChainBackend>> {
        Ok(LocalConnector::new(
            Arc::new(self.open_chain()?),
            self.local_ledger(),
        ))
    }
}

impl Default for ProofConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_secs: None,
            history_order: HistoryOrder::default(),
            display_prefix_len: default_display_prefix_len(),
            read_fallback: default_true(),
            confirmation_delay_ms: 0,
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            ledger: LedgerBackendConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = ProofConfig::from_toml_str("").unwrap();
        assert_eq!(config.confirmation_timeout(), None);
        assert_eq!(config.history_order, HistoryOrder::NewestFirst);
        assert_eq!(config.display_prefix_len, 20);
        assert!(config.read_fallback);
        assert_eq!(config.ledger, LedgerBackendConfig::Memory);
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = ProofConfig::from_toml_str(
            r#"
            confirmation_timeout_secs = 90
            history_order = "scan_order"
            log_format = "json"

            [ledger]
            backend = "sqlite"
            path = "/var/lib/proofcreate/chain.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.confirmation_timeout(), Some(Duration::from_secs(90)));
        assert_eq!(config.history_order, HistoryOrder::ScanOrder);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.ledger,
            LedgerBackendConfig::Sqlite {
                path: PathBuf::from("/var/lib/proofcreate/chain.db")
            }
        );
        assert_eq!(config.display_prefix_len, 20);
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let config = ProofConfig::default();
        let text = config.to_toml_string().unwrap();
        let parsed = ProofConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.display_prefix_len, config.display_prefix_len);
        assert_eq!(parsed.history_order, config.history_order);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            ProofConfig::from_toml_str("display_prefix_len = 1"),
            Err(ProofError::Config(_))
        ));
        assert!(matches!(
            ProofConfig::from_toml_str("confirmation_timeout_secs = 0"),
            Err(ProofError::Config(_))
        ));
        assert!(matches!(
            ProofConfig::from_toml_str("history_order = \"sideways\""),
            Err(ProofError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = ProofConfig::from_toml_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ProofError::Config(msg) if msg.contains("absent.toml")));
    }

    #[tokio::test]
    async fn test_sqlite_backend_opens() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = ProofConfig {
            ledger: LedgerBackendConfig::Sqlite {
                path: dir.path().join("chain.db"),
            },
            ..ProofConfig::default()
        };
        let connector = config.local_connector().unwrap();
        assert!(matches!(connector.store().as_ref(), ChainBackend::Sqlite(_)));
    }

    #[test]
    fn test_fallback_follows_flag() {
        let connector: Arc<dyn Connector> =
            Arc::new(ProofConfig::default().local_connector().unwrap());

        let enabled = ProofConfig::default().fallback_for(Arc::clone(&connector));
        assert!(matches!(enabled, ReadFallback::Connector(_)));

        let config = ProofConfig::from_toml_str("read_fallback = false").unwrap();
        assert!(matches!(config.fallback_for(connector), ReadFallback::Disabled));
    }
}
