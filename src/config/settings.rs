use crate::error::{LedgerError, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_DB_PATH: &str = "data";
pub const DEFAULT_WALLET_FILE: &str = "wallet.dat";
pub const DEFAULT_TARGET_BITS: u32 = 16;
pub const DEFAULT_SUBSIDY: u64 = 10;

const CONFIG_FILE_KEY: &str = "LEDGER_CONFIG";
const DB_PATH_KEY: &str = "LEDGER_DB_PATH";
const WALLET_FILE_KEY: &str = "LEDGER_WALLET_FILE";
const TARGET_BITS_KEY: &str = "LEDGER_TARGET_BITS";
const SUBSIDY_KEY: &str = "LEDGER_SUBSIDY";

/// Settings handed to the chain, proof-of-work and key store constructors.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory of the sled chain store
    pub db_path: PathBuf,
    /// File holding the serialized key store
    pub wallet_file: PathBuf,
    /// Leading zero bits a block hash needs
    pub target_bits: u32,
    /// Reward paid by every coinbase transaction
    pub subsidy: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            wallet_file: PathBuf::from(DEFAULT_WALLET_FILE),
            target_bits: DEFAULT_TARGET_BITS,
            subsidy: DEFAULT_SUBSIDY,
        }
    }
}

impl Config {
    /// Defaults, then the TOML file (explicit path or `LEDGER_CONFIG`), then env overrides.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => env::var_os(CONFIG_FILE_KEY).map(PathBuf::from),
        };

        let mut config = match file {
            Some(p) => Self::from_file(&p)?,
            None => Config::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Config(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Config> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Config rooted in `dir`, used for isolated stores.
    pub fn with_base_dir(dir: &Path) -> Config {
        Config {
            db_path: dir.join(DEFAULT_DB_PATH),
            wallet_file: dir.join(DEFAULT_WALLET_FILE),
            ..Config::default()
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(db_path) = env::var_os(DB_PATH_KEY) {
            self.db_path = PathBuf::from(db_path);
        }
        if let Some(wallet_file) = env::var_os(WALLET_FILE_KEY) {
            self.wallet_file = PathBuf::from(wallet_file);
        }
        if let Ok(bits) = env::var(TARGET_BITS_KEY) {
            self.target_bits = bits
                .parse()
                .map_err(|e| LedgerError::Config(format!("{TARGET_BITS_KEY}={bits}: {e}")))?;
        }
        if let Ok(subsidy) = env::var(SUBSIDY_KEY) {
            self.subsidy = subsidy
                .parse()
                .map_err(|e| LedgerError::Config(format!("{SUBSIDY_KEY}={subsidy}: {e}")))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(1..=255).contains(&self.target_bits) {
            return Err(LedgerError::Config(format!(
                "target_bits must be between 1 and 255, got {}",
                self.target_bits
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.target_bits, 16);
        assert_eq!(config.subsidy, 10);
        assert_eq!(config.db_path, PathBuf::from("data"));
        assert_eq!(config.wallet_file, PathBuf::from("wallet.dat"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml("target_bits = 12\ndb_path = \"/tmp/chain\"").unwrap();
        assert_eq!(config.target_bits, 12);
        assert_eq!(config.db_path, PathBuf::from("/tmp/chain"));
        assert_eq!(config.subsidy, DEFAULT_SUBSIDY);
        assert_eq!(config.wallet_file, PathBuf::from(DEFAULT_WALLET_FILE));
    }

    #[test]
    fn test_rejects_out_of_range_target_bits() {
        assert!(matches!(
            Config::from_toml("target_bits = 0"),
            Err(LedgerError::Config(_))
        ));
        assert!(matches!(
            Config::from_toml("target_bits = 256"),
            Err(LedgerError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(matches!(
            Config::from_toml("target_bits = \"many\""),
            Err(LedgerError::Config(_))
        ));
    }

    #[test]
    fn test_with_base_dir() {
        let config = Config::with_base_dir(Path::new("/var/ledger"));
        assert_eq!(config.db_path, PathBuf::from("/var/ledger/data"));
        assert_eq!(config.wallet_file, PathBuf::from("/var/ledger/wallet.dat"));
    }
}
