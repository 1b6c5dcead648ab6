use crate::config::Config;
use crate::error::{LedgerError, Result};
use crate::utils::{deserialize, serialize};
use crate::wallet::Wallet;
use log::{debug, info};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Address → wallet map backed by one file.
pub struct KeyStore {
    path: PathBuf,
    wallets: HashMap<String, Wallet>,
}

impl KeyStore {
    /// Loads the key store named by `config`, starting empty when the file is absent.
    pub fn load(config: &Config) -> Result<KeyStore> {
        Self::load_from(&config.wallet_file)
    }

    pub fn load_from(path: &Path) -> Result<KeyStore> {
        let mut key_store = KeyStore {
            path: path.to_path_buf(),
            wallets: HashMap::new(),
        };
        key_store.load_from_file()?;
        Ok(key_store)
    }

    /// Generates a wallet, stores it under its address and persists before returning.
    pub fn create_wallet(&mut self) -> Result<String> {
        let wallet = Wallet::new()?;
        let address = wallet.get_address();
        self.wallets.insert(address.clone(), wallet);
        self.save_to_file()?;
        info!("Created wallet {address}");
        Ok(address)
    }

    pub fn get_addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.wallets.keys().cloned().collect();
        addresses.sort();
        addresses
    }

    pub fn get_wallet(&self, address: &str) -> Option<&Wallet> {
        self.wallets.get(address)
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    fn load_from_file(&mut self) -> Result<()> {
        if !self.path.exists() {
            debug!("No key store at {}, starting empty", self.path.display());
            return Ok(());
        }

        let mut file = File::open(&self.path).map_err(|e| self.io_error("open", e))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .map_err(|e| self.io_error("read", e))?;
        if buf.is_empty() {
            return Ok(());
        }

        self.wallets = deserialize(&buf[..]).map_err(|e| {
            LedgerError::KeyStoreIo(format!("Cannot decode {}: {e}", self.path.display()))
        })?;
        debug!(
            "Loaded {} wallets from {}",
            self.wallets.len(),
            self.path.display()
        );
        Ok(())
    }

    // Written to a sibling file first so a failed write never truncates existing keys.
    fn save_to_file(&self) -> Result<()> {
        let bytes = serialize(&self.wallets)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error("create directory for", e))?;
        }

        let tmp_path = self.path.with_extension("tmp");
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp_path)
            .map_err(|e| self.io_error("create", e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(bytes.as_slice())
            .map_err(|e| self.io_error("write", e))?;
        writer.flush().map_err(|e| self.io_error("flush", e))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| self.io_error("sync", e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error("replace", e))?;
        Ok(())
    }

    fn io_error(&self, action: &str, err: std::io::Error) -> LedgerError {
        LedgerError::KeyStoreIo(format!("Cannot {action} {}: {err}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let key_store = KeyStore::load_from(&dir.path().join("wallet.dat")).unwrap();
        assert!(key_store.is_empty());
    }

    #[test]
    fn test_create_wallet_persists_immediately() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet.dat");

        let mut key_store = KeyStore::load_from(&path).unwrap();
        let first = key_store.create_wallet().unwrap();
        let second = key_store.create_wallet().unwrap();
        assert_ne!(first, second);

        let reloaded = KeyStore::load_from(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get_wallet(&first), key_store.get_wallet(&first));
        assert_eq!(reloaded.get_wallet(&second), key_store.get_wallet(&second));
        assert_eq!(reloaded.get_addresses(), key_store.get_addresses());
    }

    #[test]
    fn test_reloaded_key_material_still_derives_address() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("wallet.dat");

        let address = KeyStore::load_from(&path)
            .unwrap()
            .create_wallet()
            .unwrap();
        let reloaded = KeyStore::load_from(&path).unwrap();
        let wallet = reloaded.get_wallet(&address).unwrap();

        assert_eq!(wallet.get_address(), address);
        assert_eq!(
            crate::utils::public_key_from_pkcs8(wallet.get_pkcs8()).unwrap(),
            wallet.get_public_key()
        );
    }

    #[test]
    fn test_corrupted_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet.dat");
        fs::write(&path, [0xFF, 0xFF, 0xFF, 0xFF]).unwrap();

        assert!(matches!(
            KeyStore::load_from(&path),
            Err(LedgerError::KeyStoreIo(_))
        ));
    }

    #[test]
    fn test_unwritable_location_fails_create() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file, not a directory").unwrap();

        let mut key_store = KeyStore::load_from(&blocker.join("wallet.dat")).unwrap();
        assert!(matches!(
            key_store.create_wallet(),
            Err(LedgerError::KeyStoreIo(_))
        ));
    }
}
