//! In-memory key storage.

use bdb_core::{KeyStore, KeyStoreError};
use bdb_types::{ExtendedAddress, InstallCode, LinkKey};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Volatile [`KeyStore`] with a bounded device-key table.
pub struct MemoryKeyStore {
    install_code: Option<InstallCode>,
    keys: Mutex<BTreeMap<ExtendedAddress, LinkKey>>,
    capacity: usize,
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self {
            install_code: None,
            keys: Mutex::new(BTreeMap::new()),
            capacity: 16,
        }
    }

    /// Pretend an install code was programmed at the factory.
    pub fn with_install_code(mut self, code: InstallCode) -> Self {
        self.install_code = Some(code);
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }
}

impl KeyStore for MemoryKeyStore {
    fn load_install_code(&self) -> Result<InstallCode, KeyStoreError> {
        self.install_code.ok_or(KeyStoreError::NotFound)
    }

    fn find_device_key(&self, device: ExtendedAddress) -> Option<LinkKey> {
        self.keys.lock().get(&device).copied()
    }

    fn add_device_key(&self, device: ExtendedAddress, key: LinkKey) -> Result<(), KeyStoreError> {
        let mut keys = self.keys.lock();
        if !keys.contains_key(&device) && keys.len() >= self.capacity {
            return Err(KeyStoreError::Full);
        }
        keys.insert(device, key);
        Ok(())
    }
}
