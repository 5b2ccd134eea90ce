//! Persistent storage collaborator.
//!
//! The pairing gate and the relay bank delegate all durable state to a
//! [`PairingStore`]: the learned 20-bit remote address and the relay-state
//! snapshot shared with the rest of the firmware. On the device this is
//! NVS flash; host builds and tests use the in-memory implementation.

use crate::pairing::ADDRESS_BITS;

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::EspError;

/// NVS namespace shared by the pairing and relay subsystems.
pub const STORE_NAMESPACE: &str = "relay_ctrl";

/// Key of the learned remote address.
pub const KEY_RF_ADDRESS: &str = "rf_address";

/// Key of the relay-state snapshot.
pub const KEY_RELAY_STATE: &str = "relay_state";

/// Storage operation errors.
#[derive(Debug)]
pub enum StoreError {
    /// Backing storage could not be opened.
    #[cfg(target_os = "espidf")]
    InitFailed(EspError),
    /// NVS read/write error.
    #[cfg(target_os = "espidf")]
    Io(EspError),
    /// Write rejected (simulated failure in host tests).
    WriteRejected,
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            #[cfg(target_os = "espidf")]
            StoreError::InitFailed(e) => write!(f, "store init failed: {}", e),
            #[cfg(target_os = "espidf")]
            StoreError::Io(e) => write!(f, "store i/o error: {}", e),
            StoreError::WriteRejected => write!(f, "store write rejected"),
        }
    }
}

#[cfg(target_os = "espidf")]
impl From<EspError> for StoreError {
    fn from(e: EspError) -> Self {
        StoreError::Io(e)
    }
}

/// Durable storage for pairing data and relay states.
///
/// Writes commit at the storage boundary; a returned `Ok` means the data
/// survives a restart.
pub trait PairingStore {
    /// Read the learned address, if one is stored.
    fn address(&mut self) -> Option<[u8; ADDRESS_BITS]>;

    /// Persist the learned address.
    fn set_address(&mut self, address: &[u8; ADDRESS_BITS]) -> Result<(), StoreError>;

    /// Erase the learned address. Erasing an absent address is not an error.
    fn erase_address(&mut self) -> Result<(), StoreError>;

    /// Read the relay-state snapshot into `out`. Returns `false` when no
    /// snapshot of that size is stored.
    fn relay_states(&mut self, out: &mut [u8]) -> bool;

    /// Persist the relay-state snapshot, one byte per relay.
    fn set_relay_states(&mut self, states: &[u8]) -> Result<(), StoreError>;
}

/// In-memory store for host builds and tests.
///
/// `fail_writes` makes every mutation return an error, for exercising the
/// persistence-failure paths.
#[derive(Default)]
pub struct MemStore {
    address: Option<[u8; ADDRESS_BITS]>,
    relay_states: Option<([u8; 16], usize)>,
    pub fail_writes: bool,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PairingStore for MemStore {
    fn address(&mut self) -> Option<[u8; ADDRESS_BITS]> {
        self.address
    }

    fn set_address(&mut self, address: &[u8; ADDRESS_BITS]) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::WriteRejected);
        }
        self.address = Some(*address);
        Ok(())
    }

    fn erase_address(&mut self) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::WriteRejected);
        }
        self.address = None;
        Ok(())
    }

    fn relay_states(&mut self, out: &mut [u8]) -> bool {
        match &self.relay_states {
            Some((bytes, len)) if *len == out.len() => {
                out.copy_from_slice(&bytes[..*len]);
                true
            }
            _ => false,
        }
    }

    fn set_relay_states(&mut self, states: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::WriteRejected);
        }
        let mut bytes = [0u8; 16];
        let len = states.len().min(16);
        bytes[..len].copy_from_slice(&states[..len]);
        self.relay_states = Some((bytes, len));
        Ok(())
    }
}

/// NVS-backed store used on the device.
#[cfg(target_os = "espidf")]
pub struct NvsStore {
    nvs: EspNvs<NvsDefault>,
}

#[cfg(target_os = "espidf")]
impl NvsStore {
    /// Open the shared namespace on the default NVS partition.
    pub fn open() -> Result<Self, StoreError> {
        let partition = EspDefaultNvsPartition::take().map_err(StoreError::InitFailed)?;
        let nvs =
            EspNvs::new(partition, STORE_NAMESPACE, true).map_err(StoreError::InitFailed)?;
        Ok(Self { nvs })
    }
}

#[cfg(target_os = "espidf")]
impl PairingStore for NvsStore {
    fn address(&mut self) -> Option<[u8; ADDRESS_BITS]> {
        let mut buf = [0u8; ADDRESS_BITS + 1];
        let stored = self.nvs.get_str(KEY_RF_ADDRESS, &mut buf).ok()??;
        let bytes = stored.as_bytes();
        if bytes.len() != ADDRESS_BITS {
            return None;
        }
        let mut address = [0u8; ADDRESS_BITS];
        address.copy_from_slice(bytes);
        Some(address)
    }

    fn set_address(&mut self, address: &[u8; ADDRESS_BITS]) -> Result<(), StoreError> {
        let text = core::str::from_utf8(address).unwrap_or("");
        self.nvs.set_str(KEY_RF_ADDRESS, text)?;
        Ok(())
    }

    fn erase_address(&mut self) -> Result<(), StoreError> {
        self.nvs.remove(KEY_RF_ADDRESS)?;
        Ok(())
    }

    fn relay_states(&mut self, out: &mut [u8]) -> bool {
        let len = out.len();
        matches!(
            self.nvs.get_blob(KEY_RELAY_STATE, out),
            Ok(Some(blob)) if blob.len() == len
        )
    }

    fn set_relay_states(&mut self, states: &[u8]) -> Result<(), StoreError> {
        self.nvs.set_blob(KEY_RELAY_STATE, states)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_store_address_roundtrip() {
        let mut store = MemStore::new();
        assert!(store.address().is_none());

        let address = *b"01010101010101010101";
        store.set_address(&address).unwrap();
        assert_eq!(store.address(), Some(address));

        store.erase_address().unwrap();
        assert!(store.address().is_none());
    }

    #[test]
    fn test_mem_store_write_failure() {
        let mut store = MemStore::new();
        store.fail_writes = true;

        let address = *b"01010101010101010101";
        assert!(store.set_address(&address).is_err());
        assert!(store.address().is_none());
    }

    #[test]
    fn test_mem_store_relay_states() {
        let mut store = MemStore::new();

        let mut out = [0u8; 4];
        assert!(!store.relay_states(&mut out));

        store.set_relay_states(&[1, 0, 1, 0]).unwrap();
        assert!(store.relay_states(&mut out));
        assert_eq!(out, [1, 0, 1, 0]);

        // Size mismatch reads nothing
        let mut short = [0u8; 2];
        assert!(!store.relay_states(&mut short));
    }
}
