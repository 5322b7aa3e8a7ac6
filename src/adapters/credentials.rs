//! NVS-backed Wi-Fi credential store.
//!
//! Implements [`CredentialStore`].  Credentials are serialised with
//! postcard into a single blob under `tempnode::wifi`.
//!
//! - ESP-IDF NVS commits are atomic per `nvs_commit()`, so a reset
//!   mid-save leaves either the old blob or the new one.
//! - A blob that fails to decode is treated as "never provisioned".
//! - The simulation backend keeps the blob in memory (dev/test only).

use log::{info, warn};

use crate::app::ports::{CredentialStore, Credentials};
use crate::error::{Error, Result};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const NAMESPACE: &[u8] = b"tempnode\0";
#[cfg(target_os = "espidf")]
const KEY: &[u8] = b"wifi\0";

/// Upper bound on the encoded blob (32 + 64 bytes of text plus varint lengths).
const MAX_BLOB_SIZE: usize = 128;

pub struct NvsCredentialStore {
    #[cfg(not(target_os = "espidf"))]
    blob: Option<Vec<u8>>,
}

impl NvsCredentialStore {
    /// Initialise NVS flash.  On first boot or after a version mismatch
    /// the partition is erased and re-initialised.
    pub fn new() -> Result<Self> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any other NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(Error::Init("nvs_flash_erase"));
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(Error::Init("nvs_flash_init"));
                }
            } else if ret != ESP_OK {
                return Err(Error::Init("nvs_flash_init"));
            }
            info!("NvsCredentialStore: NVS initialised");
            Ok(Self {})
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("NvsCredentialStore: simulation backend");
            Ok(Self { blob: None })
        }
    }

    /// Open the namespace, run `f` with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_handle<F, T>(write: bool, f: F) -> core::result::Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> core::result::Result<T, i32>,
    {
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let ret = unsafe { nvs_open(NAMESPACE.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        unsafe { nvs_close(handle) };
        result
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(&self) -> Option<Vec<u8>> {
        let result = Self::with_handle(false, |handle| {
            let mut buf = vec![0u8; MAX_BLOB_SIZE];
            let mut size = buf.len();
            let ret = unsafe {
                nvs_get_blob(handle, KEY.as_ptr() as *const _, buf.as_mut_ptr() as *mut _, &mut size)
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            buf.truncate(size);
            Ok(buf)
        });
        match result {
            Ok(bytes) => Some(bytes),
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => None,
            Err(e) => {
                warn!("NvsCredentialStore: read error {}", e);
                None
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self) -> Option<Vec<u8>> {
        self.blob.clone()
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&mut self, bytes: &[u8]) -> Result<()> {
        Self::with_handle(true, |handle| {
            let ret = unsafe {
                nvs_set_blob(handle, KEY.as_ptr() as *const _, bytes.as_ptr() as *const _, bytes.len())
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            match unsafe { nvs_commit(handle) } {
                ESP_OK => Ok(()),
                err => Err(err),
            }
        })
        .map_err(|e| {
            warn!("NvsCredentialStore: write error {}", e);
            Error::Storage
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&mut self, bytes: &[u8]) -> Result<()> {
        self.blob = Some(bytes.to_vec());
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn erase_blob(&mut self) -> Result<()> {
        Self::with_handle(true, |handle| {
            let ret = unsafe { nvs_erase_key(handle, KEY.as_ptr() as *const _) };
            if ret != ESP_OK && ret != ESP_ERR_NVS_NOT_FOUND {
                return Err(ret);
            }
            match unsafe { nvs_commit(handle) } {
                ESP_OK => Ok(()),
                err => Err(err),
            }
        })
        .or_else(|e| if e == ESP_ERR_NVS_NOT_FOUND { Ok(()) } else { Err(e) })
        .map_err(|e| {
            warn!("NvsCredentialStore: erase error {}", e);
            Error::Storage
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn erase_blob(&mut self) -> Result<()> {
        self.blob = None;
        Ok(())
    }
}

impl CredentialStore for NvsCredentialStore {
    fn load(&self) -> Option<Credentials> {
        let bytes = self.read_blob()?;
        match postcard::from_bytes::<Credentials>(&bytes) {
            Ok(credentials) if !credentials.ssid.is_empty() => {
                info!("NvsCredentialStore: loaded credentials for '{}'", credentials.ssid);
                Some(credentials)
            }
            Ok(_) => None,
            Err(_) => {
                warn!("NvsCredentialStore: stored blob corrupted, ignoring");
                None
            }
        }
    }

    fn save(&mut self, credentials: &Credentials) -> Result<()> {
        let bytes = postcard::to_allocvec(credentials).map_err(|_| Error::Storage)?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(Error::Storage);
        }
        self.write_blob(&bytes)?;
        info!("NvsCredentialStore: saved credentials for '{}' ({} bytes)", credentials.ssid, bytes.len());
        Ok(())
    }

    fn erase(&mut self) -> Result<()> {
        self.erase_blob()?;
        info!("NvsCredentialStore: credentials erased");
        Ok(())
    }
}
